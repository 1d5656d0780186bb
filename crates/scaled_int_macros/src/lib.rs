use proc_macro::TokenStream;
use proc_macro2::{Literal, Span};
use quote::quote;
use syn::parse::{Parse, ParseStream};
use syn::{parse_macro_input, Lit, Token, Type};

/// Convert a decimal literal into an exact `ScaledInt` at compile time.
///
/// The literal is split into an exact, reduced `NUM / DEN` pair while the
/// macro expands, and the expansion calls `ScaledInt::from_ratio::<NUM, DEN>()`,
/// whose rounding and range check run in a `const` block. No floating-point
/// value ever reaches the compiled program.
///
/// # Example
/// ```ignore
/// let half = fixp!(0.5);                      // ScaledNum
/// let rate = fixp!(0.75 as UScaledNum);
/// let milli = fixp!(-1e-3 as ScaledInt<65536, i64>);
/// ```
///
/// # Rejected input
/// - Anything other than an (optionally negated) integer or float literal.
/// - Literals whose reduced numerator or denominator does not fit in `i64`.
/// - Values outside the target representation (rejected by `from_ratio`).
#[proc_macro]
pub fn fixp(input: TokenStream) -> TokenStream {
    let FixpInput { negative, literal, target } = parse_macro_input!(input as FixpInput);

    let digits = match &literal {
        Lit::Float(f) => {
            if !matches!(f.suffix(), "" | "f32" | "f64") {
                return syn::Error::new(f.span(), "unsupported literal suffix")
                    .to_compile_error()
                    .into();
            }
            f.base10_digits().to_string()
        }
        Lit::Int(i) => i.base10_digits().to_string(),
        other => {
            return syn::Error::new(other.span(), "fixp! expects a numeric literal")
                .to_compile_error()
                .into();
        }
    };

    let (num, den) = match decimal_to_ratio(&digits) {
        Ok(ratio) => ratio,
        Err(msg) => {
            return syn::Error::new(literal.span(), msg).to_compile_error().into();
        }
    };

    let num = Literal::i64_unsuffixed(num);
    let den = Literal::i64_unsuffixed(den);
    let sign = if negative { quote!(-) } else { quote!() };
    let target = match target {
        Some(ty) => quote!(#ty),
        None => quote!(::scaled_int::ScaledNum),
    };

    let output = quote! {
        <#target>::from_ratio::<{ #sign #num }, #den>()
    };

    output.into()
}

struct FixpInput {
    negative: bool,
    literal: Lit,
    target: Option<Type>,
}

impl Parse for FixpInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let negative = input.parse::<Option<Token![-]>>()?.is_some();
        let literal: Lit = input.parse()?;
        let target = if input.peek(Token![as]) {
            input.parse::<Token![as]>()?;
            Some(input.parse::<Type>()?)
        } else {
            None
        };
        if !input.is_empty() {
            return Err(syn::Error::new(Span::call_site(), "unexpected tokens after literal"));
        }
        Ok(Self { negative, literal, target })
    }
}

/// Parse `123`, `1.25`, `5e-3`, `2.5E2` into a reduced, non-negative numerator
/// and a positive denominator.
fn decimal_to_ratio(digits: &str) -> Result<(i64, i64), &'static str> {
    let (mantissa, exponent) = match digits.find(|c| c == 'e' || c == 'E') {
        Some(pos) => {
            let exp: i32 = digits[pos + 1..]
                .parse()
                .map_err(|_| "malformed exponent")?;
            (&digits[..pos], exp)
        }
        None => (digits, 0),
    };

    let (int_part, frac_part) = match mantissa.find('.') {
        Some(pos) => (&mantissa[..pos], &mantissa[pos + 1..]),
        None => (mantissa, ""),
    };

    let mut num: u128 = 0;
    for c in int_part.chars().chain(frac_part.chars()) {
        let d = c.to_digit(10).ok_or("malformed literal")? as u128;
        num = num
            .checked_mul(10)
            .and_then(|n| n.checked_add(d))
            .ok_or("literal has too many digits")?;
    }

    let scale = exponent - frac_part.len() as i32;
    let mut den: u128 = 1;
    if scale >= 0 {
        for _ in 0..scale {
            num = num.checked_mul(10).ok_or("literal is too large")?;
        }
    } else {
        for _ in 0..(-scale) {
            den = den.checked_mul(10).ok_or("literal has too many decimal places")?;
        }
    }

    let g = gcd(num, den);
    let (num, den) = (num / g, den / g);
    let num = i64::try_from(num).map_err(|_| "literal numerator does not fit in i64")?;
    let den = i64::try_from(den).map_err(|_| "literal denominator does not fit in i64")?;
    Ok((num, den))
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let t = a % b;
        a = b;
        b = t;
    }
    a.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_decimals_reduce() {
        assert_eq!(decimal_to_ratio("0.25"), Ok((1, 4)));
        assert_eq!(decimal_to_ratio("1.5"), Ok((3, 2)));
        assert_eq!(decimal_to_ratio("3"), Ok((3, 1)));
        assert_eq!(decimal_to_ratio("0.0"), Ok((0, 1)));
    }

    #[test]
    fn test_exponents() {
        assert_eq!(decimal_to_ratio("1e-3"), Ok((1, 1000)));
        assert_eq!(decimal_to_ratio("2.5E2"), Ok((250, 1)));
        assert_eq!(decimal_to_ratio("12.5e-1"), Ok((5, 4)));
    }

    #[test]
    fn test_oversized_literals_rejected() {
        assert!(decimal_to_ratio("1e40").is_err());
        assert!(decimal_to_ratio("0.0000000000000000000001").is_err());
    }
}
