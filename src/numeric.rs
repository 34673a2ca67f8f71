//! Numeric text handling
//!
//! Parsing of numeric tokens into exact rationals and integers, and the
//! shortest-form float rendering used when printing values.

use nom::{
    branch::alt,
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, map, opt, recognize},
    sequence::{pair, preceded, tuple},
    IResult,
};
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{One, Zero};

/// Largest decimal exponent accepted when reading numeric text
const MAX_EXPONENT: i64 = 4096;

enum Literal<'a> {
    Fraction {
        negative: bool,
        numer: &'a str,
        denom: &'a str,
    },
    Decimal {
        negative: bool,
        whole: &'a str,
        fraction: &'a str,
        exponent: Option<&'a str>,
    },
}

fn sign(input: &str) -> IResult<&str, bool> {
    map(opt(one_of("+-")), |s| s == Some('-'))(input)
}

/// Parse `[+-]digits/digits`
fn fraction(input: &str) -> IResult<&str, Literal<'_>> {
    map(
        tuple((sign, digit1, preceded(char('/'), digit1))),
        |(negative, numer, denom)| Literal::Fraction {
            negative,
            numer,
            denom,
        },
    )(input)
}

/// Parse `[+-]digits[.digits][e[+-]digits]`, also `.5` and `5.`
fn decimal(input: &str) -> IResult<&str, Literal<'_>> {
    let (rest, (negative, whole, fraction, exponent)) = tuple((
        sign,
        opt(digit1),
        opt(preceded(char('.'), opt(digit1))),
        opt(preceded(
            one_of("eE"),
            recognize(pair(opt(one_of("+-")), digit1)),
        )),
    ))(input)?;

    let whole = whole.unwrap_or("");
    let fraction = fraction.flatten().unwrap_or("");
    if whole.is_empty() && fraction.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }

    Ok((
        rest,
        Literal::Decimal {
            negative,
            whole,
            fraction,
            exponent,
        },
    ))
}

fn literal(input: &str) -> IResult<&str, Literal<'_>> {
    all_consuming(alt((fraction, decimal)))(input)
}

fn digits(text: &str) -> BigInt {
    text.bytes().fold(BigInt::zero(), |acc, b| {
        acc * 10u32 + u32::from(b - b'0')
    })
}

/// Read numeric text as an exact rational.
///
/// Accepts integers, fractions (`3/4`) and decimals with an optional
/// exponent (`-1.25e3`). Returns `None` for anything else, including a zero
/// denominator.
pub fn parse_rational(text: &str) -> Option<BigRational> {
    let (_, lit) = literal(text.trim()).ok()?;

    let (negative, value) = match lit {
        Literal::Fraction {
            negative,
            numer,
            denom,
        } => {
            let denom = digits(denom);
            if denom.is_zero() {
                return None;
            }
            (negative, BigRational::new(digits(numer), denom))
        }
        Literal::Decimal {
            negative,
            whole,
            fraction,
            exponent,
        } => {
            let mut mantissa = String::with_capacity(whole.len() + fraction.len());
            mantissa.push_str(whole);
            mantissa.push_str(fraction);

            let exp = match exponent {
                Some(e) => e.parse::<i64>().ok()?,
                None => 0,
            };
            if exp.abs() > MAX_EXPONENT {
                return None;
            }
            let shift = exp - fraction.len() as i64;

            let scale = num_traits::pow(BigInt::from(10u32), shift.unsigned_abs() as usize);
            let m = BigRational::from_integer(digits(&mantissa));
            let value = if shift >= 0 {
                m * BigRational::from_integer(scale)
            } else {
                m / BigRational::from_integer(scale)
            };
            (negative, value)
        }
    };

    Some(if negative { -value } else { value })
}

/// Read integer text, honouring `0x`, `0o`, `0b` and leading-zero octal prefixes
pub fn parse_int(text: &str) -> Option<i64> {
    let text = text.trim();
    let (negative, body) = match text.as_bytes().first() {
        Some(b'-') => (true, &text[1..]),
        Some(b'+') => (false, &text[1..]),
        _ => (false, text),
    };

    let lower = body.to_ascii_lowercase();
    let (radix, digits) = if let Some(rest) = lower.strip_prefix("0x") {
        (16, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0o") {
        (8, rest.to_string())
    } else if let Some(rest) = lower.strip_prefix("0b") {
        (2, rest.to_string())
    } else if lower.len() > 1 && lower.starts_with('0') {
        (8, lower[1..].to_string())
    } else {
        (10, lower)
    };

    let digits = digits.replace('_', "");
    if digits.is_empty() || digits.starts_with(|c: char| c == '+' || c == '-') {
        return None;
    }

    let signed = if negative {
        format!("-{digits}")
    } else {
        digits
    };
    i64::from_str_radix(&signed, radix).ok()
}

/// Read float text
pub fn parse_float(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok()
}

/// Shortest round-tripping text for `x`.
///
/// Exponent form is used when the decimal exponent is below -4 or at least 6,
/// with a sign and at least two exponent digits (`1e+06`, `2.5e-07`).
pub fn format_float(x: f64) -> String {
    if x.is_nan() {
        return "NaN".to_string();
    }
    if x.is_infinite() {
        return if x > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let sci = format!("{x:e}");
    let (mantissa, exp) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => return sci,
    };

    if (-4..6).contains(&exp) {
        format!("{x}")
    } else {
        let sign = if exp < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exp.unsigned_abs())
    }
}

/// Text form of an exact rational: `n` when integral, `n/d` otherwise
pub fn format_rational(r: &BigRational) -> String {
    if r.denom().is_one() {
        r.numer().to_string()
    } else {
        format!("{}/{}", r.numer(), r.denom())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(n: i64, d: i64) -> BigRational {
        BigRational::new(BigInt::from(n), BigInt::from(d))
    }

    #[test]
    fn parses_integers() {
        assert_eq!(parse_rational("42"), Some(ratio(42, 1)));
        assert_eq!(parse_rational("-7"), Some(ratio(-7, 1)));
        assert_eq!(parse_rational("+3"), Some(ratio(3, 1)));
    }

    #[test]
    fn parses_fractions_in_lowest_terms() {
        assert_eq!(parse_rational("6/8"), Some(ratio(3, 4)));
        assert_eq!(parse_rational("-1/3"), Some(ratio(-1, 3)));
        assert_eq!(parse_rational("1/0"), None);
    }

    #[test]
    fn parses_decimals_exactly() {
        assert_eq!(parse_rational("1.5"), Some(ratio(3, 2)));
        assert_eq!(parse_rational("0.1"), Some(ratio(1, 10)));
        assert_eq!(parse_rational(".25"), Some(ratio(1, 4)));
        assert_eq!(parse_rational("2."), Some(ratio(2, 1)));
        assert_eq!(parse_rational("1e3"), Some(ratio(1000, 1)));
        assert_eq!(parse_rational("-2.5E-1"), Some(ratio(-1, 4)));
    }

    #[test]
    fn rejects_non_numeric_text() {
        for text in ["", "abc", "1/", "/2", "1.2.3", "12abc", ".", "e5", "--1", "1e"] {
            assert_eq!(parse_rational(text), None, "{text:?}");
        }
    }

    #[test]
    fn rejects_huge_exponents() {
        assert_eq!(parse_rational("1e999999"), None);
    }

    #[test]
    fn parses_prefixed_integers() {
        assert_eq!(parse_int("255"), Some(255));
        assert_eq!(parse_int("-0x10"), Some(-16));
        assert_eq!(parse_int("0o17"), Some(15));
        assert_eq!(parse_int("017"), Some(15));
        assert_eq!(parse_int("0b101"), Some(5));
        assert_eq!(parse_int("0"), Some(0));
        assert_eq!(parse_int("1_000"), Some(1000));
        assert_eq!(parse_int("1.5"), None);
        assert_eq!(parse_int("0x"), None);
        assert_eq!(parse_int("x"), None);
    }

    #[test]
    fn formats_floats_like_shortest_g() {
        assert_eq!(format_float(1.5), "1.5");
        assert_eq!(format_float(100000.0), "100000");
        assert_eq!(format_float(1e6), "1e+06");
        assert_eq!(format_float(1234567.0), "1.234567e+06");
        assert_eq!(format_float(0.0001), "0.0001");
        assert_eq!(format_float(0.00001), "1e-05");
        assert_eq!(format_float(-2.5e-7), "-2.5e-07");
        assert_eq!(format_float(0.0), "0");
        assert_eq!(format_float(f64::INFINITY), "+Inf");
        assert_eq!(format_float(f64::NAN), "NaN");
    }

    #[test]
    fn formats_rationals() {
        assert_eq!(format_rational(&ratio(4, 2)), "2");
        assert_eq!(format_rational(&ratio(-1, 3)), "-1/3");
    }
}
