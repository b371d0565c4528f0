use std::fmt;

/// Money is represented as integer cents to avoid floating-point precision issues.
/// Two decimal places are stored, so 1,234.50 = 123450 cents.
pub type Cents = i64;

/// Format cents as a plain decimal string.
/// Example: 5000 -> "50.00", -1234 -> "-12.34"
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs_cents / 100, abs_cents % 100)
}

/// Format cents with thousands separators.
/// Example: 123456789 -> "1,234,567.89"
pub fn format_grouped(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs_cents = cents.unsigned_abs();
    let units = (abs_cents / 100).to_string();

    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, digit) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}{}.{:02}", sign, grouped, abs_cents % 100)
}

/// Format cents for display with a currency symbol prefix.
/// Example: ("Rs. ", 50000) -> "Rs. 500.00"
pub fn format_money(symbol: &str, cents: Cents) -> String {
    if cents < 0 {
        format!("-{}{}", symbol, format_grouped(cents.saturating_abs()))
    } else {
        format!("{}{}", symbol, format_grouped(cents))
    }
}

/// Parse a decimal string into cents.
/// Example: "50.00" -> 5000, "12.5" -> 1250, "100" -> 10000
///
/// More than two fractional digits is rejected rather than truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };

    let (units_str, fraction_str) = digits.split_once('.').unwrap_or((digits, ""));

    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
    if !all_digits(units_str) || !all_digits(fraction_str) {
        return Err(ParseCentsError::InvalidFormat);
    }
    if fraction_str.len() > 2 {
        return Err(ParseCentsError::ExcessPrecision);
    }

    // Only ASCII digits remain, so a parse failure means the value is too large.
    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str.parse().map_err(|_| ParseCentsError::Overflow)?
    };
    let fraction: i64 = match fraction_str.len() {
        0 => 0,
        // Single digit like "5" means 50 cents
        1 => fraction_str.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        _ => fraction_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::Overflow)?;
    Ok(if negative { -cents } else { cents })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    ExcessPrecision,
    Overflow,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::ExcessPrecision => {
                write!(f, "money amounts have at most two decimal places")
            }
            ParseCentsError::Overflow => write!(f, "money amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

/// Serde adapter for cents on the wire.
///
/// Amounts are written as decimal strings ("600.00") and read from either a
/// JSON number or a decimal string.
pub mod decimal_cents {
    use std::fmt;

    use serde::{Deserializer, Serializer, de};

    use super::{Cents, format_cents, parse_cents};

    pub fn serialize<S: Serializer>(cents: &Cents, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_cents(*cents))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Cents, D::Error> {
        deserializer.deserialize_any(CentsVisitor)
    }

    struct CentsVisitor;

    impl de::Visitor<'_> for CentsVisitor {
        type Value = Cents;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a decimal amount with at most two fractional digits")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Cents, E> {
            v.checked_mul(100)
                .ok_or_else(|| E::custom("money amount out of range"))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Cents, E> {
            i64::try_from(v)
                .ok()
                .and_then(|v| v.checked_mul(100))
                .ok_or_else(|| E::custom("money amount out of range"))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Cents, E> {
            if !v.is_finite() {
                return Err(E::custom("money amount is not a finite number"));
            }
            // f64 Display is the shortest round-trip form and never uses exponents.
            parse_cents(&v.to_string()).map_err(E::custom)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Cents, E> {
            parse_cents(v).map_err(E::custom)
        }
    }
}
