use std::fmt;

/// Currency amounts are integer cents; 2.99 is stored as 299.
pub type Cents = i64;

/// Format cents as a decimal string, e.g. 600 -> "6.00", -1234 -> "-12.34".
pub fn format_cents(cents: Cents) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let abs = cents.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}

/// Parse a decimal price like "2.99", "3", ".5" into cents.
/// Digits past the second decimal place are truncated.
pub fn parse_cents(input: &str) -> Result<Cents, ParseCentsError> {
    let input = input.trim();
    let (negative, digits) = match input.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, input),
    };
    if digits.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }

    let (units_str, fraction_str) = digits.split_once('.').unwrap_or((digits, ""));
    if units_str.is_empty() && fraction_str.is_empty() {
        return Err(ParseCentsError::InvalidFormat);
    }
    if fraction_str.contains('.') || !is_ascii_digits(units_str) || !is_ascii_digits(fraction_str)
    {
        return Err(ParseCentsError::InvalidFormat);
    }

    let units: i64 = if units_str.is_empty() {
        0
    } else {
        units_str
            .parse()
            .map_err(|_| ParseCentsError::InvalidFormat)?
    };

    let fraction: i64 = match fraction_str.chars().take(2).collect::<String>() {
        f if f.is_empty() => 0,
        f if f.len() == 1 => f.parse::<i64>().map_err(|_| ParseCentsError::InvalidFormat)? * 10,
        f => f.parse().map_err(|_| ParseCentsError::InvalidFormat)?,
    };

    let cents = units
        .checked_mul(100)
        .and_then(|c| c.checked_add(fraction))
        .ok_or(ParseCentsError::OutOfRange)?;
    Ok(if negative { -cents } else { cents })
}

/// Price of `quantity` units at `unit_price`, or `None` on overflow.
pub fn line_total(unit_price: Cents, quantity: i64) -> Option<Cents> {
    unit_price.checked_mul(quantity)
}

fn is_ascii_digits(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCentsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCentsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCentsError::InvalidFormat => write!(f, "invalid money format"),
            ParseCentsError::OutOfRange => write!(f, "amount out of range"),
        }
    }
}

impl std::error::Error for ParseCentsError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cents() {
        assert_eq!(format_cents(600), "6.00");
        assert_eq!(format_cents(299), "2.99");
        assert_eq!(format_cents(5), "0.05");
        assert_eq!(format_cents(0), "0.00");
        assert_eq!(format_cents(-1234), "-12.34");
    }

    #[test]
    fn test_parse_cents() {
        assert_eq!(parse_cents("2.00"), Ok(200));
        assert_eq!(parse_cents("2.99"), Ok(299));
        assert_eq!(parse_cents("3"), Ok(300));
        assert_eq!(parse_cents("4.2"), Ok(420));
        assert_eq!(parse_cents(".50"), Ok(50));
        assert_eq!(parse_cents("3."), Ok(300));
        assert_eq!(parse_cents(" 1.5 "), Ok(150));
        assert_eq!(parse_cents("-7.25"), Ok(-725));
        assert_eq!(parse_cents("9.999"), Ok(999)); // Truncates
    }

    #[test]
    fn test_parse_cents_invalid() {
        assert!(parse_cents("").is_err());
        assert!(parse_cents("-").is_err());
        assert_eq!(parse_cents("."), Err(ParseCentsError::InvalidFormat));
        assert_eq!(parse_cents("-."), Err(ParseCentsError::InvalidFormat));
        assert!(parse_cents("abc").is_err());
        assert!(parse_cents("1.2.3").is_err());
        assert!(parse_cents("1,50").is_err());
        assert_eq!(
            parse_cents("99999999999999999999"),
            Err(ParseCentsError::InvalidFormat)
        );
        assert_eq!(
            parse_cents("99999999999999999"),
            Err(ParseCentsError::OutOfRange)
        );
    }

    #[test]
    fn test_line_total() {
        assert_eq!(line_total(200, 3), Some(600));
        assert_eq!(line_total(0, 10), Some(0));
        assert_eq!(line_total(i64::MAX, 2), None);
    }
}
