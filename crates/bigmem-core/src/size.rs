//! Size-string parsing.

use thiserror::Error;

/// Errors produced by [`parse_size`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SizeError {
    /// The numeric part is missing, not positive, or overflows.
    #[error("the size must be a positive integer")]
    InvalidSize,
    /// Trailing characters other than a single k/K, m/M, or g/G suffix.
    #[error("unrecognized size suffix (expected k, K, m, M, or g, G)")]
    InvalidSuffix,
}

/// Parses a size string into a byte count.
///
/// The numeric part accepts the bases `strtoll` with base 0 would: `0x`
/// prefixed hex, a leading `0` for octal, decimal otherwise. It may be
/// followed by optional whitespace and a single `k`/`K` (×2^10), `m`/`M`
/// (×2^20), or `g`/`G` (×2^30) suffix; without a suffix the value counts
/// raw bytes.
///
/// # Errors
///
/// [`SizeError::InvalidSize`] if the value is not a positive integer (or
/// the multiplied result overflows), [`SizeError::InvalidSuffix`] for any
/// other trailing characters.
pub fn parse_size(text: &str) -> Result<u64, SizeError> {
    let s = text.trim_start();
    let (negative, s) = match s.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, s.strip_prefix('+').unwrap_or(s)),
    };
    let (radix, s) = if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        (16, hex)
    } else if s.starts_with('0') {
        (8, s)
    } else {
        (10, s)
    };

    let split = s
        .find(|c: char| !c.is_digit(radix))
        .unwrap_or(s.len());
    let (digits, rest) = s.split_at(split);
    if digits.is_empty() {
        return Err(SizeError::InvalidSize);
    }
    let value = i64::from_str_radix(digits, radix).map_err(|_| SizeError::InvalidSize)?;
    if negative || value <= 0 {
        return Err(SizeError::InvalidSize);
    }

    let multiplier: u64 = match rest.trim() {
        "" => 1,
        "k" | "K" => 1 << 10,
        "m" | "M" => 1 << 20,
        "g" | "G" => 1 << 30,
        _ => return Err(SizeError::InvalidSuffix),
    };
    (value as u64)
        .checked_mul(multiplier)
        .ok_or(SizeError::InvalidSize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_bytes() {
        assert_eq!(parse_size("10"), Ok(10));
        assert_eq!(parse_size("+10"), Ok(10));
        assert_eq!(parse_size("  10  "), Ok(10));
    }

    #[test]
    fn suffixes() {
        assert_eq!(parse_size("10K"), Ok(10240));
        assert_eq!(parse_size("10k"), Ok(10240));
        assert_eq!(parse_size("2M"), Ok(2097152));
        assert_eq!(parse_size("1G"), Ok(1073741824));
        assert_eq!(parse_size("5 M"), Ok(5242880));
    }

    #[test]
    fn alternate_bases() {
        assert_eq!(parse_size("0x10"), Ok(16));
        assert_eq!(parse_size("0X10K"), Ok(16 * 1024));
        assert_eq!(parse_size("010"), Ok(8));
    }

    #[test]
    fn non_positive_values() {
        assert_eq!(parse_size("0"), Err(SizeError::InvalidSize));
        assert_eq!(parse_size("-5"), Err(SizeError::InvalidSize));
        assert_eq!(parse_size(""), Err(SizeError::InvalidSize));
        assert_eq!(parse_size("abc"), Err(SizeError::InvalidSize));
        // octal parse stops at the 8, leaving a zero value
        assert_eq!(parse_size("08"), Err(SizeError::InvalidSize));
    }

    #[test]
    fn bad_suffixes() {
        assert_eq!(parse_size("10x"), Err(SizeError::InvalidSuffix));
        assert_eq!(parse_size("10 KB"), Err(SizeError::InvalidSuffix));
        assert_eq!(parse_size("10Mx"), Err(SizeError::InvalidSuffix));
    }

    #[test]
    fn overflow_is_invalid() {
        assert_eq!(parse_size("9223372036854775807G"), Err(SizeError::InvalidSize));
        assert_eq!(
            parse_size("99999999999999999999999"),
            Err(SizeError::InvalidSize)
        );
    }
}
