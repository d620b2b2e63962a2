//! Delimiter parsing for configuration values.

use crate::errors::CsvProviderError;

/// Parses a configured field delimiter into the byte the CSV reader expects.
///
/// Accepts a single ASCII character other than a quote or line break, and the
/// spellings `\t` (escaped or literal) and `tab` for tab-separated files.
///
/// # Examples
/// ```
/// use pplcsv_providers_csv::parse_delimiter;
///
/// assert_eq!(parse_delimiter(",")?, b',');
/// assert_eq!(parse_delimiter(";")?, b';');
/// assert_eq!(parse_delimiter("\\t")?, b'\t');
/// assert!(parse_delimiter(",,").is_err());
/// # Ok::<(), pplcsv_providers_csv::CsvProviderError>(())
/// ```
pub fn parse_delimiter(raw: &str) -> Result<u8, CsvProviderError> {
    if matches!(raw, "\\t" | "\t") || raw.eq_ignore_ascii_case("tab") {
        return Ok(b'\t');
    }
    let mut chars = raw.chars();
    match (chars.next(), chars.next()) {
        (Some(ch), None) if ch.is_ascii() && !matches!(ch, '"' | '\n' | '\r') => {
            Ok(ch as u8)
        }
        _ => Err(CsvProviderError::InvalidDelimiter {
            raw: raw.to_owned(),
        }),
    }
}
