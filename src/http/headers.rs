use std::collections::HashMap;

const CRLF: &[u8] = b"\r\n";

/// Characters allowed in a field-name besides ASCII letters and digits.
const TOKEN_SPECIALS: &[u8] = b"!#$%&'*+-.^_`|~";

/// Errors raised while parsing or setting a header field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HeaderError {
    #[error("header line has no ':' separator: {0}")]
    MissingSeparator(String),
    #[error("invalid field-name: {0:?}")]
    InvalidFieldName(String),
    #[error("malformed header, no OWS before ':' permitted: {0}")]
    WhitespaceBeforeSeparator(String),
    #[error("malformed header value, no OWS next to ':' permitted: {0}")]
    WhitespaceAroundColon(String),
    #[error("header line is not valid UTF-8")]
    InvalidEncoding,
}

/// Case-insensitive header map.
///
/// Names are stored lower-cased. Setting a name that is already present
/// appends `", " + value` to the stored value instead of replacing it, which
/// is how repeated header fields are combined on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderTable {
    entries: HashMap<String, String>,
}

impl HeaderTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a single header line from the front of `data`.
    ///
    /// Returns `(consumed, done)`:
    ///
    /// * `(0, false)` when no complete line is buffered yet,
    /// * `(2, true)` when the line is the empty header-block terminator,
    /// * `(n, false)` after storing one field, `n` including the line's CRLF.
    ///
    /// On error nothing is consumed and the table is left untouched.
    pub fn parse_one_line(&mut self, data: &[u8]) -> Result<(usize, bool), HeaderError> {
        let Some(line_end) = find_crlf(data) else {
            return Ok((0, false));
        };
        if line_end == 0 {
            return Ok((CRLF.len(), true));
        }

        let line = std::str::from_utf8(&data[..line_end]).map_err(|_| HeaderError::InvalidEncoding)?;
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| HeaderError::MissingSeparator(line.to_string()))?;

        if name.ends_with(is_ows) {
            return Err(HeaderError::WhitespaceBeforeSeparator(name.to_string()));
        }

        self.set(name.trim(), value)?;
        Ok((line_end + CRLF.len(), false))
    }

    /// Adds a field, combining with an existing value of the same name.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let key = normalize_name(name)?;
        let value = normalize_value(value)?;

        match self.entries.get_mut(&key) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(&value);
            }
            None => {
                self.entries.insert(key, value);
            }
        }
        Ok(())
    }

    /// Stores a field, discarding any previous value.
    pub fn replace(&mut self, name: &str, value: &str) -> Result<(), HeaderError> {
        let key = normalize_name(name)?;
        let value = normalize_value(value)?;
        self.entries.insert(key, value);
        Ok(())
    }

    /// Stores a field whose name is already a lower-case token and whose
    /// value is already trimmed, skipping validation.
    pub(crate) fn insert_normalized(&mut self, name: &'static str, value: String) {
        self.entries.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .get(&name.to_ascii_lowercase())
            .map(|v| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&name.to_ascii_lowercase())
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.entries.remove(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Serializes every field as `name: value\r\n` followed by the blank
    /// line that ends a header block.
    pub fn write_block(&self, buf: &mut Vec<u8>) {
        for (k, v) in &self.entries {
            buf.extend_from_slice(k.as_bytes());
            buf.extend_from_slice(b": ");
            buf.extend_from_slice(v.as_bytes());
            buf.extend_from_slice(CRLF);
        }
        buf.extend_from_slice(CRLF);
    }
}

pub(crate) fn find_crlf(data: &[u8]) -> Option<usize> {
    data.windows(CRLF.len()).position(|w| w == CRLF)
}

fn is_ows(c: char) -> bool {
    c == ' ' || c == '\t'
}

fn is_token_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || TOKEN_SPECIALS.contains(&b)
}

fn normalize_name(name: &str) -> Result<String, HeaderError> {
    if name.is_empty() || !name.bytes().all(is_token_char) {
        return Err(HeaderError::InvalidFieldName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}

// A colon inside a value (ports, URLs) is kept, but the last one must not
// have whitespace on either side.
fn normalize_value(value: &str) -> Result<String, HeaderError> {
    if let Some(idx) = value.rfind(':') {
        let before = value[..idx].ends_with(is_ows);
        let after = value[idx + 1..].starts_with(is_ows);
        if before || after {
            return Err(HeaderError::WhitespaceAroundColon(value.trim().to_string()));
        }
    }
    Ok(value.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_with_port() {
        let mut headers = HeaderTable::new();
        let data = b"Host: localhost:42069\r\n\r\n";

        let (n, done) = headers.parse_one_line(data).unwrap();
        assert_eq!(n, 23);
        assert!(!done);
        assert_eq!(headers.get("host"), Some("localhost:42069"));

        let (n, done) = headers.parse_one_line(&data[n..]).unwrap();
        assert_eq!(n, 2);
        assert!(done);
    }

    #[test]
    fn value_colon_with_whitespace_is_rejected() {
        let mut headers = HeaderTable::new();
        let result = headers.parse_one_line(b"Host: localhost :42069\r\n\r\n");
        assert!(matches!(result, Err(HeaderError::WhitespaceAroundColon(_))));
        assert!(headers.is_empty());
    }
}
