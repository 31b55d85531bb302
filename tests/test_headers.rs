use rawhttp::http::headers::{HeaderError, HeaderTable};

#[test]
fn test_valid_single_header() {
    let mut headers = HeaderTable::new();
    let (n, done) = headers.parse_one_line(b"Host: localhost:42069\r\n\r\n").unwrap();

    assert_eq!(headers.get("host"), Some("localhost:42069"));
    assert_eq!(n, 23);
    assert!(!done);
}

#[test]
fn test_value_with_url_keeps_colons() {
    let line = "Ghost: https://google.com:69\r\n";
    let mut headers = HeaderTable::new();
    let (n, done) = headers.parse_one_line(format!("{line}\r\n").as_bytes()).unwrap();

    assert_eq!(headers.get("ghost"), Some("https://google.com:69"));
    assert_eq!(n, line.len());
    assert!(!done);
}

#[test]
fn test_value_surrounding_whitespace_is_trimmed() {
    let line = "Host:                        localhost:42069                 \r\n";
    let mut headers = HeaderTable::new();
    let (n, _) = headers.parse_one_line(line.as_bytes()).unwrap();

    assert_eq!(headers.get("host"), Some("localhost:42069"));
    assert_eq!(n, line.len());
}

#[test]
fn test_two_headers_then_terminator() {
    let first = "Ghost: https://google.com:69\r\n";
    let second = "Host: localhost:42069\r\n";
    let data = format!("{first}{second}\r\n");
    let data = data.as_bytes();
    let mut headers = HeaderTable::new();

    let (n1, done) = headers.parse_one_line(data).unwrap();
    assert_eq!(n1, first.len());
    assert!(!done);

    let (n2, done) = headers.parse_one_line(&data[n1..]).unwrap();
    assert_eq!(n2, second.len());
    assert!(!done);

    let (n3, done) = headers.parse_one_line(&data[n1 + n2..]).unwrap();
    assert_eq!(n3, 2);
    assert!(done);

    assert_eq!(headers.get("ghost"), Some("https://google.com:69"));
    assert_eq!(headers.get("host"), Some("localhost:42069"));
    assert_eq!(headers.len(), 2);
}

#[test]
fn test_incomplete_line_needs_more_data() {
    let mut headers = HeaderTable::new();
    let (n, done) = headers.parse_one_line(b"Host: localho").unwrap();

    assert_eq!(n, 0);
    assert!(!done);
    assert!(headers.is_empty());
}

#[test]
fn test_whitespace_before_separator_is_rejected() {
    let mut headers = HeaderTable::new();
    let result = headers.parse_one_line(b"       Host : localhost:42069       \r\n\r\n");

    assert!(matches!(result, Err(HeaderError::WhitespaceBeforeSeparator(_))));
    assert!(headers.is_empty());
}

#[test]
fn test_whitespace_beside_value_colon_is_rejected() {
    let mut headers = HeaderTable::new();

    let result = headers.parse_one_line(b"Host: localhost :42069\r\n\r\n");
    assert!(matches!(result, Err(HeaderError::WhitespaceAroundColon(_))));

    let result = headers.parse_one_line(b"Host: localhost: 42069\r\n\r\n");
    assert!(matches!(result, Err(HeaderError::WhitespaceAroundColon(_))));
}

#[test]
fn test_invalid_field_name_character() {
    let mut headers = HeaderTable::new();
    let result = headers.parse_one_line(b"H\xc2\xa9st: localhost:42069\r\n\r\n");
    assert!(matches!(result, Err(HeaderError::InvalidFieldName(_))));

    let result = headers.parse_one_line(b"Ho@st: localhost:42069\r\n\r\n");
    assert!(matches!(result, Err(HeaderError::InvalidFieldName(name)) if name == "Ho@st"));
    assert!(headers.is_empty());
}

#[test]
fn test_token_special_characters_are_allowed() {
    let mut headers = HeaderTable::new();
    let (n, _) = headers
        .parse_one_line(b"X-!#$%&'*+-.^_`|~9: ok\r\n")
        .unwrap();

    assert!(n > 0);
    assert_eq!(headers.get("x-!#$%&'*+-.^_`|~9"), Some("ok"));
}

#[test]
fn test_missing_separator() {
    let mut headers = HeaderTable::new();
    let result = headers.parse_one_line(b"BrokenHeader\r\n\r\n");

    assert!(matches!(result, Err(HeaderError::MissingSeparator(_))));
}

#[test]
fn test_empty_field_name() {
    let mut headers = HeaderTable::new();
    let result = headers.parse_one_line(b": value\r\n\r\n");

    assert!(matches!(result, Err(HeaderError::InvalidFieldName(_))));
}

#[test]
fn test_duplicate_keys_combine() {
    let mut headers = HeaderTable::new();
    let data = b"Host: a\r\nHost: b\r\n\r\n";

    let (n1, _) = headers.parse_one_line(data).unwrap();
    let (n2, _) = headers.parse_one_line(&data[n1..]).unwrap();
    let (_, done) = headers.parse_one_line(&data[n1 + n2..]).unwrap();

    assert!(done);
    assert_eq!(headers.get("host"), Some("a, b"));
    assert_eq!(headers.len(), 1);
}

#[test]
fn test_set_appends_and_replace_overwrites() {
    let mut headers = HeaderTable::new();
    headers.set("Trailer", "X-Content-SHA256").unwrap();
    headers.set("trailer", "X-Content-Length").unwrap();
    assert_eq!(headers.get("TRAILER"), Some("X-Content-SHA256, X-Content-Length"));

    headers.replace("Trailer", "X-Only").unwrap();
    assert_eq!(headers.get("trailer"), Some("X-Only"));

    assert_eq!(headers.remove("TRAILER").as_deref(), Some("X-Only"));
    assert!(!headers.contains("trailer"));
}

#[test]
fn test_set_validates_name() {
    let mut headers = HeaderTable::new();
    assert!(headers.set("Bad Name", "v").is_err());
    assert!(headers.is_empty());
}

#[test]
fn test_write_block() {
    let mut headers = HeaderTable::new();
    headers.set("Content-Type", "text/html").unwrap();

    let mut buf = Vec::new();
    headers.write_block(&mut buf);

    assert_eq!(buf, b"content-type: text/html\r\n\r\n".to_vec());
}
