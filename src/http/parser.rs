use tokio::io::AsyncRead;

use crate::http::headers::{find_crlf, HeaderError, HeaderTable};
use crate::http::reader::IncrementalReader;
use crate::http::request::{Method, Request, RequestLine};

const SUPPORTED_VERSION: &str = "1.1";

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("bad request-line format: {0:?}")]
    InvalidRequestLine(String),
    #[error("invalid method: {0}")]
    InvalidMethod(String),
    #[error("unsupported HTTP version: {0}")]
    UnsupportedVersion(String),
    #[error(transparent)]
    InvalidHeader(#[from] HeaderError),
    #[error("invalid content-length: {0:?}")]
    InvalidContentLength(String),
    #[error("content-length is {expected} but body has {actual} bytes")]
    BodyLengthMismatch { expected: usize, actual: usize },
    #[error("request parsing already done")]
    AlreadyDone,
    #[error("connection closed before a complete request was received")]
    Incomplete,
    #[error("failed to read request: {0}")]
    Io(#[from] std::io::Error),
}

/// Where the parser is within a request. Only ever moves forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ParseState {
    Initialized,
    ParsingHeaders,
    ParsingBody,
    Done,
}

/// Resumable request parser.
///
/// Feed it the unconsumed bytes with [`parse`](RequestParser::parse); it
/// returns how many it used and keeps its place between calls. A body is
/// only read when `content-length` is declared, and since the body state
/// takes everything it is given, the length is reconciled once the peer
/// signals end-of-stream through [`end_of_stream`](RequestParser::end_of_stream).
#[derive(Debug)]
pub struct RequestParser {
    state: ParseState,
    request_line: Option<RequestLine>,
    headers: HeaderTable,
    body: Vec<u8>,
    content_length: Option<usize>,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::Initialized,
            request_line: None,
            headers: HeaderTable::new(),
            body: Vec::new(),
            content_length: None,
        }
    }

    pub fn state(&self) -> ParseState {
        self.state
    }

    pub fn is_done(&self) -> bool {
        self.state == ParseState::Done
    }

    pub fn request_line(&self) -> Option<&RequestLine> {
        self.request_line.as_ref()
    }

    pub fn headers(&self) -> &HeaderTable {
        &self.headers
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Consumes as much of `data` as the current state allows and returns
    /// the number of bytes used. Zero means more input is needed.
    pub fn parse(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        if self.is_done() {
            return Err(ParseError::AlreadyDone);
        }

        let mut total = 0;
        while !self.is_done() {
            let n = self.parse_single(&data[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }

    fn parse_single(&mut self, data: &[u8]) -> Result<usize, ParseError> {
        match self.state {
            ParseState::Initialized => {
                let Some((line, n)) = parse_request_line(data)? else {
                    return Ok(0);
                };
                self.request_line = Some(line);
                self.state = ParseState::ParsingHeaders;
                Ok(n)
            }
            ParseState::ParsingHeaders => {
                let (n, done) = self.headers.parse_one_line(data)?;
                if done {
                    self.finish_headers()?;
                }
                Ok(n)
            }
            ParseState::ParsingBody => {
                self.body.extend_from_slice(data);
                Ok(data.len())
            }
            ParseState::Done => Err(ParseError::AlreadyDone),
        }
    }

    fn finish_headers(&mut self) -> Result<(), ParseError> {
        match self.headers.get("content-length") {
            Some(raw) => {
                let len = raw
                    .parse::<usize>()
                    .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?;
                self.content_length = Some(len);
                self.state = ParseState::ParsingBody;
            }
            None => self.state = ParseState::Done,
        }
        Ok(())
    }

    /// Tells the parser the byte source is exhausted.
    ///
    /// A request that declared `content-length` must have delivered exactly
    /// that many body bytes. Without one, running out of input after the
    /// request-line is a complete request.
    pub fn end_of_stream(&mut self) -> Result<(), ParseError> {
        match self.state {
            ParseState::Initialized => Err(ParseError::Incomplete),
            ParseState::ParsingHeaders if !self.headers.contains("content-length") => {
                self.state = ParseState::Done;
                Ok(())
            }
            ParseState::ParsingHeaders | ParseState::ParsingBody => {
                let expected = match self.content_length {
                    Some(len) => len,
                    None => {
                        let raw = self.headers.get("content-length").unwrap_or_default();
                        raw.parse::<usize>()
                            .map_err(|_| ParseError::InvalidContentLength(raw.to_string()))?
                    }
                };
                if self.body.len() != expected {
                    return Err(ParseError::BodyLengthMismatch {
                        expected,
                        actual: self.body.len(),
                    });
                }
                self.state = ParseState::Done;
                Ok(())
            }
            ParseState::Done => Ok(()),
        }
    }

    /// Hands out the finished request.
    pub fn into_request(self) -> Result<Request, ParseError> {
        match (self.state, self.request_line) {
            (ParseState::Done, Some(request_line)) => Ok(Request {
                request_line,
                headers: self.headers,
                body: self.body,
            }),
            _ => Err(ParseError::Incomplete),
        }
    }
}

fn parse_request_line(data: &[u8]) -> Result<Option<(RequestLine, usize)>, ParseError> {
    let Some(idx) = find_crlf(data) else {
        return Ok(None);
    };
    let text = std::str::from_utf8(&data[..idx]).map_err(|_| {
        ParseError::InvalidRequestLine(String::from_utf8_lossy(&data[..idx]).into_owned())
    })?;
    let line = request_line_from_str(text)?;
    Ok(Some((line, idx + 2)))
}

fn request_line_from_str(line: &str) -> Result<RequestLine, ParseError> {
    let parts: Vec<&str> = line.split(' ').collect();
    let [method, target, version] = parts[..] else {
        return Err(ParseError::InvalidRequestLine(line.to_string()));
    };

    let method = Method::from_str(method).ok_or_else(|| ParseError::InvalidMethod(method.to_string()))?;

    match version.split_once('/') {
        Some(("HTTP", SUPPORTED_VERSION)) => {}
        _ => return Err(ParseError::UnsupportedVersion(version.to_string())),
    }

    Ok(RequestLine {
        method,
        target: target.to_string(),
        version: SUPPORTED_VERSION.to_string(),
    })
}

/// Reads and parses one request from `reader`.
///
/// Bytes the parser consumed are released from the reader's buffer after
/// every step, so parsing always resumes at the first unconsumed byte.
pub async fn read_request<R>(reader: &mut IncrementalReader<R>) -> Result<Request, ParseError>
where
    R: AsyncRead + Unpin,
{
    let mut parser = RequestParser::new();

    while !parser.is_done() {
        let fill = reader.read().await?;

        if !reader.buffered().is_empty() {
            let consumed = parser.parse(reader.buffered())?;
            reader.consume(consumed);
        }

        if fill.eof && !parser.is_done() {
            parser.end_of_stream()?;
        }
    }

    parser.into_request()
}
