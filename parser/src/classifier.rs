use std::fmt;

pub const PARSED_MARKER: &str = "Parsed";
pub const DATA_MARKER: &str = "Data:";
pub const OPEN_BRACE: &str = "{";
pub const CLOSE_BRACE: &str = "}";

/// Classification of the tokens following a line's receipt time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    NotEvent,
    InvalidEvent,
    SingleLineEvent,
    MultiLineEventBegin,
    MultiLineEventEnd,
    /// Both braces present but the closing one comes first.
    Error,
}

impl RecordType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::NotEvent => "NOT_EVENT",
            RecordType::InvalidEvent => "INVALID_EVENT",
            RecordType::SingleLineEvent => "SINGLE_LINE_EVENT",
            RecordType::MultiLineEventBegin => "MULTI_LINE_EVENT_BEGIN",
            RecordType::MultiLineEventEnd => "MULTI_LINE_EVENT_END",
            RecordType::Error => "ERROR",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of the first token equal to `needle`.
pub fn find_token<S: AsRef<str>>(tokens: &[S], needle: &str) -> Option<usize> {
    tokens.iter().position(|token| token.as_ref() == needle)
}

pub fn classify<S: AsRef<str>>(remainder: &[S]) -> RecordType {
    if find_token(remainder, PARSED_MARKER).is_none() || find_token(remainder, DATA_MARKER).is_none()
    {
        return RecordType::NotEvent;
    }

    match (
        find_token(remainder, OPEN_BRACE),
        find_token(remainder, CLOSE_BRACE),
    ) {
        (None, None) => RecordType::InvalidEvent,
        (Some(open), Some(close)) if open < close => RecordType::SingleLineEvent,
        (Some(_), Some(_)) => RecordType::Error,
        (Some(_), None) => RecordType::MultiLineEventBegin,
        (None, Some(_)) => RecordType::MultiLineEventEnd,
    }
}
