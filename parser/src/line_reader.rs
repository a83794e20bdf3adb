use crate::{LineError, LogLine, ReceiptTime, MONTHS};
use chrono::NaiveTime;
use std::io::{self, BufRead};
use tracing::warn;

/// Sequential reader yielding numbered log lines.
pub struct LineSource<R> {
    reader: R,
    line_number: usize,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
        }
    }

    /// Number of lines yielded so far.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }
}

impl<R: BufRead> Iterator for LineSource<R> {
    type Item = io::Result<LogLine>;

    fn next(&mut self) -> Option<Self::Item> {
        let mut buf = Vec::new();
        match self.reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                let text = match String::from_utf8(buf) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!("Line {}: invalid UTF-8, decoding lossily", self.line_number);
                        String::from_utf8_lossy(e.as_bytes()).into_owned()
                    }
                };
                Some(Ok(LogLine {
                    number: self.line_number,
                    text,
                }))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// A validated line: its receipt time and the tokens following it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRun {
    pub receipt: ReceiptTime,
    pub remainder: Vec<String>,
}

pub fn month_number(token: &str) -> Option<u32> {
    MONTHS
        .iter()
        .position(|month| *month == token)
        .map(|idx| idx as u32 + 1)
}

/// Split a line on whitespace and validate the `<Mon> <Day> <HH:MM:SS>` prefix.
pub fn tokenize(line: &str) -> Result<TokenRun, LineError> {
    let mut tokens = line.split_whitespace();

    let month_token = tokens.next().ok_or(LineError::Empty)?;
    let month =
        month_number(month_token).ok_or_else(|| LineError::UnknownMonth(month_token.to_string()))?;

    let day_token = tokens.next().ok_or(LineError::MissingReceiptTime)?;
    let time_token = tokens.next().ok_or(LineError::MissingReceiptTime)?;

    let day = day_token
        .parse::<u32>()
        .ok()
        .filter(|day| (1..=31).contains(day))
        .ok_or_else(|| LineError::InvalidDay(day_token.to_string()))?;
    let time = NaiveTime::parse_from_str(time_token, "%H:%M:%S")
        .map_err(|_| LineError::InvalidTime(time_token.to_string()))?;

    Ok(TokenRun {
        receipt: ReceiptTime { month, day, time },
        remainder: tokens.map(str::to_string).collect(),
    })
}
