// Line-by-line event assembly.
//
// The assembler is either idle or collecting the tokens of a multi-line
// event. While idle every line is classified; while collecting, lines are
// appended without classification until one ends with a closing brace.
// Continuation lines carry two positional tokens (host and program tag)
// after their receipt time, which are dropped before appending.

use crate::classifier::{classify, find_token, RecordType, CLOSE_BRACE, DATA_MARKER, PARSED_MARKER};
use crate::line_reader::tokenize;
use crate::normalizer::EventNormalizer;
use crate::payload_parser::decode_payload;
use crate::{LogLine, NormalizedEvent, ReceiptTime};
use std::fmt;
use tracing::{debug, error, warn};

/// Tokens after the receipt time of a continuation line that are not payload.
pub const CONTINUATION_PREFIX_TOKENS: usize = 2;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AssemblerState {
    #[default]
    Idle,
    Collecting {
        /// Receipt time of the line that opened the event.
        receipt: ReceiptTime,
        started_at: usize,
        tokens: Vec<String>,
    },
}

/// End-of-run record counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total_lines: usize,
    pub invalid_records: usize,
    pub non_event_records: usize,
    pub invalid_events: usize,
    pub single_line_events: usize,
    pub multi_line_events: usize,
    /// Multi-line events still open at end of input.
    pub truncated_multi_line_events: usize,
    /// Closing-brace lines seen while no multi-line event was open.
    pub orphan_multi_line_ends: usize,
    pub other_errors: usize,
}

impl RunSummary {
    pub fn emitted_events(&self) -> usize {
        self.single_line_events + self.multi_line_events
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Invalid Records", self.invalid_records),
            ("Non-Event Records", self.non_event_records),
            ("Invalid Events", self.invalid_events),
            ("Single Line Events", self.single_line_events),
            ("Multi-Line Events", self.multi_line_events),
            ("Truncated Multi-Line", self.truncated_multi_line_events),
            ("Orphan Multi-Line Ends", self.orphan_multi_line_ends),
        ];
        writeln!(f, "{:<25}: {}", "Total lines processed", with_thousands(self.total_lines))?;
        writeln!(f, "{}", "*".repeat(10))?;
        for (label, count) in rows {
            writeln!(f, "{:<25}: {}", label, with_thousands(count))?;
        }
        write!(f, "{:<25}: {}", "Other Events Errors", with_thousands(self.other_errors))
    }
}

/// `1234567` -> `"1,234,567"`
fn with_thousands(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    SingleLine,
    MultiLine,
}

/// Drives classification and multi-line reassembly over a stream of lines.
pub struct EventAssembler<'a> {
    normalizer: &'a EventNormalizer,
    state: AssemblerState,
    summary: RunSummary,
}

impl<'a> EventAssembler<'a> {
    pub fn new(normalizer: &'a EventNormalizer) -> Self {
        Self {
            normalizer,
            state: AssemblerState::Idle,
            summary: RunSummary::default(),
        }
    }

    pub fn state(&self) -> &AssemblerState {
        &self.state
    }

    pub fn summary(&self) -> &RunSummary {
        &self.summary
    }

    /// Feed one line; returns the event it completes, if any.
    pub fn process_line(&mut self, line: &LogLine) -> Option<NormalizedEvent> {
        self.summary.total_lines += 1;

        let run = match tokenize(&line.text) {
            Ok(run) => run,
            Err(e) => {
                warn!("Line {}: invalid log record, {}", line.number, e);
                self.summary.invalid_records += 1;
                return None;
            }
        };

        match std::mem::take(&mut self.state) {
            AssemblerState::Idle => self.dispatch(line.number, run.receipt, run.remainder),
            AssemblerState::Collecting {
                receipt,
                started_at,
                mut tokens,
            } => {
                let appended: Vec<String> = run
                    .remainder
                    .into_iter()
                    .skip(CONTINUATION_PREFIX_TOKENS)
                    .collect();
                let complete = appended.last().map(String::as_str) == Some(CLOSE_BRACE);
                tokens.extend(appended);

                if complete {
                    debug!(
                        "Line {}: multi-line event from line {} complete",
                        line.number, started_at
                    );
                    self.complete(started_at, &receipt, &tokens, EventKind::MultiLine)
                } else {
                    self.state = AssemblerState::Collecting {
                        receipt,
                        started_at,
                        tokens,
                    };
                    None
                }
            }
        }
    }

    /// Close the run. An event still being collected is dropped and counted.
    pub fn finish(mut self) -> RunSummary {
        if let AssemblerState::Collecting { started_at, .. } = self.state {
            warn!(
                "Multi-line event starting at line {} was never terminated, dropping it",
                started_at
            );
            self.summary.truncated_multi_line_events += 1;
        }
        self.summary
    }

    fn dispatch(
        &mut self,
        line_number: usize,
        receipt: ReceiptTime,
        remainder: Vec<String>,
    ) -> Option<NormalizedEvent> {
        let record_type = classify(&remainder);
        debug!("Line {}: {}", line_number, record_type);

        match record_type {
            RecordType::NotEvent => {
                self.summary.non_event_records += 1;
                None
            }
            RecordType::InvalidEvent => {
                warn!("Line {}: event markers without a payload", line_number);
                self.summary.invalid_events += 1;
                None
            }
            RecordType::SingleLineEvent => {
                self.complete(line_number, &receipt, &remainder, EventKind::SingleLine)
            }
            RecordType::MultiLineEventBegin => {
                self.state = AssemblerState::Collecting {
                    receipt,
                    started_at: line_number,
                    tokens: strip_markers(remainder),
                };
                None
            }
            RecordType::MultiLineEventEnd => {
                warn!(
                    "Line {}: closing brace with no open multi-line event",
                    line_number
                );
                self.summary.orphan_multi_line_ends += 1;
                None
            }
            RecordType::Error => {
                error!("Line {}: unknown record type", line_number);
                self.summary.other_errors += 1;
                None
            }
        }
    }

    fn complete(
        &mut self,
        line_number: usize,
        receipt: &ReceiptTime,
        tokens: &[String],
        kind: EventKind,
    ) -> Option<NormalizedEvent> {
        let payload = match decode_payload(tokens) {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Line {}: invalid event payload, {}", line_number, e);
                self.summary.invalid_events += 1;
                return None;
            }
        };

        match self.normalizer.normalize(receipt, &payload) {
            Ok(event) => {
                match kind {
                    EventKind::SingleLine => self.summary.single_line_events += 1,
                    EventKind::MultiLine => self.summary.multi_line_events += 1,
                }
                Some(event)
            }
            Err(e) => {
                warn!("Line {}: invalid event, {}", line_number, e);
                self.summary.invalid_events += 1;
                None
            }
        }
    }
}

fn strip_markers(mut tokens: Vec<String>) -> Vec<String> {
    for marker in [PARSED_MARKER, DATA_MARKER] {
        if let Some(idx) = find_token(&tokens, marker) {
            tokens.remove(idx);
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node_directory::NodeDirectory;
    use crate::timestamp::{TimestampResolver, DEFAULT_TIME_ZONE};
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use std::io::Cursor;
    use std::sync::Arc;

    const NODES: &str = r#"[{"id": "N1", "name": "ABC_MGT_01 Main Gate"}]"#;

    fn normalizer() -> EventNormalizer {
        let directory = NodeDirectory::from_reader(Cursor::new(NODES)).unwrap();
        EventNormalizer::new(
            TimestampResolver::new(2024, DEFAULT_TIME_ZONE),
            Arc::new(directory),
        )
    }

    fn run(normalizer: &EventNormalizer, text: &str) -> (Vec<NormalizedEvent>, RunSummary) {
        let mut assembler = EventAssembler::new(normalizer);
        let events = text
            .lines()
            .enumerate()
            .filter_map(|(idx, line)| {
                assembler.process_line(&LogLine {
                    number: idx + 1,
                    text: line.to_string(),
                })
            })
            .collect();
        (events, assembler.finish())
    }

    #[test]
    fn test_single_line_event() {
        let normalizer = normalizer();
        let (events, summary) = run(
            &normalizer,
            "Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140', id: 'N1', mt: 'ALM', st: '1' }",
        );

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].ne_code, "ABC_MGT_01");
        assert_eq!(events[0].ne_name, "Main Gate");
        assert_eq!(events[0].mt, "ALM");
        assert_eq!(events[0].fields["st"], "1");
        assert_eq!(summary.single_line_events, 1);
        assert_eq!(summary.emitted_events(), 1);
    }

    #[test]
    fn test_multi_line_event_uses_first_receipt_time() {
        let normalizer = normalizer();
        let text = "\
Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140',
Jun 1 10:00:05 host siteboss: id: 'N1',
Jun 1 10:00:09 host siteboss: mt: 'ALM', sc: '4'
Jun 1 10:00:12 host siteboss: }";
        let (events, summary) = run(&normalizer, text);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].receipt_dt, "2024-06-01 10:00:00");
        assert_eq!(events[0].ne_id, "N1");
        assert_eq!(events[0].fields["sc"], "4");
        assert_eq!(summary.multi_line_events, 1);
        assert_eq!(summary.total_lines, 4);
    }

    #[test]
    fn test_state_transitions() {
        let normalizer = normalizer();
        let text = "\
Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140', id: 'N1',
Jun 1 10:00:01 host siteboss: mt: 'ALM' }";
        let mut assembler = EventAssembler::new(&normalizer);
        let mut lines = text.lines().enumerate().map(|(idx, text)| LogLine {
            number: idx + 1,
            text: text.to_string(),
        });

        assert!(assembler.process_line(&lines.next().unwrap()).is_none());
        assert!(matches!(
            assembler.state(),
            AssemblerState::Collecting { started_at: 1, .. }
        ));
        let event = assembler.process_line(&lines.next().unwrap()).unwrap();
        assert_eq!(event.mt, "ALM");
        assert_eq!(assembler.state(), &AssemblerState::Idle);
        assert_eq!(assembler.summary().orphan_multi_line_ends, 0);
    }

    #[test]
    fn test_invalid_line_does_not_disturb_collection() {
        let normalizer = normalizer();
        let text = "\
Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140', id: 'N1',
garbage without a month
Jun 1 10:00:01 host siteboss: mt: 'ALM' }";
        let (events, summary) = run(&normalizer, text);

        assert_eq!(events.len(), 1);
        assert_eq!(summary.invalid_records, 1);
        assert_eq!(summary.multi_line_events, 1);
    }

    #[test]
    fn test_brace_not_last_keeps_collecting() {
        let normalizer = normalizer();
        let text = "\
Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140', id: 'N1',
Jun 1 10:00:01 host siteboss: mt: 'ALM' } trailing
Jun 1 10:00:02 host siteboss: }";
        let (events, summary) = run(&normalizer, text);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].mt, "ALM");
        assert_eq!(summary.total_lines, 3);
    }

    #[test]
    fn test_truncated_multi_line_event() {
        let normalizer = normalizer();
        let text = "\
Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140', id: 'N1',
Jun 1 10:00:01 host siteboss: mt: 'ALM',";
        let (events, summary) = run(&normalizer, text);

        assert!(events.is_empty());
        assert_eq!(summary.truncated_multi_line_events, 1);
        assert_eq!(summary.multi_line_events, 0);
    }

    #[test]
    fn test_truncated_event_after_complete_event() {
        let normalizer = normalizer();
        let text = "\
Jun 1 10:00:00 host siteboss: Parsed Data: { ts: '1717231140', id: 'N1', mt: 'EVT' }
Jun 1 10:00:02 host siteboss: Parsed Data: { ts: '1717231141', id: 'N1',";
        let (events, summary) = run(&normalizer, text);

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].mt, "EVT");
        assert_eq!(summary.single_line_events, 1);
        assert_eq!(summary.truncated_multi_line_events, 1);

        let (events, summary) = run(
            &normalizer,
            "Jun 1 10:00:03 host siteboss: Parsed Data: { ts: '1717231142', id: 'N1', mt: 'ALM' }",
        );
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_ts, "1717231142");
        assert_eq!(summary.truncated_multi_line_events, 0);
    }

    #[test]
    fn test_record_counters() {
        let normalizer = normalizer();
        let text = "\
Jun 1 09:59:00 host kernel: eth0 link up
Jun 1 09:59:01 host siteboss: Parsed Data:
Jun 1 09:59:02 host siteboss: Parsed Data: mt: 'ALM' }
Jun 1 09:59:03 host siteboss: Parsed Data: } mt: 'ALM' {
Jun 1 09:59:04 host siteboss: Parsed Data: { id: 'N1', mt: 'ALM' }
Jun 1 09:59:05 host siteboss: Parsed Data: { ts id }
Foo 1 09:59:06 host siteboss: Parsed Data: { ts: '1', id: 'N1', mt: 'ALM' }
";
        let (events, summary) = run(&normalizer, text);

        assert!(events.is_empty());
        assert_eq!(
            summary,
            RunSummary {
                total_lines: 7,
                invalid_records: 1,
                non_event_records: 1,
                invalid_events: 3,
                single_line_events: 0,
                multi_line_events: 0,
                truncated_multi_line_events: 0,
                orphan_multi_line_ends: 1,
                other_errors: 1,
            }
        );
    }

    #[test]
    fn test_summary_display() {
        let summary = RunSummary {
            total_lines: 12,
            single_line_events: 3,
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.starts_with("Total lines processed    : 12\n"));
        assert!(text.contains("Single Line Events       : 3\n"));
        assert!(text.ends_with("Other Events Errors      : 0"));
    }

    #[test]
    fn test_summary_display_groups_thousands() {
        let summary = RunSummary {
            total_lines: 1_234_567,
            non_event_records: 1_000,
            multi_line_events: 999,
            other_errors: 12_345,
            ..Default::default()
        };
        let text = summary.to_string();
        assert!(text.starts_with("Total lines processed    : 1,234,567\n"));
        assert!(text.contains("Non-Event Records        : 1,000\n"));
        assert!(text.contains("Multi-Line Events        : 999\n"));
        assert!(text.ends_with("Other Events Errors      : 12,345"));
    }

    #[test]
    fn test_with_thousands() {
        assert_eq!(with_thousands(0), "0");
        assert_eq!(with_thousands(100), "100");
        assert_eq!(with_thousands(1_000), "1,000");
        assert_eq!(with_thousands(100_000), "100,000");
        assert_eq!(with_thousands(1_000_000), "1,000,000");
    }

    fn payload_tokens() -> impl Strategy<Value = Vec<String>> {
        let extra = prop::collection::btree_map(
            prop::sample::select(vec!["st", "si", "va", "sc", "sv", "ke", "cn", "na", "rn", "ss", "it"]),
            "[A-Za-z0-9]{1,8}",
            0..6,
        );
        (1_700_000_000i64..1_720_000_000, extra).prop_map(|(ts, extra)| {
            let mut fields = vec![
                format!("ts: '{}'", ts),
                "id: 'N1'".to_string(),
                "mt: 'ALM'".to_string(),
            ];
            fields.extend(extra.into_iter().map(|(k, v)| format!("{}: '{}'", k, v)));
            let body = fields.join(", ");
            let mut tokens = vec!["{".to_string()];
            tokens.extend(body.split_whitespace().map(str::to_string));
            tokens.push("}".to_string());
            tokens
        })
    }

    proptest! {
        #[test]
        fn test_multi_line_matches_single_line(
            tokens in payload_tokens(),
            cuts in prop::collection::vec(any::<prop::sample::Index>(), 1..5),
        ) {
            let normalizer = normalizer();
            let prefix = "Jun 1 10:00:00 host siteboss: Parsed Data:";
            let single = format!("{} {}", prefix, tokens.join(" "));

            // Cut points fall after the opening brace and before the closing one.
            let mut points: Vec<usize> = cuts.iter().map(|idx| 1 + idx.index(tokens.len() - 1)).collect();
            points.sort_unstable();
            points.dedup();

            let mut lines = Vec::new();
            let mut start = 0;
            for (n, point) in points.iter().chain(std::iter::once(&tokens.len())).enumerate() {
                let piece = tokens[start..*point].join(" ");
                if n == 0 {
                    lines.push(format!("{} {}", prefix, piece));
                } else {
                    lines.push(format!("Jun 1 10:00:{:02} host siteboss: {}", n, piece));
                }
                start = *point;
            }
            let multi = lines.join("\n");

            let (single_events, _) = run(&normalizer, &single);
            let (multi_events, summary) = run(&normalizer, &multi);

            prop_assert_eq!(single_events.len(), 1);
            prop_assert_eq!(summary.multi_line_events, 1);
            prop_assert_eq!(&single_events, &multi_events);
        }
    }
}
