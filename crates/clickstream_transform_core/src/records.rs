use serde_json::Value;

use crate::clock::{format_processed_ts, Clock};
use crate::contract::{REMOVED_FIELD, TIMESTAMP_FIELD};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineOutcome {
    Transformed(String),
    Blank,
    Malformed,
    NotAnObject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransformSummary {
    pub records_kept: usize,
    pub blank_lines: usize,
    pub malformed_lines: usize,
    pub non_object_lines: usize,
}

impl TransformSummary {
    pub fn lines_dropped(&self) -> usize {
        self.malformed_lines + self.non_object_lines
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransformedDocument {
    pub lines: Vec<String>,
    pub summary: TransformSummary,
}

impl TransformedDocument {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// Strips `user_id` and stamps `processed_ts` on one NDJSON line.
///
/// Parse failures are reported as an outcome, never as an error: a corrupt
/// line must not fail the rest of the object.
pub fn transform_line(line: &str, clock: &impl Clock) -> LineOutcome {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return LineOutcome::Blank;
    }

    let Ok(value) = serde_json::from_str::<Value>(trimmed) else {
        return LineOutcome::Malformed;
    };
    let Value::Object(mut record) = value else {
        return LineOutcome::NotAnObject;
    };

    record.shift_remove(REMOVED_FIELD);
    record.insert(
        TIMESTAMP_FIELD.to_string(),
        Value::String(format_processed_ts(clock.now())),
    );

    match serde_json::to_string(&record) {
        Ok(serialized) => LineOutcome::Transformed(serialized),
        // A map of already-parsed JSON values always serializes.
        Err(_) => LineOutcome::Malformed,
    }
}

/// Splits on `\n`, `\r\n` and a lone `\r`. A terminator at the very end does
/// not start another line.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;

    while !rest.is_empty() {
        let Some(at) = rest.find(|c: char| c == '\n' || c == '\r') else {
            lines.push(rest);
            break;
        };
        lines.push(&rest[..at]);
        let terminator = if rest[at..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[at + terminator..];
    }

    lines
}

pub fn transform_document(text: &str, clock: &impl Clock) -> TransformedDocument {
    let mut document = TransformedDocument::default();

    for line in split_lines(text) {
        match transform_line(line, clock) {
            LineOutcome::Transformed(serialized) => {
                document.lines.push(serialized);
                document.summary.records_kept += 1;
            }
            LineOutcome::Blank => document.summary.blank_lines += 1,
            LineOutcome::Malformed => document.summary.malformed_lines += 1,
            LineOutcome::NotAnObject => document.summary.non_object_lines += 1,
        }
    }

    document
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::{json, Map};

    use super::*;
    use crate::clock::{FixedClock, SteppingClock};

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 11, 26, 8, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn parse(line: &str) -> Map<String, Value> {
        match serde_json::from_str::<Value>(line).expect("output should be json") {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn removes_user_id_and_adds_timestamp() {
        let outcome = transform_line(r#"{"user_id":"u1","x":1}"#, &FixedClock(start()));
        let LineOutcome::Transformed(line) = outcome else {
            panic!("line should transform");
        };

        let record = parse(&line);
        assert!(!record.contains_key("user_id"));
        assert_eq!(record.get("x"), Some(&json!(1)));
        assert_eq!(
            record.get("processed_ts"),
            Some(&json!("2025-11-26T08:00:00+00:00"))
        );
    }

    #[test]
    fn output_is_compact_and_keeps_key_order() {
        let outcome = transform_line(
            r#" {"page": "/home", "user_id": "u1", "ts": 3} "#,
            &FixedClock(start()),
        );
        assert_eq!(
            outcome,
            LineOutcome::Transformed(
                r#"{"page":"/home","ts":3,"processed_ts":"2025-11-26T08:00:00+00:00"}"#
                    .to_string()
            )
        );
    }

    #[test]
    fn numbers_pass_through_unchanged() {
        let outcome = transform_line(
            r#"{"id":123456789012345678901234567890,"user_id":"u1","big":18446744073709551616,"neg":-9223372036854775809,"price":0.1,"ratio":1.0,"tiny":5e-324}"#,
            &FixedClock(start()),
        );
        assert_eq!(
            outcome,
            LineOutcome::Transformed(
                r#"{"id":123456789012345678901234567890,"big":18446744073709551616,"neg":-9223372036854775809,"price":0.1,"ratio":1.0,"tiny":5e-324,"processed_ts":"2025-11-26T08:00:00+00:00"}"#
                    .to_string()
            )
        );
    }

    #[test]
    fn missing_user_id_is_not_an_error() {
        let outcome = transform_line(r#"{"a":1}"#, &FixedClock(start()));
        assert!(matches!(outcome, LineOutcome::Transformed(_)));
    }

    #[test]
    fn overwrites_existing_processed_ts() {
        let LineOutcome::Transformed(line) = transform_line(
            r#"{"processed_ts":"stale","a":1}"#,
            &FixedClock(start()),
        ) else {
            panic!("line should transform");
        };
        assert_eq!(
            line,
            r#"{"processed_ts":"2025-11-26T08:00:00+00:00","a":1}"#
        );
    }

    #[test]
    fn classifies_lines_that_produce_no_record() {
        let clock = FixedClock(start());
        assert_eq!(transform_line("", &clock), LineOutcome::Blank);
        assert_eq!(transform_line("  \t ", &clock), LineOutcome::Blank);
        assert_eq!(transform_line("not json", &clock), LineOutcome::Malformed);
        assert_eq!(transform_line(r#"{"a":"#, &clock), LineOutcome::Malformed);
        assert_eq!(transform_line("[1,2]", &clock), LineOutcome::NotAnObject);
        assert_eq!(transform_line("42", &clock), LineOutcome::NotAnObject);
    }

    #[test]
    fn malformed_lines_are_dropped_and_order_is_kept() {
        let clock = FixedClock(start());
        let document = transform_document(
            "{\"n\":1}\nnot json\n\n{\"n\":2}\r\n[3]\n{\"n\":3}",
            &clock,
        );

        let order: Vec<Value> = document
            .lines
            .iter()
            .map(|line| parse(line)["n"].clone())
            .collect();
        assert_eq!(order, vec![json!(1), json!(2), json!(3)]);
        assert_eq!(
            document.summary,
            TransformSummary {
                records_kept: 3,
                blank_lines: 1,
                malformed_lines: 1,
                non_object_lines: 1,
            }
        );
        assert_eq!(document.summary.lines_dropped(), 2);
    }

    #[test]
    fn splits_on_every_line_terminator() {
        assert_eq!(split_lines("a\nb\r\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), vec!["a"]);
        assert_eq!(split_lines("a\r\n\r\n"), vec!["a", ""]);
        assert_eq!(split_lines("\r\r"), vec!["", ""]);
        assert!(split_lines("").is_empty());
    }

    #[test]
    fn carriage_return_separated_records_are_kept() {
        let document = transform_document("{\"a\":1}\r{\"b\":2}\r", &FixedClock(start()));

        assert_eq!(
            document.lines,
            vec![
                r#"{"a":1,"processed_ts":"2025-11-26T08:00:00+00:00"}"#.to_string(),
                r#"{"b":2,"processed_ts":"2025-11-26T08:00:00+00:00"}"#.to_string(),
            ]
        );
        assert_eq!(
            document.summary,
            TransformSummary {
                records_kept: 2,
                ..TransformSummary::default()
            }
        );
    }

    #[test]
    fn each_record_reads_the_clock() {
        let clock = SteppingClock::new(start(), Duration::milliseconds(5));
        let document = transform_document(
            "{\"user_id\":\"u1\",\"x\":1}\n{\"user_id\":\"u2\",\"x\":2}\n",
            &clock,
        );

        assert_eq!(clock.readings(), 2);
        let stamps: Vec<Value> = document
            .lines
            .iter()
            .map(|line| parse(line)["processed_ts"].clone())
            .collect();
        assert_eq!(
            stamps,
            vec![
                json!("2025-11-26T08:00:00+00:00"),
                json!("2025-11-26T08:00:00.005000+00:00"),
            ]
        );
    }

    #[test]
    fn blank_or_malformed_document_is_empty() {
        let clock = FixedClock(start());
        assert!(transform_document("", &clock).is_empty());
        assert!(transform_document("\n \n\n", &clock).is_empty());
        assert!(transform_document("nope\n{bad}\n", &clock).is_empty());
    }
}
