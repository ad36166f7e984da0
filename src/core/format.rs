//! Line formats of the delimited log files.
//!
//! ```text
//! <label>.csv            timestamp, userId, recordId[, value]*
//! sensorInformation.csv  kind, userId, recordId, sessionStart, sessionEnd, flushTimestamp, wallClockTimeAtFlush
//! evalAnswers.csv        timestamp, userId, recordId, watchingTv, moodRating, fatigueRating
//! ```
//!
//! Fields are separated by a comma and a space. Every line ends with a newline
//! (added by the sink).

use crate::core::record::SensorRecord;
use crate::provider::SensorKind;
use std::fmt;
use std::str::FromStr;

/// Field separator used by every log.
pub const SEPARATOR: &str = ", ";

/// Name of the shared session metadata log.
pub const SESSION_LOG: &str = "sensorInformation";

/// Name of the survey answers log.
pub const SURVEY_LOG: &str = "evalAnswers";

/// Format a value so it always carries a decimal point (`10.0`, `12.5`).
///
/// Magnitudes below `1e-3` or from `1e7` up use scientific notation with an
/// upper-case exponent (`1.0E7`, `2.5E-4`), matching the logs written by the
/// phone app. Shortest round-trip digits either way.
pub fn format_value(value: f32) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let magnitude = value.abs();
    if magnitude == 0.0 || (1e-3..1e7).contains(&magnitude) {
        return format!("{value:?}");
    }

    let sci = format!("{value:e}");
    match sci.split_once('e') {
        Some((mantissa, exponent)) if mantissa.contains('.') => format!("{mantissa}E{exponent}"),
        Some((mantissa, exponent)) => format!("{mantissa}.0E{exponent}"),
        None => sci,
    }
}

/// Encode one buffered record as a line of its channel log.
pub fn encode_reading(record: &SensorRecord, user_id: u32, record_id: u32) -> String {
    let mut line = format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}",
        record.timestamp, user_id, record_id
    );
    for value in &record.values {
        line.push_str(SEPARATOR);
        line.push_str(&format_value(*value));
    }
    line
}

/// A row of a channel log.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRow {
    pub timestamp: i64,
    pub user_id: u32,
    pub record_id: u32,
    pub values: Vec<f32>,
}

/// A row of the session metadata log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLine {
    pub kind: SensorKind,
    pub user_id: u32,
    pub record_id: u32,
    pub session_start: i64,
    /// `0` when the channel was flushed without being stopped
    pub session_end: i64,
    pub flush_timestamp: i64,
    pub wall_clock_millis: i64,
}

impl SessionLine {
    pub fn encode(&self) -> String {
        [
            self.kind.to_string(),
            self.user_id.to_string(),
            self.record_id.to_string(),
            self.session_start.to_string(),
            self.session_end.to_string(),
            self.flush_timestamp.to_string(),
            self.wall_clock_millis.to_string(),
        ]
        .join(SEPARATOR)
    }

    /// Listening time of the session in seconds, if the session was stopped.
    pub fn duration_secs(&self) -> Option<f64> {
        if self.session_end == 0 {
            return None;
        }
        Some((self.session_end - self.session_start) as f64 / 1e9)
    }
}

/// Error parsing a log line.
#[derive(Debug, Clone, PartialEq)]
pub struct FormatError {
    pub line: String,
    pub reason: String,
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Malformed log line {:?}: {}", self.line, self.reason)
    }
}

impl std::error::Error for FormatError {}

fn split(line: &str) -> Vec<&str> {
    line.trim_end_matches(['\r', '\n'])
        .split(',')
        .map(str::trim)
        .collect()
}

fn field<T: FromStr>(line: &str, fields: &[&str], index: usize, name: &str) -> Result<T, FormatError> {
    let raw = fields.get(index).ok_or_else(|| FormatError {
        line: line.to_string(),
        reason: format!("missing {name}"),
    })?;
    raw.parse().map_err(|_| FormatError {
        line: line.to_string(),
        reason: format!("invalid {name} {raw:?}"),
    })
}

/// Parse a line of a channel log.
pub fn parse_reading_line(line: &str) -> Result<ReadingRow, FormatError> {
    let fields = split(line);
    let timestamp = field(line, &fields, 0, "timestamp")?;
    let user_id = field(line, &fields, 1, "userId")?;
    let record_id = field(line, &fields, 2, "recordId")?;
    let values = (3..fields.len())
        .map(|i| field(line, &fields, i, "value"))
        .collect::<Result<Vec<f32>, _>>()?;

    Ok(ReadingRow {
        timestamp,
        user_id,
        record_id,
        values,
    })
}

/// Parse a line of the session metadata log.
pub fn parse_session_line(line: &str) -> Result<SessionLine, FormatError> {
    let fields = split(line);
    if fields.len() != 7 {
        return Err(FormatError {
            line: line.to_string(),
            reason: format!("expected 7 fields, found {}", fields.len()),
        });
    }

    Ok(SessionLine {
        kind: SensorKind(field(line, &fields, 0, "kind")?),
        user_id: field(line, &fields, 1, "userId")?,
        record_id: field(line, &fields, 2, "recordId")?,
        session_start: field(line, &fields, 3, "sessionStart")?,
        session_end: field(line, &fields, 4, "sessionEnd")?,
        flush_timestamp: field(line, &fields, 5, "flushTimestamp")?,
        wall_clock_millis: field(line, &fields, 6, "wallClockTimeAtFlush")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_continuous_record() {
        let record = SensorRecord::new(1_000, vec![10.0, 12.5]);
        assert_eq!(encode_reading(&record, 3, 7), "1000, 3, 7, 10.0, 12.5");
    }

    #[test]
    fn test_format_value_notation() {
        assert_eq!(format_value(0.0), "0.0");
        assert_eq!(format_value(-0.5), "-0.5");
        assert_eq!(format_value(0.001), "0.001");
        assert_eq!(format_value(9_999_999.0), "9999999.0");
        assert_eq!(format_value(1e7), "1.0E7");
        assert_eq!(format_value(12_345_678.0), "1.2345678E7");
        assert_eq!(format_value(-2.5e-4), "-2.5E-4");
        assert_eq!(format_value(f32::INFINITY), "Infinity");
        assert_eq!(format_value(f32::NAN), "NaN");

        let row = parse_reading_line("1, 2, 3, 1.2345678E7, -2.5E-4").unwrap();
        assert_eq!(row.values, vec![12_345_678.0, -2.5e-4]);
    }

    #[test]
    fn test_encode_trigger_record_has_no_values() {
        let record = SensorRecord::trigger(55);
        assert_eq!(encode_reading(&record, 3, 7), "55, 3, 7");
    }

    #[test]
    fn test_session_line_round_trip() {
        let line = SessionLine {
            kind: SensorKind::SIGNIFICANT_MOTION,
            user_id: 3,
            record_id: 7,
            session_start: 100,
            session_end: 2_000_000_100,
            flush_timestamp: 2_000_000_200,
            wall_clock_millis: 1_700_000_000_000,
        };
        let encoded = line.encode();
        assert_eq!(
            encoded,
            "17, 3, 7, 100, 2000000100, 2000000200, 1700000000000"
        );
        assert_eq!(parse_session_line(&encoded).unwrap(), line);
        assert_eq!(line.duration_secs(), Some(2.0));
    }

    #[test]
    fn test_parse_reading_line_with_newline() {
        let row = parse_reading_line("42, 1, 2, 0.5, -3.25\n").unwrap();
        assert_eq!(row.timestamp, 42);
        assert_eq!(row.user_id, 1);
        assert_eq!(row.record_id, 2);
        assert_eq!(row.values, vec![0.5, -3.25]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_reading_line("abc, 1, 2").unwrap_err();
        assert!(err.reason.contains("timestamp"));

        let err = parse_session_line("17, 3, 7").unwrap_err();
        assert!(err.reason.contains("expected 7 fields"));
    }

    #[test]
    fn test_format_value_keeps_decimal_point() {
        assert_eq!(format_value(9.0), "9.0");
        assert_eq!(format_value(-0.25), "-0.25");
    }
}
