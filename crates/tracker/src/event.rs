use crate::error::{Result, TrackerError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Read,
    Write,
}

/// Caller-supplied attribution for an observed I/O call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub function_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_snippet: Option<String>,
}

impl CallContext {
    pub fn new(function_name: impl Into<String>) -> Self {
        Self {
            function_name: function_name.into(),
            code_snippet: None,
        }
    }
}

/// One read or write observed by the instrumentation layer.
///
/// Serialized as one JSON object per line in event logs:
/// `{"path":"raw.csv","direction":"read"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IoEvent {
    pub path: PathBuf,
    pub direction: Direction,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<CallContext>,
}

impl IoEvent {
    pub fn new(path: impl Into<PathBuf>, direction: Direction) -> Self {
        Self {
            path: path.into(),
            direction,
            timestamp: None,
            context: None,
        }
    }

    pub fn read(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Direction::Read)
    }

    pub fn write(path: impl Into<PathBuf>) -> Self {
        Self::new(path, Direction::Write)
    }

    #[must_use]
    pub fn with_function(mut self, function_name: impl Into<String>) -> Self {
        let snippet = self.context.take().and_then(|ctx| ctx.code_snippet);
        self.context = Some(CallContext {
            function_name: function_name.into(),
            code_snippet: snippet,
        });
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: CallContext) -> Self {
        self.context = Some(context);
        self
    }

    #[must_use]
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Decode a JSON-lines event log. Blank lines and `#` comments are skipped.
pub fn parse_event_log<R: BufRead>(reader: R) -> Result<Vec<IoEvent>> {
    let mut events = Vec::new();
    for (idx, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let event = serde_json::from_str::<IoEvent>(trimmed).map_err(|source| {
            TrackerError::EventLog {
                line: idx + 1,
                source,
            }
        })?;
        events.push(event);
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_event_log_lines() {
        let log = r#"
# pipeline events
{"path":"raw.csv","direction":"read"}

{"path":"clean.csv","direction":"write","context":{"function_name":"clean","code_snippet":"df.dropna()"}}
"#;
        let events = parse_event_log(log.as_bytes()).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], IoEvent::read("raw.csv"));
        assert_eq!(events[1].direction, Direction::Write);
        let ctx = events[1].context.as_ref().unwrap();
        assert_eq!(ctx.function_name, "clean");
        assert_eq!(ctx.code_snippet.as_deref(), Some("df.dropna()"));
    }

    #[test]
    fn bad_line_reports_its_number() {
        let log = "{\"path\":\"a\",\"direction\":\"read\"}\n{\"path\":\"b\",\"direction\":\"append\"}\n";
        match parse_event_log(log.as_bytes()) {
            Err(TrackerError::EventLog { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected event log error, got {other:?}"),
        }
    }

    #[test]
    fn with_function_keeps_existing_snippet() {
        let event = IoEvent::write("out.csv")
            .with_context(CallContext {
                function_name: "old".to_string(),
                code_snippet: Some("x.to_csv()".to_string()),
            })
            .with_function("save");
        let ctx = event.context.unwrap();
        assert_eq!(ctx.function_name, "save");
        assert_eq!(ctx.code_snippet.as_deref(), Some("x.to_csv()"));
    }
}
