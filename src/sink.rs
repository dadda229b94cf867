//! Side channel for recoverable per-record problems.
//!
//! Invalid names and malformed records never abort a run; they are handed to
//! an [`ErrorSink`] supplied by the caller, which may log them, collect them
//! or write them to a file.

use serde::Serialize;
use tracing::warn;

use crate::error::NormalizationError;

/// A recoverable problem found while building the index or classifying.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SideEvent {
    /// A name could not be normalized; the raw name was used instead.
    InvalidName {
        name: String,
        /// Where the name came from, e.g. "way/42 alt_name"
        source: String,
        message: String,
    },
    /// A record lacked a required tag and was passed through unchecked.
    MalformedRecord { id: i64, reason: String },
}

impl SideEvent {
    pub fn invalid_name(source: impl Into<String>, error: &NormalizationError) -> Self {
        let NormalizationError::InvalidCharacter { name, .. } = error;
        SideEvent::InvalidName {
            name: name.clone(),
            source: source.into(),
            message: error.to_string(),
        }
    }
}

/// Receiver for [`SideEvent`]s.
pub trait ErrorSink {
    fn report(&mut self, event: SideEvent);
}

/// Logs every event as a warning.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl ErrorSink for LogSink {
    fn report(&mut self, event: SideEvent) {
        match event {
            SideEvent::InvalidName {
                name,
                source,
                message,
            } => warn!("Invalid name {:?} ({}): {}", name, source, message),
            SideEvent::MalformedRecord { id, reason } => {
                warn!("Skipping malformed record {}: {}", id, reason)
            }
        }
    }
}

impl ErrorSink for Vec<SideEvent> {
    fn report(&mut self, event: SideEvent) {
        self.push(event);
    }
}

/// Forwards events to another sink and counts them by kind.
pub struct CountingSink<'a> {
    inner: &'a mut dyn ErrorSink,
    pub invalid_names: usize,
    pub malformed_records: usize,
}

impl<'a> CountingSink<'a> {
    pub fn new(inner: &'a mut dyn ErrorSink) -> Self {
        Self {
            inner,
            invalid_names: 0,
            malformed_records: 0,
        }
    }
}

impl ErrorSink for CountingSink<'_> {
    fn report(&mut self, event: SideEvent) {
        match event {
            SideEvent::InvalidName { .. } => self.invalid_names += 1,
            SideEvent::MalformedRecord { .. } => self.malformed_records += 1,
        }
        self.inner.report(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting_sink_forwards() {
        let mut events: Vec<SideEvent> = Vec::new();
        let mut counting = CountingSink::new(&mut events);
        counting.report(SideEvent::MalformedRecord {
            id: -1,
            reason: "missing addr:housenumber".into(),
        });
        counting.report(SideEvent::invalid_name(
            "node/1",
            &NormalizationError::InvalidCharacter {
                name: "A№".into(),
                character: '№',
            },
        ));
        assert_eq!(counting.invalid_names, 1);
        assert_eq!(counting.malformed_records, 1);
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_event_serializes_with_kind() {
        let event = SideEvent::MalformedRecord {
            id: -3,
            reason: "missing addr:street".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "malformed_record");
        assert_eq!(json["id"], -3);
    }
}
