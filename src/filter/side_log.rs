//! CSV log of invalid names and malformed records.

use anyhow::{Context, Result};
use csv::Writer;
use std::fs::File;
use std::path::Path;
use tracing::warn;

use addrsync::sink::{ErrorSink, LogSink, SideEvent};

pub struct CsvSink {
    writer: Writer<File>,
    failed: bool,
}

impl CsvSink {
    pub fn create(path: &Path) -> Result<Self> {
        let mut writer = Writer::from_path(path)
            .with_context(|| format!("Failed to create side log {}", path.display()))?;
        writer.write_record(["kind", "source", "name", "message"])?;
        Ok(Self {
            writer,
            failed: false,
        })
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush().context("Failed to flush side log")
    }
}

impl ErrorSink for CsvSink {
    fn report(&mut self, event: SideEvent) {
        let row = match &event {
            SideEvent::InvalidName {
                name,
                source,
                message,
            } => ["invalid_name".to_string(), source.clone(), name.clone(), message.clone()],
            SideEvent::MalformedRecord { id, reason } => [
                "malformed_record".to_string(),
                format!("node/{}", id),
                String::new(),
                reason.clone(),
            ],
        };
        if let Err(e) = self.writer.write_record(&row) {
            // warn once
            if !self.failed {
                warn!("Failed to write side log: {}", e);
                self.failed = true;
            }
        }
        LogSink.report(event);
    }
}
