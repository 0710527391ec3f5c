use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;

use tracing::Level;

/// Receives every state transition and I/O failure of a channel manager.
///
/// `context` names the event; `fields` carries the counters that go with
/// it (handle identity, attempt count, byte counts, errors).
pub trait Diagnostics {
    fn record(&self, level: Level, context: &str, fields: &[(&'static str, String)]);
}

impl<D: Diagnostics + ?Sized> Diagnostics for &D {
    fn record(&self, level: Level, context: &str, fields: &[(&'static str, String)]) {
        (**self).record(level, context, fields);
    }
}

impl<D: Diagnostics + ?Sized> Diagnostics for Box<D> {
    fn record(&self, level: Level, context: &str, fields: &[(&'static str, String)]) {
        (**self).record(level, context, fields);
    }
}

/// Forwards records to `tracing`. Timestamps come from the subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

struct FieldList<'a>(&'a [(&'static str, String)]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

impl Diagnostics for TracingDiagnostics {
    fn record(&self, level: Level, context: &str, fields: &[(&'static str, String)]) {
        let fields = FieldList(fields);
        if level == Level::ERROR {
            tracing::error!(target: "tickpipe::channel", %fields, "{context}");
        } else if level == Level::WARN {
            tracing::warn!(target: "tickpipe::channel", %fields, "{context}");
        } else if level == Level::INFO {
            tracing::info!(target: "tickpipe::channel", %fields, "{context}");
        } else if level == Level::DEBUG {
            tracing::debug!(target: "tickpipe::channel", %fields, "{context}");
        } else {
            tracing::trace!(target: "tickpipe::channel", %fields, "{context}");
        }
    }
}

/// One captured diagnostics event.
#[derive(Debug, Clone)]
pub struct DiagnosticRecord {
    pub timestamp: SystemTime,
    pub level: Level,
    pub context: String,
    pub fields: Vec<(&'static str, String)>,
}

impl DiagnosticRecord {
    /// Value of a named field, if present.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Captures records in memory. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryDiagnostics {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl MemoryDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Records whose context equals `context`.
    pub fn with_context(&self, context: &str) -> Vec<DiagnosticRecord> {
        self.records()
            .into_iter()
            .filter(|record| record.context == context)
            .collect()
    }

    /// Number of records whose context equals `context`.
    pub fn count(&self, context: &str) -> usize {
        self.with_context(context).len()
    }

    pub fn clear(&self) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl Diagnostics for MemoryDiagnostics {
    fn record(&self, level: Level, context: &str, fields: &[(&'static str, String)]) {
        let record = DiagnosticRecord {
            timestamp: SystemTime::now(),
            level,
            context: context.to_string(),
            fields: fields.to_vec(),
        };
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record);
    }
}
