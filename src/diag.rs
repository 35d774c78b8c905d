//! Opaque diagnostic binding for correlating one download's events.

use std::fmt;
use std::sync::Arc;

/// Caller-supplied correlation handle attached to every tracing event the
/// writer emits for a download. The writer never interprets it.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticHandle(Arc<String>);

impl DiagnosticHandle {
    pub fn new(id: impl Into<String>) -> DiagnosticHandle {
        DiagnosticHandle(Arc::new(id.into()))
    }
}

impl fmt::Display for DiagnosticHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            write!(f, "-")
        } else {
            write!(f, "{}", self.0)
        }
    }
}
