use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a message seen on the process-wide diagnostic channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Log,
    Warning,
    Assert,
    Error,
    Exception,
}

impl Severity {
    /// Purely informational messages are never recorded.
    pub fn is_informational(self) -> bool {
        matches!(self, Severity::Log)
    }

    /// Error-class messages carry their trace into the log entry.
    pub fn carries_trace(self) -> bool {
        matches!(self, Severity::Error | Severity::Exception)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Log => "Log",
            Severity::Warning => "Warning",
            Severity::Assert => "Assert",
            Severity::Error => "Error",
            Severity::Exception => "Exception",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub trace: String,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, trace: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            trace: trace.into(),
        }
    }
}
