//! Forwarding of process-wide diagnostics (tracing warnings/errors, panics)
//! into the session log.

use std::{backtrace::Backtrace, fmt};

use sessionlog_types::diagnostics::{Diagnostic, Severity};
use tokio::sync::mpsc;
use tracing::{
    field::{Field, Visit},
    Event, Level, Metadata, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

pub type DiagnosticSender = mpsc::UnboundedSender<Diagnostic>;

pub fn diagnostic_channel() -> (DiagnosticSender, mpsc::UnboundedReceiver<Diagnostic>) {
    mpsc::unbounded_channel()
}

/// Tracing layer that forwards every warning and error as a [`Diagnostic`].
/// Sending never blocks, so events emitted while the session is locked are
/// safe.
#[derive(Clone)]
pub struct DiagnosticLayer {
    tx: DiagnosticSender,
}

impl DiagnosticLayer {
    pub fn new(tx: DiagnosticSender) -> Self {
        Self { tx }
    }
}

fn severity_for(level: &Level) -> Severity {
    if *level == Level::ERROR {
        Severity::Error
    } else if *level == Level::WARN {
        Severity::Warning
    } else {
        Severity::Log
    }
}

fn location(meta: &Metadata<'_>) -> String {
    match (meta.file(), meta.line()) {
        (Some(file), Some(line)) => format!("{} ({}:{})", meta.target(), file, line),
        _ => meta.target().to_owned(),
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{} {}", self.message, self.fields.join(" "))
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_owned();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}

impl<S: Subscriber> Layer<S> for DiagnosticLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let severity = severity_for(meta.level());
        if severity.is_informational() {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let trace = if severity.carries_trace() {
            location(meta)
        } else {
            String::new()
        };
        let _ = self
            .tx
            .send(Diagnostic::new(severity, visitor.finish(), trace));
    }
}

/// Chains a panic hook that forwards the panic as an `Exception` diagnostic
/// before running the previously installed hook.
pub fn install_panic_capture(sender: DiagnosticSender) {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let payload = info
            .payload()
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| info.payload().downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "panic".to_owned());
        let message = match info.location() {
            Some(loc) => format!("{payload} at {}:{}", loc.file(), loc.line()),
            None => payload,
        };
        let trace = Backtrace::force_capture().to_string();
        let _ = sender.send(Diagnostic::new(Severity::Exception, message, trace));
        previous(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt;

    #[test]
    fn forwards_only_warnings_and_errors() {
        let (tx, mut rx) = diagnostic_channel();
        let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(tx));

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("just info");
            tracing::warn!("disk almost full");
            tracing::error!(code = 7, "upload failed");
            tracing::debug!("noise");
        });

        let warning = rx.try_recv().expect("warning forwarded");
        assert_eq!(warning.severity, Severity::Warning);
        assert_eq!(warning.message, "disk almost full");
        assert!(warning.trace.is_empty());

        let error = rx.try_recv().expect("error forwarded");
        assert_eq!(error.severity, Severity::Error);
        assert_eq!(error.message, "upload failed code=7");
        assert!(error.trace.contains("capture.rs"));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn closed_channel_is_ignored() {
        let (tx, rx) = diagnostic_channel();
        drop(rx);
        let subscriber = tracing_subscriber::registry().with(DiagnosticLayer::new(tx));
        tracing::subscriber::with_default(subscriber, || {
            tracing::error!("nobody listening");
        });
    }
}
