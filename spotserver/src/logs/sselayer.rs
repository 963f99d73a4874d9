use std::fmt::{self, Write as _};
use std::time::SystemTime;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::{LogEntry, LogState};

/// Layer tracing qui alimente le [`LogState`]
///
/// Each event becomes a [`LogEntry`]. The `message` field comes first,
/// other fields are appended as `key=value`.
pub struct SseLayer {
    state: LogState,
}

impl SseLayer {
    pub fn new(state: LogState) -> Self {
        Self { state }
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

impl<S: Subscriber> Layer<S> for SseLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let mut message = visitor.message;
        message.push_str(&visitor.fields);

        self.state.push(LogEntry {
            timestamp: SystemTime::now(),
            level: metadata.level().as_str().to_string(),
            target: metadata.target().to_string(),
            message: message.trim_start().to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;
    use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, reload, Registry};

    #[test]
    fn test_events_are_captured() {
        let (_layer, handle) = reload::Layer::<LevelFilter, Registry>::new(LevelFilter::TRACE);
        let state = LogState::new(16, Level::TRACE, handle);
        let subscriber = Registry::default().with(SseLayer::new(state.clone()));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(clients = 3, "broadcast done");
            tracing::info!("plain");
        });

        let dump = state.dump();
        assert_eq!(dump.len(), 2);
        assert_eq!(dump[0].level, "WARN");
        assert_eq!(dump[0].message, "broadcast done clients=3");
        assert_eq!(dump[1].message, "plain");
        assert!(dump[1].target.contains("sselayer"));
    }
}
