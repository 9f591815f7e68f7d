use tracing::{Event, Level, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, EnvFilter, Layer, Registry};

pub const DEFAULT_FILTER: &str = "warn,prize_wheel_backend=info,shared=info";

/// Targets whose debug output is worth a line: the spin driver and the engine.
const SPIN_TARGETS: [&str; 2] = ["prize_wheel_backend::games", "shared::animator"];

fn is_own_target(target: &str) -> bool {
    target.starts_with("prize_wheel_backend") || target.starts_with("shared")
}

#[derive(Default)]
struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }
}

/// Text after the timestamp, or `None` when the event is not printed.
/// Dependencies only get through at WARN and above.
fn render_line(level: &Level, target: &str, message: &str) -> Option<String> {
    if message.is_empty() {
        return None;
    }
    let line = if *level == Level::ERROR {
        format!("❌ Error: {} - {}", target, message)
    } else if *level == Level::WARN {
        format!("⚠️ Warning: {} - {}", target, message)
    } else if *level == Level::INFO && is_own_target(target) {
        format!("ℹ️ {} - {}", target, message)
    } else if *level == Level::DEBUG && SPIN_TARGETS.iter().any(|t| target.starts_with(t)) {
        format!("🔄 {} - {}", target, message)
    } else {
        return None;
    };
    Some(line)
}

struct WheelLogLayer;

impl<S: Subscriber> Layer<S> for WheelLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        if let Some(line) = render_line(metadata.level(), metadata.target(), &visitor.0) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            println!("[{}] {}", timestamp, line);
        }
    }
}

pub fn setup() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    Registry::default()
        .with(env_filter)
        .with(WheelLogLayer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_lines_only_for_spin_targets() {
        let line = render_line(&Level::DEBUG, "prize_wheel_backend::games::backend_wheel_game", "tick");
        assert_eq!(line.as_deref(), Some("🔄 prize_wheel_backend::games::backend_wheel_game - tick"));
        assert!(render_line(&Level::DEBUG, "shared::animator", "settled").is_some());
        assert!(render_line(&Level::DEBUG, "prize_wheel_backend::storage", "persisted").is_none());
    }

    #[test]
    fn test_dependency_info_is_dropped() {
        assert!(render_line(&Level::INFO, "hyper::proto", "connection").is_none());
        assert!(render_line(&Level::INFO, "prize_wheel_backend", "listening").is_some());
        assert!(render_line(&Level::WARN, "tungstenite::protocol", "closed").is_some());
        assert!(render_line(&Level::ERROR, "shared::selector", "").is_none());
    }
}
