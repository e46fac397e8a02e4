use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::prelude::*;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::Context, EnvFilter, Layer, Registry};

const DEFAULT_FILTER: &str = "warn,backend=info,shared=info,tower_http=warn";
const GAME_TARGET: &str = "shared::shared_wheel_game";

/// Collects the message and the chat an event is about.
#[derive(Default)]
struct WheelVisitor {
    message: String,
    chat_id: Option<i64>,
}

impl Visit for WheelVisitor {
    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "chat_id" {
            self.chat_id = Some(value);
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message.push_str(&format!("{:?}", value));
        }
    }
}

/// The line printed for an event, `None` for events that stay silent.
fn format_line(level: &Level, target: &str, chat_id: Option<i64>, message: &str) -> Option<String> {
    if message.is_empty() {
        return None;
    }
    let origin = match chat_id {
        Some(chat_id) => format!("{} [chat {}]", target, chat_id),
        None => target.to_string(),
    };
    let line = match *level {
        Level::ERROR => format!("❌ Error: {} - {}", origin, message),
        Level::WARN => format!("⚠️ Warning: {} - {}", origin, message),
        Level::INFO if target.starts_with(GAME_TARGET) => format!("🎡 {} - {}", origin, message),
        Level::INFO => format!("ℹ️ {} - {}", origin, message),
        Level::DEBUG => format!("🔄 {} - {}", origin, message),
        _ => return None,
    };
    Some(line)
}

struct WheelLayer;

impl<S: Subscriber> Layer<S> for WheelLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().starts_with("hyper") || metadata.target().starts_with("reqwest") {
            return;
        }

        let mut visitor = WheelVisitor::default();
        event.record(&mut visitor);
        if let Some(line) = format_line(metadata.level(), metadata.target(), visitor.chat_id, &visitor.message) {
            let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            println!("[{}] {}", timestamp, line);
        }
    }
}

/// Installs the global subscriber. Records of the `log` facade, which the
/// game core uses, are forwarded to it.
pub fn setup() -> Result<(), TryInitError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    Registry::default()
        .with(env_filter)
        .with(WheelLayer)
        .try_init()
}
