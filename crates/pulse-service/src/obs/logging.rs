//! Tracing subscriber setup.

use std::io::Write;

use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Default filter when `RUST_LOG` is unset.
const DEFAULT_FILTER: &str = "info";
/// Lines queued for the writer thread before new lines are dropped.
const BUFFERED_LINES_LIMIT: usize = 128_000;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Newline-delimited JSON, one object per event.
    #[default]
    Json,
    /// Human-readable multi-line output for local runs.
    Pretty,
}

impl From<&str> for LogFormat {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => LogFormat::Pretty,
            _ => LogFormat::Json,
        }
    }
}

/// Install the global subscriber. A second call is a no-op.
///
/// Events are formatted on the calling task and handed to a dedicated writer
/// thread, so a stalled stdout never holds up a response. The queue is lossy:
/// once `BUFFERED_LINES_LIMIT` lines are pending, further lines are dropped.
/// Keep the returned guard alive until shutdown; dropping it flushes the queue.
pub fn init(format: LogFormat) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let (writer, guard) = non_blocking(std::io::stdout(), BUFFERED_LINES_LIMIT);

    let res = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true).with_writer(writer))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().pretty().with_writer(writer))
            .try_init(),
    };

    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
    guard
}

fn non_blocking<W: Write + Send + 'static>(sink: W, lines_limit: usize) -> (NonBlocking, WorkerGuard) {
    NonBlockingBuilder::default()
        .lossy(true)
        .buffered_lines_limit(lines_limit)
        .finish(sink)
}
