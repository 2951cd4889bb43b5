//! Stderr logging for binaries and examples.
//!
//! Lines look like `[  0.042s DEBUG warp] message`, where the last segment of
//! the module path stands in for the full target. Install once at startup
//! with [`init_with_level`]; later calls are no-ops.

use std::io::Write;
use std::sync::OnceLock;
use std::time::Instant;

use log::{LevelFilter, Log, Metadata, Record};

struct StderrLogger {
    max_level: LevelFilter,
    t0: Instant,
}

fn short_target(target: &str) -> &str {
    target.rsplit("::").next().unwrap_or(target)
}

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.max_level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format!(
                "[{:7.3}s {:>5} {}] {}\n",
                self.t0.elapsed().as_secs_f64(),
                record.level(),
                short_target(record.target()),
                record.args()
            );
            let _ = std::io::stderr().lock().write_all(line.as_bytes());
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

static INSTALLED: OnceLock<StderrLogger> = OnceLock::new();

/// Install the stderr logger at `level`.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if INSTALLED.get().is_some() {
        return Ok(());
    }
    let logger = INSTALLED.get_or_init(|| StderrLogger {
        max_level: level,
        t0: Instant::now(),
    });
    log::set_logger(logger)?;
    log::set_max_level(level);
    Ok(())
}

/// Map a `-v` count onto a level: 0 = warn, 1 = info, 2 = debug, 3+ = trace.
pub fn level_from_verbosity(verbose: u8) -> LevelFilter {
    [
        LevelFilter::Warn,
        LevelFilter::Info,
        LevelFilter::Debug,
        LevelFilter::Trace,
    ][usize::from(verbose.min(3))]
}

#[cfg(feature = "tracing")]
pub use self::tracing_init::init_tracing;

#[cfg(feature = "tracing")]
mod tracing_init {
    use tracing_subscriber::fmt::format::FmtSpan;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{fmt, EnvFilter};

    use log::LevelFilter;

    /// Install a `tracing` subscriber on stderr. `RUST_LOG` wins when set;
    /// otherwise events at `default_level` and above are kept. Span close
    /// events carry solver and warp timings.
    pub fn init_tracing(json: bool, default_level: LevelFilter) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(default_directive(default_level)));
        let builder = fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE);
        let installed = if json {
            builder.json().flatten_event(true).finish().try_init()
        } else {
            builder
                .with_timer(fmt::time::Uptime::default())
                .finish()
                .try_init()
        };
        if let Err(err) = installed {
            log::debug!("tracing subscriber already installed: {err}");
        }
    }

    pub(super) fn default_directive(level: LevelFilter) -> String {
        level.to_string().to_ascii_lowercase()
    }
}
