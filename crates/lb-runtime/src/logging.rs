use lb_core::LogLevel;
use tracing::level_filters::LevelFilter;
use tracing::Level;

pub(crate) const LOG_TARGET: &str = "lua";

pub(crate) fn level_filter(level: LogLevel) -> LevelFilter {
    match level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Fatal | LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    }
}

/// Per-engine gate applied before an event reaches the global subscriber.
pub(crate) fn should_log(level: LogLevel, event: Level) -> bool {
    event <= level_filter(level)
}
