use lb_core::{LogLevel, LuaBridgeError};

pub const LOG_LEVEL_ENV: &str = "LB_LOG_LEVEL";
pub const MEMORY_LIMIT_ENV: &str = "LB_MEMORY_LIMIT";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineOptions {
    pub log_level: LogLevel,
    /// Interpreter heap cap in bytes; allocations past it fail with `LUA_ERRMEM`.
    pub memory_limit: Option<usize>,
}

impl EngineOptions {
    pub fn from_env() -> Result<Self, LuaBridgeError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, LuaBridgeError> {
        let mut options = Self::default();

        if let Some(raw) = lookup(LOG_LEVEL_ENV) {
            options.log_level = LogLevel::parse(&raw).ok_or_else(|| {
                LuaBridgeError::new(
                    "ENGINE_CONFIG_INVALID",
                    format!("{} has unsupported value \"{}\".", LOG_LEVEL_ENV, raw),
                )
            })?;
        }

        if let Some(raw) = lookup(MEMORY_LIMIT_ENV) {
            let limit = raw.trim().parse::<usize>().map_err(|_| {
                LuaBridgeError::new(
                    "ENGINE_CONFIG_INVALID",
                    format!("{} must be a byte count, got \"{}\".", MEMORY_LIMIT_ENV, raw),
                )
            })?;
            options.memory_limit = Some(limit);
        }

        Ok(options)
    }
}
