//! Configuration for the history engine.

/// Default memory ceiling for retained history: 512 MiB.
const DEFAULT_MAX_BYTES: usize = 512 * 1024 * 1024;

/// Environment variable that overrides the memory ceiling (in bytes).
pub const MAX_BYTES_ENV: &str = "RUST_PAINT_HISTORY_MAX_BYTES";

/// Configuration for the history engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum bytes retained by all entries before the oldest are evicted.
    pub max_bytes: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl HistoryConfig {
    /// Config with an explicit ceiling in bytes.
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Builds a config from the environment.
    ///
    /// Resolution order:
    /// 1. `RUST_PAINT_HISTORY_MAX_BYTES` environment variable, if it parses
    /// 2. the built-in default
    pub fn from_env() -> Self {
        Self::from_env_or(Self::default())
    }

    /// Like [`from_env`](Self::from_env), falling back to `fallback`
    /// (typically the application config) instead of the built-in default.
    pub fn from_env_or(fallback: Self) -> Self {
        match std::env::var(MAX_BYTES_ENV) {
            Ok(raw) => match raw.trim().parse::<usize>() {
                Ok(max_bytes) => Self { max_bytes },
                Err(e) => {
                    tracing::warn!("Ignoring {MAX_BYTES_ENV}={raw:?}: {e}");
                    fallback
                }
            },
            Err(_) => fallback,
        }
    }

    /// Config with no practical ceiling. Handy for tests.
    pub fn unlimited() -> Self {
        Self {
            max_bytes: usize::MAX,
        }
    }
}
