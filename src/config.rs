// src/config.rs
use std::env;
use std::str::FromStr;

/// Process-wide settings, read from the environment once at startup and
/// immutable afterwards.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Quality for lossy encodes (1-100). Ignored when the resolved output
    /// is lossless.
    pub quality: u8,
    /// Width constraint applied when the request does not carry one.
    pub default_width: u32,
    /// Listen port for the HTTP server.
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            default_width: 1280,
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            quality: env_parse("TARGET_QUALITY", defaults.quality).clamp(1, 100),
            default_width: env_parse("TARGET_DEFAULT_WIDTH", defaults.default_width),
            port: env_parse("PORT", defaults.port),
        }
    }
}

fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_baseline() {
        let config = AppConfig::default();
        assert_eq!(config.quality, 80);
        assert_eq!(config.default_width, 1280);
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn env_parse_falls_back_on_missing_key() {
        assert_eq!(env_parse("SQUISH_TEST_UNSET_KEY", 42u8), 42);
    }
}
