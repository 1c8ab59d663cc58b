//! Settings for the pipeline.
//!
//! Loaded from `stepwise.toml` (or an explicit path) and then overridden by
//! `STEPWISE_*` environment variables. A missing default file means defaults.
//!
//! ```toml
//! [compiler]
//! base_url = "https://staging.example.com"
//! clear_before_write = false
//!
//! [validation]
//! max_name_length = 100
//! strict = true
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{err_msg, StepError};

pub const SETTINGS_FILE: &str = "stepwise.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerSettings {
    /// Prefix for relative navigation targets when a definition has no `base`.
    pub base_url: Option<String>,
    /// Emit a clearing step before each located write.
    pub clear_before_write: bool,
    /// Position of the first emitted step.
    pub start_position: usize,
    /// Timeout hint for element waits without their own maximum.
    pub default_timeout_ms: Option<u64>,
}

impl Default for CompilerSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            clear_before_write: true,
            start_position: 1,
            default_timeout_ms: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationSettings {
    pub max_name_length: usize,
    /// Warnings fail validation too.
    pub strict: bool,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            max_name_length: 80,
            strict: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub compiler: CompilerSettings,
    pub validation: ValidationSettings,
}

impl Settings {
    pub fn from_toml_str(text: &str) -> Result<Self, StepError> {
        toml::from_str(text).map_err(|e| {
            err_msg!(Config, "Invalid settings: {}", e.message())
                .with_help("See the [compiler] and [validation] tables in the documentation")
        })
    }

    /// Reads `path`, or `stepwise.toml` in the working directory when it
    /// exists, then applies environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, StepError> {
        let mut settings = match path {
            Some(path) => Self::read(path)?,
            None if Path::new(SETTINGS_FILE).is_file() => Self::read(Path::new(SETTINGS_FILE))?,
            None => Self::default(),
        };
        settings.apply_overrides(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    fn read(path: &Path) -> Result<Self, StepError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            err_msg!(Config, "Cannot read settings file '{}': {}", path.display(), e)
        })?;
        debug!(path = %path.display(), "loaded settings file");
        Self::from_toml_str(&text)
    }

    /// Applies `STEPWISE_BASE_URL`, `STEPWISE_CLEAR_BEFORE_WRITE`,
    /// `STEPWISE_DEFAULT_TIMEOUT_MS` and `STEPWISE_STRICT`.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), StepError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("STEPWISE_BASE_URL").filter(|u| !u.trim().is_empty()) {
            self.compiler.base_url = Some(url);
        }
        if let Some(flag) = lookup("STEPWISE_CLEAR_BEFORE_WRITE") {
            self.compiler.clear_before_write = parse_flag("STEPWISE_CLEAR_BEFORE_WRITE", &flag)?;
        }
        if let Some(ms) = lookup("STEPWISE_DEFAULT_TIMEOUT_MS") {
            let ms = ms.trim().parse::<u64>().map_err(|_| {
                err_msg!(Config, "STEPWISE_DEFAULT_TIMEOUT_MS must be milliseconds, got '{}'", ms)
            })?;
            self.compiler.default_timeout_ms = Some(ms);
        }
        if let Some(flag) = lookup("STEPWISE_STRICT") {
            self.validation.strict = parse_flag("STEPWISE_STRICT", &flag)?;
        }
        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, StepError> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(err_msg!(Config, "{} must be true or false, got '{}'", name, value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let settings = Settings::from_toml_str("[compiler]\nclear_before_write = false\n").unwrap();
        assert!(!settings.compiler.clear_before_write);
        assert_eq!(settings.compiler.start_position, 1);
        assert_eq!(settings.validation.max_name_length, 80);
    }

    #[test]
    fn test_unknown_keys_are_rejected() {
        let err = Settings::from_toml_str("[compiler]\nclear = false\n").unwrap_err();
        assert_eq!(err.error_type(), crate::ErrorType::Config);
    }

    #[test]
    fn test_environment_overrides() {
        let mut settings = Settings::default();
        settings
            .apply_overrides(|key| match key {
                "STEPWISE_BASE_URL" => Some("https://qa.example.com".into()),
                "STEPWISE_CLEAR_BEFORE_WRITE" => Some("no".into()),
                _ => None,
            })
            .unwrap();
        assert_eq!(
            settings.compiler.base_url.as_deref(),
            Some("https://qa.example.com")
        );
        assert!(!settings.compiler.clear_before_write);
        let bad = Settings::default().apply_overrides(|key| {
            (key == "STEPWISE_STRICT").then(|| "maybe".to_string())
        });
        assert!(bad.is_err());
    }
}
