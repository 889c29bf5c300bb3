//! TOML-based configuration and user-facing timer settings.
//!
//! Configuration is stored at `~/.config/cubetimer/config.toml`:
//! - `[timer]` the [`AppSettings`] a fresh install starts with
//! - `[thresholds]` debounce windows and tick rates
//! - `[scramble]` optional fixed seed for reproducible scrambles
//! - `default_cube_type`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError, ValidationError};
use crate::timer::TimerThresholds;

/// Inspection durations a user may pick, in seconds.
pub const INSPECTION_CHOICES: [u32; 3] = [8, 15, 30];

/// User settings carried in snapshots and edited at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    #[serde(default)]
    pub use_inspection: bool,
    /// Seconds; one of [`INSPECTION_CHOICES`].
    #[serde(default = "default_inspection_time")]
    pub inspection_time: u32,
    #[serde(default)]
    pub hide_time_while_solving: bool,
    #[serde(default)]
    pub sounds: bool,
    /// 0.0 ..= 1.0
    #[serde(default = "default_sound_volume")]
    pub sound_volume: f64,
}

fn default_inspection_time() -> u32 {
    15
}
fn default_sound_volume() -> f64 {
    0.5
}
fn default_cube_type() -> String {
    "3x3".into()
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            use_inspection: false,
            inspection_time: default_inspection_time(),
            hide_time_while_solving: false,
            sounds: false,
            sound_volume: default_sound_volume(),
        }
    }
}

impl AppSettings {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !INSPECTION_CHOICES.contains(&self.inspection_time) {
            return Err(ValidationError::InspectionTime(self.inspection_time));
        }
        if !(0.0..=1.0).contains(&self.sound_volume) {
            return Err(ValidationError::InvalidValue {
                field: "soundVolume".into(),
                message: format!("{} is outside 0.0..=1.0", self.sound_volume),
            });
        }
        Ok(())
    }
}

/// Partial settings update. Unset fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_inspection: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inspection_time: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hide_time_while_solving: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sounds: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_volume: Option<f64>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply onto `base`. Nothing is applied if the merged result is invalid.
    pub fn merge(&self, base: &AppSettings) -> Result<AppSettings, ValidationError> {
        let merged = AppSettings {
            use_inspection: self.use_inspection.unwrap_or(base.use_inspection),
            inspection_time: self.inspection_time.unwrap_or(base.inspection_time),
            hide_time_while_solving: self
                .hide_time_while_solving
                .unwrap_or(base.hide_time_while_solving),
            sounds: self.sounds.unwrap_or(base.sounds),
            sound_volume: self.sound_volume.unwrap_or(base.sound_volume),
        };
        merged.validate()?;
        Ok(merged)
    }
}

/// Scramble configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrambleConfig {
    /// Fixed RNG seed. Random per process when unset.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/cubetimer/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub timer: AppSettings,
    #[serde(default)]
    pub thresholds: TimerThresholds,
    #[serde(default)]
    pub scramble: ScrambleConfig,
    #[serde(default = "default_cube_type")]
    pub default_cube_type: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timer: AppSettings::default(),
            thresholds: TimerThresholds::default(),
            scramble: ScrambleConfig::default(),
            default_cube_type: default_cube_type(),
        }
    }
}

impl Config {
    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn parse_scalar(key: &str, value: &str) -> Result<serde_json::Value, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        if let Ok(n) = value.parse::<u64>() {
            return Ok(serde_json::Value::Number(n.into()));
        }
        if let Ok(n) = value.parse::<f64>() {
            return serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")));
        }
        if let Ok(b) = value.parse::<bool>() {
            return Ok(serde_json::Value::Bool(b));
        }
        Ok(serde_json::Value::String(value.into()))
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => match Self::parse_scalar(key, value)? {
                        n @ serde_json::Value::Number(_) => n,
                        _ => return Err(invalid(format!("cannot parse '{value}' as number"))),
                    },
                    serde_json::Value::Null => Self::parse_scalar(key, value)?,
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    serde_json::Value::String(_) => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    /// `config.toml` inside [`data_dir`].
    pub fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed or
    /// holds invalid settings, or if the default config cannot be written.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: err.to_string(),
            }
            .into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| save_failed(e.to_string()))?;
        }
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timer
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "timer".into(),
                message: e.to_string(),
            })?;
        if self.default_cube_type.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "default_cube_type".into(),
                message: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Get a config value as string by dot-separated key,
    /// e.g. `timer.inspectionTime` or `thresholds.stop_guard_ms`.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        match Self::get_json_value_by_path(&json, key)? {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key in memory. Call [`Config::save`] to persist.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value cannot be parsed
    /// into a valid configuration.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config =
            serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
