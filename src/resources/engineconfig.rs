//! Engine configuration resource.
//!
//! Settings loaded from an INI configuration file. Every value has a safe
//! default, so a missing file or a missing key never prevents startup.
//!
//! # Configuration File Format
//!
//! ```ini
//! [events]
//! default_outreach = 10
//!
//! [time]
//! max_delta = 0.1
//! time_scale = 1.0
//!
//! [dispatch]
//! enabled = true
//! job_queue = true
//! ```

use std::path::{Path, PathBuf};

use bevy_ecs::prelude::*;
use configparser::ini::Ini;
use log::info;

use crate::components::eventobject::DEFAULT_OUTREACH;
use crate::error::EngineError;

/// Default safe values for startup
const DEFAULT_MAX_DELTA: f32 = 0.1;
const DEFAULT_TIME_SCALE: f32 = 1.0;
const DEFAULT_DISPATCH_ENABLED: bool = true;
const DEFAULT_JOB_QUEUE_ENABLED: bool = true;
const DEFAULT_CONFIG_PATH: &str = "./events.ini";

#[derive(Resource, Debug, Clone)]
pub struct EngineConfig {
    /// Push outreach given to events created through the engine facade.
    pub default_outreach: i32,
    /// Upper bound for a frame's delta time in seconds, so a stall does
    /// not turn into one huge step.
    pub max_delta: f32,
    /// Multiplier applied to every (clamped) frame delta.
    pub time_scale: f32,
    /// Run handlers on the dispatch thread.
    pub dispatch_enabled: bool,
    /// Start the background job thread.
    pub job_queue_enabled: bool,
    /// Path to the configuration file.
    pub config_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineConfig {
    /// Create a new configuration with safe default values.
    pub fn new() -> Self {
        Self {
            default_outreach: DEFAULT_OUTREACH,
            max_delta: DEFAULT_MAX_DELTA,
            time_scale: DEFAULT_TIME_SCALE,
            dispatch_enabled: DEFAULT_DISPATCH_ENABLED,
            job_queue_enabled: DEFAULT_JOB_QUEUE_ENABLED,
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
        }
    }

    /// Create a new configuration with a custom config file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: path.into(),
            ..Self::new()
        }
    }

    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Load configuration from the INI file.
    ///
    /// Missing values retain their current values. Out of range values are
    /// clamped to something usable.
    pub fn load_from_file(&mut self) -> Result<(), EngineError> {
        let mut config = Ini::new();
        config
            .load(&self.config_path)
            .map_err(|e| EngineError::Config(format!("failed to load config file: {}", e)))?;

        // [events] section
        if let Some(outreach) = config.getint("events", "default_outreach").ok().flatten() {
            self.default_outreach = outreach.clamp(0, i32::MAX as i64) as i32;
        }

        // [time] section
        if let Some(max_delta) = config.getfloat("time", "max_delta").ok().flatten() {
            if max_delta > 0.0 {
                self.max_delta = max_delta as f32;
            }
        }
        if let Some(time_scale) = config.getfloat("time", "time_scale").ok().flatten() {
            self.time_scale = (time_scale as f32).max(0.0);
        }

        // [dispatch] section
        if let Some(enabled) = config.getbool("dispatch", "enabled").ok().flatten() {
            self.dispatch_enabled = enabled;
        }
        if let Some(enabled) = config.getbool("dispatch", "job_queue").ok().flatten() {
            self.job_queue_enabled = enabled;
        }

        info!(
            "Loaded config: outreach={}, max_delta={}, time_scale={}, dispatch={}, job_queue={}",
            self.default_outreach,
            self.max_delta,
            self.time_scale,
            self.dispatch_enabled,
            self.job_queue_enabled
        );

        Ok(())
    }

    /// Save configuration to the INI file.
    ///
    /// Creates the file if it doesn't exist.
    pub fn save_to_file(&self) -> Result<(), EngineError> {
        let mut config = Ini::new();

        config.set(
            "events",
            "default_outreach",
            Some(self.default_outreach.to_string()),
        );
        config.set("time", "max_delta", Some(self.max_delta.to_string()));
        config.set("time", "time_scale", Some(self.time_scale.to_string()));
        config.set(
            "dispatch",
            "enabled",
            Some(self.dispatch_enabled.to_string()),
        );
        config.set(
            "dispatch",
            "job_queue",
            Some(self.job_queue_enabled.to_string()),
        );

        config.write(&self.config_path)?;

        info!("Saved config to {:?}", self.config_path);

        Ok(())
    }

    /// Clamp a raw frame delta to `[0, max_delta]`.
    pub fn clamp_delta(&self, delta_time: f32) -> f32 {
        if delta_time.is_nan() {
            return 0.0;
        }
        delta_time.clamp(0.0, self.max_delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn missing_keys_keep_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[time]\nmax_delta = 0.25").unwrap();
        let mut config = EngineConfig::with_path(file.path());
        config.load_from_file().unwrap();
        assert!((config.max_delta - 0.25).abs() < 1e-6);
        assert_eq!(config.default_outreach, DEFAULT_OUTREACH);
        assert!((config.time_scale - 1.0).abs() < 1e-6);
        assert!(config.dispatch_enabled);
        assert!(config.job_queue_enabled);
    }

    #[test]
    fn missing_file_is_an_error_and_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = EngineConfig::with_path(dir.path().join("nope.ini"));
        assert!(matches!(config.load_from_file(), Err(EngineError::Config(_))));
        assert!((config.max_delta - DEFAULT_MAX_DELTA).abs() < 1e-6);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.ini");
        let mut config = EngineConfig::with_path(&path);
        config.default_outreach = 24;
        config.dispatch_enabled = false;
        config.time_scale = 0.5;
        config.save_to_file().unwrap();

        let mut loaded = EngineConfig::with_path(&path);
        loaded.load_from_file().unwrap();
        assert_eq!(loaded.default_outreach, 24);
        assert!(!loaded.dispatch_enabled);
        assert!(loaded.job_queue_enabled);
        assert!((loaded.time_scale - 0.5).abs() < 1e-6);
    }

    #[test]
    fn clamp_delta_bounds() {
        let config = EngineConfig::new();
        assert!((config.clamp_delta(5.0) - DEFAULT_MAX_DELTA).abs() < 1e-6);
        assert_eq!(config.clamp_delta(-1.0), 0.0);
        assert_eq!(config.clamp_delta(f32::NAN), 0.0);
        assert!((config.clamp_delta(0.016) - 0.016).abs() < 1e-6);
    }
}
