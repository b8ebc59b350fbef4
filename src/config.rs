use crate::types::Config;
use anyhow::{ensure, Context, Result};
use std::fs;

pub const CONFIG_PATH_ENV: &str = "SMASH_CONFIG";
pub const INPUT_DIR_ENV: &str = "SMASH_INPUT_DIR";
pub const OUTPUT_JSON_ENV: &str = "SMASH_OUTPUT_JSON";

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
        Self::from_yaml_str(&contents).with_context(|| format!("Invalid config {}", path))
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `SMASH_INPUT_DIR` / `SMASH_OUTPUT_JSON` when set.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var(INPUT_DIR_ENV) {
            self.input.input_dir = dir;
        }
        if let Ok(path) = std::env::var(OUTPUT_JSON_ENV) {
            self.output.json_path = path;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.detection.validate()?;
        if let Some(fps) = self.input.fps {
            ensure!(fps.is_finite() && fps > 0.0, "input.fps must be positive, got {}", fps);
        }
        ensure!(!self.output.event_key.is_empty(), "output.event_key must not be empty");
        Ok(())
    }
}
