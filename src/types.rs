use crate::detection::SwingConfig;
use crate::pipeline::DEFAULT_EVENT_KEY;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub detection: SwingConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Directory scanned for tracker pose dumps
    pub input_dir: String,
    pub extensions: Vec<String>,
    /// Used to derive timestamps for frames that don't carry one
    pub fps: Option<f64>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            input_dir: "poses".to_string(),
            extensions: vec!["jsonl".to_string()],
            fps: Some(30.0),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub json_path: String,
    pub event_key: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json_path: "output_smash_detection.json".to_string(),
            event_key: DEFAULT_EVENT_KEY.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "smash_detection=info".to_string(),
        }
    }
}
