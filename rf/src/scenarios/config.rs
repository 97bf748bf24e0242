//! Scenario configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the file fan-in scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FanInConfig {
    /// Directory the producers write into
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// One producer per file name
    #[serde(default = "default_files")]
    pub files: Vec<String>,

    /// Bytes every producer writes
    #[serde(default = "default_payload")]
    pub payload: String,
}

fn default_output_dir() -> PathBuf {
    std::env::temp_dir().join("racefree")
}

fn default_files() -> Vec<String> {
    vec!["file1".to_string(), "file2".to_string()]
}

fn default_payload() -> String {
    "hello racefree\n".to_string()
}

impl Default for FanInConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            files: default_files(),
            payload: default_payload(),
        }
    }
}

/// Configuration for the loop-capture scenario
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopCaptureConfig {
    /// Number of tasks to spawn
    #[serde(default = "default_tasks")]
    pub tasks: usize,
}

fn default_tasks() -> usize {
    5
}

impl Default for LoopCaptureConfig {
    fn default() -> Self {
        Self { tasks: 5 }
    }
}
