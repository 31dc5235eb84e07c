use std::fs::File;
use std::path::PathBuf;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use super::transport::SinkPorts;

const FILE_NAME: &str = "bodycast.json";

static CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    let base = std::env::var("XDG_CONFIG_HOME").unwrap_or_else(|_| {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        format!("{}/.config", home)
    });
    PathBuf::from(base).join(FILE_NAME)
});

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// UDP destination for all payload kinds.
    pub dest_host: String,
    pub ports: SinkPorts,
    /// Vision API key; falls back to the GOOGLE_API_KEY environment
    /// variable, and inference is disabled when neither is set.
    pub api_key: Option<String>,
    /// Minimum seconds between expression inference dispatches.
    pub dispatch_interval_secs: f32,
    /// Draw per-face expression labels next to the bounding boxes.
    pub show_labels: bool,
    /// Also send per-person pose summaries on their own port.
    pub send_body_summaries: bool,
    /// Also send interaction/posture/person-count classifier results.
    pub send_classifiers: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            dest_host: "127.0.0.1".into(),
            ports: SinkPorts::default(),
            api_key: None,
            dispatch_interval_secs: 1.0,
            show_labels: true,
            send_body_summaries: false,
            send_classifiers: false,
        }
    }
}

impl Config {
    pub fn load() -> Config {
        File::open(CONFIG_PATH.as_path())
            .ok()
            .and_then(|file| serde_json::from_reader(file).ok())
            .unwrap_or_else(|| {
                log::info!(
                    "No config at {}, using defaults",
                    CONFIG_PATH.display()
                );
                Config::default()
            })
    }

    pub fn api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("GOOGLE_API_KEY").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_carry_reference_ports() {
        let config = Config::default();
        assert_eq!(config.ports.keypoints, 1111);
        assert_eq!(config.ports.average_lines, 402);
        assert_eq!(config.ports.headwearer_lines, 403);
        assert_eq!(config.ports.averages_repr, 405);
        assert!((config.dispatch_interval_secs - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn partial_config_files_fill_in_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"dest_host": "100.78.20.208"}"#).unwrap();
        assert_eq!(config.dest_host, "100.78.20.208");
        assert_eq!(config.ports.keypoints, 1111);
        assert!(config.show_labels);
    }
}
