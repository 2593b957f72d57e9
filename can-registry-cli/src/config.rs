//! Configuration loading and parsing

use anyhow::{ensure, Context, Result};
use can_registry::classifier;
use can_registry::DispatchConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Main application configuration (loaded from config.toml)
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AppConfig {
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct InputConfig {
    /// candump logs checked when none are given on the command line
    #[serde(default)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    /// Write one report file per log here instead of printing to stdout
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Txt,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Txt => "txt",
            OutputFormat::Json => "json",
        }
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: AppConfig = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate(&config).with_context(|| format!("Invalid config file: {:?}", path))?;

    Ok(config)
}

fn validate(config: &AppConfig) -> Result<()> {
    for binding in &config.dispatch.sensor_bindings {
        ensure!(
            classifier::is_dynamic(binding.id),
            "sensor binding 0x{:03X} ({}) is outside the dynamic band 0x{:03X}-0x{:03X}",
            binding.id,
            binding.channel,
            classifier::DYNAMIC_BAND.start(),
            classifier::DYNAMIC_BAND.end()
        );
    }
    for (i, binding) in config.dispatch.sensor_bindings.iter().enumerate() {
        let duplicate = config.dispatch.sensor_bindings[..i]
            .iter()
            .any(|other| other.id == binding.id && other.channel != binding.channel);
        ensure!(
            !duplicate,
            "sensor binding 0x{:03X} is assigned to more than one channel",
            binding.id
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use can_registry::{Category, SensorBinding};
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_config_deserialization() {
        let toml_content = r#"
            [input]
            files = ["bus.log"]

            [dispatch]
            apply_control_events = false
            category_filter = ["sensor-data", "introduction"]

            [[dispatch.sensor_bindings]]
            id = 0x52A
            channel = "imu-x"

            [output]
            format = "json"
            output_dir = "reports"
        "#;

        let config: AppConfig = toml::from_str(toml_content).unwrap();
        assert_eq!(config.input.files, vec![PathBuf::from("bus.log")]);
        assert!(!config.dispatch.apply_control_events);
        assert_eq!(
            config.dispatch.category_filter,
            Some(vec![Category::SensorData, Category::Introduction])
        );
        assert_eq!(
            config.dispatch.sensor_bindings,
            vec![SensorBinding::new(0x52A, "imu-x")]
        );
        assert_eq!(config.output.format, OutputFormat::Json);
        assert_eq!(config.output.output_dir, Some(PathBuf::from("reports")));
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(config.input.files.is_empty());
        assert!(config.dispatch.apply_control_events);
        assert_eq!(config.output.format, OutputFormat::Txt);
    }

    #[test]
    fn test_load_config_rejects_static_binding() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[dispatch.sensor_bindings]]\nid = 0x112\nchannel = \"imu-x\""
        )
        .unwrap();

        let err = load_config(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("outside the dynamic band"));
    }

    #[test]
    fn test_load_config_rejects_conflicting_bindings() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[dispatch.sensor_bindings]]\nid = 0x52A\nchannel = \"a\"\n\n[[dispatch.sensor_bindings]]\nid = 0x52A\nchannel = \"b\""
        )
        .unwrap();

        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn test_load_config_missing_file() {
        assert!(load_config(Path::new("/nonexistent/config.toml")).is_err());
    }
}
