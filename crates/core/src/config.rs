use std::path::Path;

use serde::Deserialize;

/// Root application configuration. Loaded from an optional TOML file and
/// environment variables with the prefix `TOUCHPOINT__`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub tie_break: TieBreak,
    /// Decimal places kept on linear channel totals.
    #[serde(default = "default_linear_decimals")]
    pub linear_decimals: u32,
}

/// Which of several events sharing the extremal week wins a last-touch or
/// first-touch pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// The event that appears latest in the input.
    #[default]
    LastSeen,
    /// The event that appears earliest in the input.
    FirstSeen,
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

fn default_linear_decimals() -> u32 {
    2
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tie_break: TieBreak::default(),
            linear_decimals: default_linear_decimals(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional config file, overridden by
    /// environment variables.
    pub fn load(file: Option<&Path>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();

        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        let config = builder
            .add_source(
                config::Environment::with_prefix("TOUCHPOINT")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;
        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.engine.tie_break, TieBreak::LastSeen);
        assert_eq!(config.engine.linear_decimals, 2);
        assert_eq!(config.output.format, OutputFormat::Csv);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[engine]\ntie_break = \"first_seen\"\nlinear_decimals = 3\n\n[output]\nformat = \"json\""
        )
        .unwrap();

        let config = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.engine.tie_break, TieBreak::FirstSeen);
        assert_eq!(config.engine.linear_decimals, 3);
        assert_eq!(config.output.format, OutputFormat::Json);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = AppConfig::load(Some(Path::new("/nonexistent/touchpoint.toml")));
        assert!(result.is_err());
    }
}
