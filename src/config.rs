//! Configuration management for the fraud detection form

use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub metrics: MetricsConfig,
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    pub host: String,
    /// Bind port
    pub port: u16,
    /// Number of HTTP workers
    pub workers: usize,
}

/// Classification model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Path to the ONNX model file
    pub path: String,
    /// Optional feature schema written by the training pipeline
    #[serde(default)]
    pub schema_path: Option<String>,
    /// Fraud probability cut-off, used only when the model has no label output
    #[serde(default = "default_probability_threshold")]
    pub probability_threshold: f64,
    /// Number of threads for ONNX inference (default: 1)
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_probability_threshold() -> f64 {
    0.5
}

fn default_onnx_threads() -> usize {
    1
}

/// Metrics reporting configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Seconds between logged summaries; 0 disables periodic reports
    pub report_interval_secs: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    ///
    /// A missing file is not an error; built-in defaults fill every key
    /// the file does not set.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let defaults = AppConfig::default();

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", defaults.server.port as i64)?
            .set_default("server.workers", defaults.server.workers as i64)?
            .set_default("model.path", defaults.model.path)?
            .set_default(
                "model.probability_threshold",
                defaults.model.probability_threshold,
            )?
            .set_default("model.onnx_threads", defaults.model.onnx_threads as i64)?
            .set_default(
                "metrics.report_interval_secs",
                defaults.metrics.report_interval_secs as i64,
            )?
            .set_default("logging.level", defaults.logging.level)?
            .set_default("logging.format", defaults.logging.format)?
            .add_source(File::from(path.as_ref()).required(false))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        let threshold = self.model.probability_threshold;
        if !(0.0..=1.0).contains(&threshold) {
            anyhow::bail!("model.probability_threshold must be within [0, 1], got {threshold}");
        }
        if self.server.workers == 0 {
            anyhow::bail!("server.workers must be at least 1");
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8501,
                workers: 1,
            },
            model: ModelConfig {
                path: "models/fraud_detection.onnx".to_string(),
                schema_path: None,
                probability_threshold: default_probability_threshold(),
                onnx_threads: default_onnx_threads(),
            },
            metrics: MetricsConfig {
                report_interval_secs: 300,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }
}
