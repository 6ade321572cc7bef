//! Configuration management.
//!
//! Settings resolve in three layers: built-in defaults, an optional
//! `camintake.toml` file, then environment variables. `.env` files are
//! loaded by `main` before any of this runs.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default config file searched in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "camintake.toml";

/// Top-level service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Bucket identity passed to the OCR engine and used by the blob store.
    pub bucket: String,
    /// Root for mirrored archives and per-request staging directories.
    pub uploads_dir: PathBuf,
    /// Root directory for the local blob store.
    pub blob_root: PathBuf,
    pub ocr: OcrSettings,
    pub server: ServerSettings,
}

/// OCR engine invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrSettings {
    /// Interpreter the engine script runs under.
    pub program: String,
    /// Path to the engine entry script.
    pub script: PathBuf,
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Exponential backoff base between attempts.
    pub backoff_base_ms: u64,
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address, `host:port`.
    pub bind: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bucket: "cam-documents".to_string(),
            uploads_dir: PathBuf::from("uploads"),
            blob_root: PathBuf::from("blobstore"),
            ocr: OcrSettings::default(),
            server: ServerSettings::default(),
        }
    }
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            program: "python3".to_string(),
            script: PathBuf::from("scripts/ocr_api.py"),
            max_retries: 2,
            backoff_base_ms: 1000,
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3030".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from an explicit config path, or from
    /// `camintake.toml` in the working directory when present, then
    /// apply environment overrides.
    pub fn load(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let mut settings = match config_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        settings.apply_env_overrides();
        Ok(settings)
    }

    fn from_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("cannot read config file {}: {e}", path.display()))?;
        let settings: Self = toml::from_str(&raw)
            .map_err(|e| anyhow::anyhow!("invalid config file {}: {e}", path.display()))?;
        Ok(settings)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(bucket) = std::env::var("S3_BUCKET") {
            self.bucket = bucket;
        }
        if let Ok(dir) = std::env::var("CAMINTAKE_UPLOADS_DIR") {
            self.uploads_dir = PathBuf::from(dir);
        }
        if let Ok(root) = std::env::var("CAMINTAKE_BLOB_ROOT") {
            self.blob_root = PathBuf::from(root);
        }
        if let Ok(program) = std::env::var("OCR_PROGRAM") {
            self.ocr.program = program;
        }
        if let Ok(script) = std::env::var("OCR_SCRIPT") {
            self.ocr.script = PathBuf::from(script);
        }
        if let Ok(retries) = std::env::var("CAMINTAKE_MAX_RETRIES") {
            match retries.parse() {
                Ok(n) => self.ocr.max_retries = n,
                Err(_) => tracing::warn!("ignoring invalid CAMINTAKE_MAX_RETRIES={retries}"),
            }
        }
        if let Ok(bind) = std::env::var("CAMINTAKE_BIND") {
            self.server.bind = bind;
        }
    }
}
