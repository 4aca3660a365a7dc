// Configuration for legalbrief, loaded from TOML with env overrides
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = "config.toml";

// Defaults matching the fine-tuned BART summarizer
pub const ACCELERATED_CHUNK_SIZE: usize = 768;
pub const CPU_CHUNK_SIZE: usize = 512;
pub const PREVIEW_CHARS: usize = 500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub model: ModelConfig,
    pub generation: GenerationConfig,
    pub chunking: ChunkingConfig,
    pub ocr: OcrConfig,
    pub pipeline: PipelineConfig,
    pub evaluation: EvaluationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    #[default]
    Auto,
    Cpu,
    Cuda,
}

impl std::str::FromStr for DevicePreference {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(DevicePreference::Auto),
            "cpu" => Ok(DevicePreference::Cpu),
            "cuda" | "gpu" => Ok(DevicePreference::Cuda),
            other => Err(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ModelConfig {
    pub dir: PathBuf,
    pub encoder_file: String,
    pub decoder_file: String,
    pub tokenizer_file: String,
    /// LoRA overlay trained on legal text, applied on top of the base model.
    pub adapter_file: Option<String>,
    pub device: DevicePreference,
    pub cuda_device_id: i32,
    pub intra_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("models/bart-large-cnn"),
            encoder_file: "encoder_model.onnx".to_string(),
            decoder_file: "decoder_model.onnx".to_string(),
            tokenizer_file: "tokenizer.json".to_string(),
            adapter_file: Some("legal_adapter.onnx_adapter".to_string()),
            device: DevicePreference::Auto,
            cuda_device_id: 0,
            intra_threads: 4,
        }
    }
}

impl ModelConfig {
    pub fn encoder_path(&self) -> PathBuf {
        self.dir.join(&self.encoder_file)
    }

    pub fn decoder_path(&self) -> PathBuf {
        self.dir.join(&self.decoder_file)
    }

    pub fn tokenizer_path(&self) -> PathBuf {
        self.dir.join(&self.tokenizer_file)
    }

    pub fn adapter_path(&self) -> Option<PathBuf> {
        self.adapter_file.as_ref().map(|f| self.dir.join(f))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub min_length: usize,
    pub max_length: usize,
    pub no_repeat_ngram_size: usize,
    pub max_input_tokens: usize,
    pub decoder_start_token_id: u32,
    pub forced_bos_token_id: Option<u32>,
    pub eos_token_id: u32,
    pub pad_token_id: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            min_length: 40,
            max_length: 120,
            no_repeat_ngram_size: 3,
            max_input_tokens: 1024,
            decoder_start_token_id: 2,
            forced_bos_token_id: Some(0),
            eos_token_id: 2,
            pad_token_id: 1,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub accelerated_chunk_size: usize,
    pub cpu_chunk_size: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            accelerated_chunk_size: ACCELERATED_CHUNK_SIZE,
            cpu_chunk_size: CPU_CHUNK_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OcrConfig {
    pub tesseract_path: String,
    pub language: String,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract_path: "tesseract".to_string(),
            language: "eng".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub upload_dir: PathBuf,
    pub timeout_secs: u64,
    pub preview_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            upload_dir: env::temp_dir().join("legalbrief-uploads"),
            timeout_secs: 300,
            preview_chars: PREVIEW_CHARS,
        }
    }
}

impl PipelineConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub corpus_dir: PathBuf,
    pub database: PathBuf,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            corpus_dir: PathBuf::from("eval_docs"),
            database: PathBuf::from("evaluations.db"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Extra sink for every log event, for post-mortem debugging.
    pub debug_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load from an explicit path, or from the user config dir when none is given.
    /// A missing default file is not an error; a missing explicit one is.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_path() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(dir) = env::var("LEGALBRIEF_MODEL_DIR") {
            self.model.dir = PathBuf::from(dir);
        }
        if let Ok(device) = env::var("LEGALBRIEF_DEVICE") {
            self.model.device = device.parse().map_err(|value| ConfigError::Env {
                var: "LEGALBRIEF_DEVICE",
                value,
            })?;
        }
        if let Ok(path) = env::var("LEGALBRIEF_TESSERACT") {
            self.ocr.tesseract_path = path;
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("legalbrief").join(CONFIG_FILE))
}
