use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

use crate::config::loader::deserialize_non_empty_string;
use crate::error::{CommonError, CommonResult};

const DEFAULT_CONFIG: &str = include_str!("default.toml");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartitionReaderConfig {
    pub stream: StreamConfig,
    pub text: TextConfig,
}

impl PartitionReaderConfig {
    pub fn load() -> CommonResult<Self> {
        Self::load_with("")
    }

    /// Loads the configuration with an additional TOML document merged
    /// on top of the defaults. Environment variables still take precedence.
    pub fn load_with(overrides: &str) -> CommonResult<Self> {
        Figment::from(Toml::string(DEFAULT_CONFIG))
            .admerge(Toml::string(overrides))
            .admerge(Self::env())
            .extract::<Self>()?
            .validated()
    }

    fn env() -> Env {
        Env::prefixed("SAIL__").map(|p| p.as_str().replace("__", ".").into())
    }

    fn validated(self) -> CommonResult<Self> {
        if self.stream.buffer_size == 0 {
            return Err(CommonError::invalid("stream.buffer_size must be positive"));
        }
        if self.text.read_buffer_size == 0 {
            return Err(CommonError::invalid(
                "text.read_buffer_size must be positive",
            ));
        }
        if self.text.max_partition_bytes == 0 {
            return Err(CommonError::invalid(
                "text.max_partition_bytes must be positive",
            ));
        }
        self.text.line_sep_byte()?;
        Ok(self)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub buffer_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextConfig {
    pub read_buffer_size: usize,
    #[serde(deserialize_with = "deserialize_non_empty_string")]
    pub line_sep: Option<String>,
    pub max_partition_bytes: u64,
}

impl TextConfig {
    /// Returns the custom line separator, if one is configured.
    pub fn line_sep_byte(&self) -> CommonResult<Option<u8>> {
        match self.line_sep.as_deref() {
            None => Ok(None),
            Some(sep) => match sep.as_bytes() {
                [b] => Ok(Some(*b)),
                _ => Err(CommonError::unsupported(format!(
                    "text.line_sep must be a single byte: {sep:?}"
                ))),
            },
        }
    }
}
