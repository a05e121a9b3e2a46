//! Harness configuration
//!
//! Every field has a default, so an empty JSON object (or no file at all)
//! runs the full suite.
//!
//! ```json
//! {
//!   "kinds": ["i32", "f64", "char"],
//!   "fail_fast": true,
//!   "string": { "input": "Hello", "capacity": 64 }
//! }
//! ```

use marshal_abi::{ScalarKind, GREETING_SUFFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// Kinds to exercise, in order.
    pub kinds: Vec<ScalarKind>,
    /// Check export names and signatures before running any case.
    pub validate_exports: bool,
    /// Stop at the first failing case.
    pub fail_fast: bool,
    pub string: StringCase,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            kinds: ScalarKind::ALL.to_vec(),
            validate_exports: true,
            fail_fast: false,
            string: StringCase::default(),
        }
    }
}

/// Input for the string append checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StringCase {
    pub input: String,
    /// Buffer size for the basic append check, terminator included.
    pub capacity: usize,
}

impl Default for StringCase {
    fn default() -> Self {
        Self {
            input: "Hello".to_string(),
            capacity: 64,
        }
    }
}

impl StringCase {
    /// Smallest capacity that fits the input, the suffix and the terminator.
    pub fn required_capacity(&self) -> usize {
        self.input.len() + GREETING_SUFFIX.len() + 1
    }
}

impl HarnessConfig {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: HarnessConfig = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.kinds.is_empty() {
            return Err(ConfigError::Invalid("no kinds selected".into()));
        }
        if self.string.input.contains('\0') {
            return Err(ConfigError::Invalid(
                "string.input must not contain NUL".into(),
            ));
        }
        if self.string.capacity < self.string.required_capacity() {
            return Err(ConfigError::Invalid(format!(
                "string.capacity {} is below the {} bytes the append needs",
                self.string.capacity,
                self.string.required_capacity()
            )));
        }
        Ok(())
    }
}
