// config.rs — Backend configuration
//
// Everything a run can vary without touching the IR: identifier prefixes,
// naming conventions, FIFO depth, emitted include lines, and whether kernels
// carry interface pragmas. Loaded from JSON; every field has a default, so an
// empty object (or no file at all) yields the stock configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::naming::NamingConventions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HlsConfig {
    /// Kernel identifiers are `{kernel_prefix}_{target}`; the kernel header
    /// is `{kernel_prefix}.h`.
    pub kernel_prefix: String,
    /// FIFO depth of every declared stream.
    pub stream_depth: usize,
    pub naming: NamingConventions,
    /// `#include` operands for the driver, in order.
    pub driver_headers: Vec<String>,
    /// `#include` operands for the kernel header, in order.
    pub kernel_headers: Vec<String>,
    pub interface_pragmas: bool,
}

impl Default for HlsConfig {
    fn default() -> Self {
        HlsConfig {
            kernel_prefix: "hls_target".into(),
            stream_depth: 1,
            naming: NamingConventions::default(),
            driver_headers: vec![
                "<assert.h>".into(),
                "<stdint.h>".into(),
                "<algorithm>".into(),
                "<hls_stream.h>".into(),
                "\"Stencil.h\"".into(),
            ],
            kernel_headers: vec![
                "<stdint.h>".into(),
                "<algorithm>".into(),
                "<hls_stream.h>".into(),
                "\"Stencil.h\"".into(),
            ],
            interface_pragmas: true,
        }
    }
}

impl HlsConfig {
    pub fn from_json(text: &str, path: &str) -> Result<Self, ConfigError> {
        let config: HlsConfig = serde_json::from_str(text).map_err(|source| ConfigError::Json {
            path: path.to_string(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let shown = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: shown.clone(),
            source,
        })?;
        Self::from_json(&text, &shown)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stream_depth == 0 {
            return Err(ConfigError::Invalid("stream_depth must be at least 1".into()));
        }
        if self.kernel_prefix.is_empty() {
            return Err(ConfigError::Invalid("kernel_prefix must not be empty".into()));
        }
        if self.naming.region_prefix.is_empty() || self.naming.stream_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "region_prefix and stream_suffix must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn kernel_header_name(&self) -> String {
        format!("{}.h", self.kernel_prefix)
    }

    /// Compact JSON with fields in declaration order; hashed for provenance.
    pub fn canonical_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}
