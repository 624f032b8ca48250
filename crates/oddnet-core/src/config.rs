// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Default bound on the longer edge of the working raster, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Default encoder quality. PNG encoding ignores it, but the knob is part of
/// the pipeline contract and is accepted and recorded.
pub const DEFAULT_PNG_QUALITY: f32 = 0.95;

/// Tuning knobs for a dehazing pipeline instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DehazeConfig {
    /// Inputs with either edge above this are scaled down uniformly so the
    /// longer edge equals it; smaller inputs pass through unchanged.
    pub max_dimension: u32,
    /// Encoder quality in `0.0..=1.0`. A no-op for PNG output.
    pub png_quality: f32,
    /// Explicit path to the accelerated model file (`.rten`). When `None`,
    /// the backend looks in the default model cache directory.
    pub model_path: Option<PathBuf>,
}

impl Default for DehazeConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            png_quality: DEFAULT_PNG_QUALITY,
            model_path: None,
        }
    }
}

impl DehazeConfig {
    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&data)?)
    }

    /// Persist the config to a JSON file (pretty-printed).
    pub fn persist(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        Ok(())
    }
}
