// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Accelerated model backend for the dehazing pipeline.
//
// The pipeline treats the model as an opaque capability: same-size RGBA
// buffer in and out, recoverable errors on execution failure. The concrete
// implementation runs an image-to-image network via the `rten` inference
// engine and is only available when the `accelerated` feature is enabled:
//
// ```toml
// oddnet-dehaze = { path = "crates/oddnet-dehaze", features = ["accelerated"] }
// ```
//
// # Model Setup
//
// The engine expects a single `.rten` model file (`oddnet-dehaze.rten`) with
// one NCHW float input and one NCHW float output, both normalised to 0..1.
// The default location follows the XDG Base Directory specification:
// `$XDG_CACHE_HOME/oddnet` (typically `~/.cache/oddnet`), overridable via
// `DehazeConfig::model_path`.

use std::path::PathBuf;

use image::RgbaImage;
use oddnet_core::error::{DehazeError, Result};
use oddnet_core::DehazeConfig;

/// Well-known filename of the dehazing model.
pub const MODEL_FILENAME: &str = "oddnet-dehaze.rten";

/// Default directory for the cached model file.
///
/// `$XDG_CACHE_HOME/oddnet`, falling back to `~/.cache/oddnet` when
/// `XDG_CACHE_HOME` is unset.
fn default_model_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CACHE_HOME") {
        PathBuf::from(xdg).join("oddnet")
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".cache").join("oddnet")
    } else {
        // Last resort — current directory.
        PathBuf::from("oddnet-models")
    }
}

/// An opaque model-execution backend.
///
/// Implementations must honour the transform contract: the output buffer has
/// the same dimensions as the input, the input is never mutated, and any
/// execution failure is reported as a recoverable [`DehazeError::Transform`]
/// rather than a panic. The pipeline responds to such a failure by
/// downgrading the run to the fallback strategy.
pub trait ModelBackend: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Run the model on a decoded raster, producing a fresh same-size buffer.
    fn enhance(&self, input: &RgbaImage) -> Result<RgbaImage>;
}

/// Location of the accelerated model file.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Path to the `.rten` model file.
    pub model_path: PathBuf,
}

impl Default for ModelConfig {
    /// Returns a config pointing at the default model cache directory.
    fn default() -> Self {
        Self {
            model_path: default_model_dir().join(MODEL_FILENAME),
        }
    }
}

impl ModelConfig {
    /// Create a config pointing at a specific model file.
    pub fn from_path(model_path: impl Into<PathBuf>) -> Self {
        Self {
            model_path: model_path.into(),
        }
    }

    /// Derive the model location from a pipeline config, using the default
    /// cache directory when no explicit path is set.
    pub fn from_dehaze_config(config: &DehazeConfig) -> Self {
        match &config.model_path {
            Some(path) => Self::from_path(path.clone()),
            None => Self::default(),
        }
    }

    /// Verify that the model file exists before attempting to load it.
    pub fn validate(&self) -> Result<()> {
        if !self.model_path.exists() {
            return Err(DehazeError::CapabilityUnavailable(format!(
                "model not found at {}; place {} there or set DehazeConfig::model_path",
                self.model_path.display(),
                MODEL_FILENAME,
            )));
        }
        Ok(())
    }
}

/// Check whether the model file is present for the given pipeline config.
///
/// Convenience for status surfaces that want to predict which strategy a
/// pipeline will resolve to without constructing one.
pub fn model_available(config: &DehazeConfig) -> bool {
    ModelConfig::from_dehaze_config(config).model_path.exists()
}

/// Return the default model directory path (for display in diagnostics).
pub fn model_directory() -> PathBuf {
    default_model_dir()
}

#[cfg(feature = "accelerated")]
pub use accelerated::RtenModel;

#[cfg(feature = "accelerated")]
mod accelerated {
    use super::*;

    use rten::Model;
    use rten_tensor::prelude::*;
    use rten_tensor::NdTensor;
    use tracing::{debug, info, instrument};

    /// Dehazing model executed via the `rten` inference engine.
    ///
    /// Model loading is the expensive step — the capability resolver loads it
    /// once per pipeline instance and reuses it for every run.
    ///
    /// **Important:** `rten` must be compiled in release mode. Debug builds
    /// will be extremely slow (10-100x slower).
    pub struct RtenModel {
        model: Model,
    }

    impl RtenModel {
        /// Load the model from the path given in `config`.
        ///
        /// # Errors
        ///
        /// Returns [`DehazeError::CapabilityUnavailable`] if the model file
        /// is missing or corrupt — the caller is expected to degrade to the
        /// fallback strategy, not to abort.
        #[instrument(skip_all, fields(path = %config.model_path.display()))]
        pub fn load(config: &ModelConfig) -> Result<Self> {
            config.validate()?;

            info!("Loading dehazing model");
            let model = Model::load_file(&config.model_path).map_err(|err| {
                DehazeError::CapabilityUnavailable(format!(
                    "failed to load model from {}: {}",
                    config.model_path.display(),
                    err
                ))
            })?;

            info!("Dehazing model loaded");
            Ok(Self { model })
        }
    }

    impl ModelBackend for RtenModel {
        fn name(&self) -> &str {
            "rten"
        }

        /// Run one inference pass: RGBA -> normalised NCHW float tensor ->
        /// model -> RGBA, with alpha restored from the input.
        fn enhance(&self, input: &RgbaImage) -> Result<RgbaImage> {
            let (width, height) = input.dimensions();
            let (w, h) = (width as usize, height as usize);

            let mut tensor = NdTensor::<f32, 4>::zeros([1, 3, h, w]);
            for (x, y, px) in input.enumerate_pixels() {
                let (x, y) = (x as usize, y as usize);
                for c in 0..3 {
                    tensor[[0, c, y, x]] = px.0[c] as f32 / 255.0;
                }
            }

            let output = self
                .model
                .run_one(tensor.view().into(), None)
                .map_err(|err| DehazeError::Transform(format!("model execution failed: {err}")))?;

            let output: NdTensor<f32, 4> = output.try_into().map_err(|_| {
                DehazeError::Transform("model output is not a rank-4 float tensor".into())
            })?;

            if output.shape() != [1, 3, h, w] {
                return Err(DehazeError::Transform(format!(
                    "model output shape {:?} does not match input {}x{}",
                    output.shape(),
                    width,
                    height
                )));
            }

            let mut result = RgbaImage::new(width, height);
            for (x, y, px) in result.enumerate_pixels_mut() {
                let (xi, yi) = (x as usize, y as usize);
                for c in 0..3 {
                    px.0[c] = (output[[0, c, yi, xi]] * 255.0).round().clamp(0.0, 255.0) as u8;
                }
                px.0[3] = input.get_pixel(x, y).0[3];
            }

            debug!(width, height, "accelerated transform applied");
            Ok(result)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_points_to_cache_dir() {
        let config = ModelConfig::default();
        let path_str = config.model_path.to_string_lossy();
        // Should end with the expected filename regardless of platform.
        assert!(
            path_str.ends_with(MODEL_FILENAME),
            "model path should end with {MODEL_FILENAME}, got {path_str}"
        );
    }

    #[test]
    fn config_from_path() {
        let config = ModelConfig::from_path("/models/custom.rten");
        assert_eq!(config.model_path, PathBuf::from("/models/custom.rten"));
    }

    #[test]
    fn dehaze_config_override_wins() {
        let pipeline_config = DehazeConfig {
            model_path: Some(PathBuf::from("/opt/oddnet/oddnet-dehaze.rten")),
            ..Default::default()
        };
        let config = ModelConfig::from_dehaze_config(&pipeline_config);
        assert_eq!(
            config.model_path,
            PathBuf::from("/opt/oddnet/oddnet-dehaze.rten")
        );
    }

    #[test]
    fn validate_missing_model_is_capability_error() {
        let config = ModelConfig::from_path("/nonexistent/path/oddnet-dehaze.rten");
        let result = config.validate();
        assert!(matches!(
            result,
            Err(DehazeError::CapabilityUnavailable(_))
        ));
    }

    #[test]
    fn model_available_false_for_missing_override() {
        let config = DehazeConfig {
            model_path: Some(PathBuf::from("/nonexistent/oddnet.rten")),
            ..Default::default()
        };
        assert!(!model_available(&config));
    }
}
