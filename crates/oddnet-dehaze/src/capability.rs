// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Capability resolution — picks the processing strategy for a pipeline
// instance and caches it for the instance lifetime.
//
// Probe failures are never propagated to the caller: the resolver logs the
// degradation and settles on the fallback strategy. A downgrade is permanent
// for the instance — there is no per-call re-probing.

use image::RgbaImage;
use oddnet_core::error::{DehazeError, Result};
use oddnet_core::{DehazeConfig, ProcessingStrategy, ProgressEvent, Stage};
use tracing::{debug, info, warn};

use crate::model::ModelBackend;
use crate::transform;

/// Constructor for the accelerated backend, injected so tests can count
/// probe attempts and simulate failures. The default factory loads the
/// feature-gated rten model.
pub type BackendFactory =
    Box<dyn Fn(&DehazeConfig) -> Result<Box<dyn ModelBackend>> + Send + Sync>;

/// The factory used by `DehazePipeline::new` — loads the rten model when the
/// `accelerated` feature is enabled, otherwise reports the capability as
/// unavailable so the resolver degrades to the fallback strategy.
pub fn default_factory() -> BackendFactory {
    #[cfg(feature = "accelerated")]
    {
        use crate::model::{ModelConfig, RtenModel};
        Box::new(|config: &DehazeConfig| {
            let model_config = ModelConfig::from_dehaze_config(config);
            let model = RtenModel::load(&model_config)?;
            Ok(Box::new(model) as Box<dyn ModelBackend>)
        })
    }
    #[cfg(not(feature = "accelerated"))]
    {
        Box::new(|_config: &DehazeConfig| {
            Err(DehazeError::CapabilityUnavailable(
                "built without the 'accelerated' feature".into(),
            ))
        })
    }
}

/// The strategy a resolver has settled on, carrying the live backend for the
/// accelerated case.
pub enum ResolvedStrategy {
    Accelerated(Box<dyn ModelBackend>),
    Fallback,
}

impl ResolvedStrategy {
    pub fn kind(&self) -> ProcessingStrategy {
        match self {
            Self::Accelerated(_) => ProcessingStrategy::Accelerated,
            Self::Fallback => ProcessingStrategy::Fallback,
        }
    }
}

impl std::fmt::Debug for ResolvedStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ResolvedStrategy::{}", self.kind())
    }
}

/// Resolves and caches the processing strategy for one pipeline instance.
pub struct CapabilityResolver {
    factory: BackendFactory,
    resolved: Option<ResolvedStrategy>,
}

impl CapabilityResolver {
    pub fn new(factory: BackendFactory) -> Self {
        Self {
            factory,
            resolved: None,
        }
    }

    /// Resolver backed by the default (feature-gated) model factory.
    pub fn with_default_backend() -> Self {
        Self::new(default_factory())
    }

    /// Resolve the strategy, probing the backend factory at most once for
    /// the lifetime of this resolver. Emits the `Initializing` progress
    /// checkpoint through `on_progress` on every call, resolved or not.
    pub fn resolve(
        &mut self,
        config: &DehazeConfig,
        on_progress: &mut dyn FnMut(ProgressEvent),
    ) -> ProcessingStrategy {
        if let Some(event) = ProgressEvent::at_stage(Stage::Initializing) {
            on_progress(event);
        }

        if self.resolved.is_none() {
            match (self.factory)(config) {
                Ok(backend) => {
                    info!(backend = backend.name(), "accelerated backend ready");
                    self.resolved = Some(ResolvedStrategy::Accelerated(backend));
                }
                Err(err) => {
                    warn!(
                        error = %err,
                        "accelerated backend unavailable — using fallback strategy"
                    );
                    self.resolved = Some(ResolvedStrategy::Fallback);
                }
            }
        } else {
            debug!("strategy already resolved — skipping probe");
        }

        self.strategy().unwrap_or(ProcessingStrategy::Fallback)
    }

    /// The strategy resolved so far, if any. `None` before the first run.
    pub fn strategy(&self) -> Option<ProcessingStrategy> {
        self.resolved.as_ref().map(ResolvedStrategy::kind)
    }

    /// Run the transform step under the resolved strategy.
    ///
    /// A recoverable failure of the accelerated backend (execution error or
    /// a wrong-size output) permanently downgrades this resolver to the
    /// fallback strategy and retries the transform once with it. Returns the
    /// fresh output buffer and the strategy that actually produced it.
    pub fn transform(&mut self, input: &RgbaImage) -> Result<(RgbaImage, ProcessingStrategy)> {
        let accelerated = match &self.resolved {
            Some(ResolvedStrategy::Accelerated(backend)) => {
                Some(backend.enhance(input).and_then(|out| {
                    if out.dimensions() == input.dimensions() {
                        Ok(out)
                    } else {
                        Err(DehazeError::Transform(format!(
                            "backend returned {:?}, expected {:?}",
                            out.dimensions(),
                            input.dimensions()
                        )))
                    }
                }))
            }
            _ => None,
        };

        match accelerated {
            Some(Ok(output)) => Ok((output, ProcessingStrategy::Accelerated)),
            Some(Err(err)) => {
                warn!(
                    error = %err,
                    "accelerated transform failed — downgrading instance to fallback"
                );
                self.resolved = Some(ResolvedStrategy::Fallback);
                Ok((transform::dehaze_fallback(input), ProcessingStrategy::Fallback))
            }
            None => Ok((transform::dehaze_fallback(input), ProcessingStrategy::Fallback)),
        }
    }
}
