// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Dehazing pipeline — orchestrates load -> resize -> transform -> encode,
// emitting fixed progress checkpoints and producing a PNG result artifact.
//
// The pipeline is synchronous and scheduler-agnostic: progress callbacks run
// on the thread driving the run. In an async context, wrap `run` in
// `tokio::task::spawn_blocking`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use image::imageops::FilterType;
use image::{ImageFormat, RgbaImage};
use oddnet_core::error::{DehazeError, Result, StageFailure};
use oddnet_core::{
    DehazeConfig, ProcessingStrategy, ProgressEvent, ResultArtifact, RunId, SourceImage, Stage,
};
use tracing::{debug, info, info_span};

use crate::capability::{self, BackendFactory, CapabilityResolver};
use crate::resize;

/// Cooperative cancellation flag for a run.
///
/// Cancellation is honoured between stages, never mid-transform: a cancelled
/// run fails with [`DehazeError::Cancelled`] at the next stage boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread, including from
    /// inside a progress callback.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Staged, cancel-safe image dehazing pipeline.
///
/// Each instance owns its strategy-resolution state: the accelerated backend
/// is probed on the first run and the outcome is cached for the instance
/// lifetime, so independent pipelines (and tests) never share capability
/// state. One run may be in flight at a time per instance; a concurrent
/// `run` is rejected with [`DehazeError::Busy`].
///
/// ```no_run
/// use oddnet_core::{DehazeConfig, SourceImage};
/// use oddnet_dehaze::DehazePipeline;
///
/// let pipeline = DehazePipeline::new(DehazeConfig::default());
/// let source = SourceImage::new(std::fs::read("hazy.jpg").unwrap(), "image/jpeg");
/// let artifact = pipeline
///     .run(&source, |event| println!("{} {}%", event.label, event.progress))
///     .expect("dehazing failed");
/// std::fs::write("dehazed.png", &artifact.png).unwrap();
/// ```
pub struct DehazePipeline {
    config: DehazeConfig,
    resolver: Mutex<CapabilityResolver>,
    in_flight: AtomicBool,
}

impl DehazePipeline {
    /// Create a pipeline using the default backend factory (the rten model
    /// when built with the `accelerated` feature, otherwise fallback-only).
    pub fn new(config: DehazeConfig) -> Self {
        Self::with_backend_factory(config, capability::default_factory())
    }

    /// Create a pipeline with an injected backend factory. Used by tests and
    /// by callers embedding their own model runtime.
    pub fn with_backend_factory(config: DehazeConfig, factory: BackendFactory) -> Self {
        Self {
            config,
            resolver: Mutex::new(CapabilityResolver::new(factory)),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &DehazeConfig {
        &self.config
    }

    /// The strategy resolved so far, if any run has resolved one. Reported
    /// after any downgrade, so observers can assert on degradation.
    pub fn strategy(&self) -> Option<ProcessingStrategy> {
        self.resolver
            .lock()
            .expect("resolver lock poisoned")
            .strategy()
    }

    /// Process one source image to a PNG artifact.
    ///
    /// Equivalent to [`run_cancellable`](Self::run_cancellable) with a token
    /// that is never cancelled.
    pub fn run(
        &self,
        source: &SourceImage,
        on_progress: impl FnMut(ProgressEvent),
    ) -> std::result::Result<ResultArtifact, StageFailure> {
        self.run_cancellable(source, &CancelToken::new(), on_progress)
    }

    /// Process one source image, honouring `cancel` at stage boundaries.
    ///
    /// Progress callbacks execute synchronously on the calling thread at the
    /// fixed checkpoints (10/30/60/90/100); callers must not block for long
    /// inside the callback. On failure the run rejects with a single
    /// [`StageFailure`] naming the stage and cause; no partial artifact is
    /// ever returned. All intermediate buffers are dropped on every exit
    /// path.
    pub fn run_cancellable(
        &self,
        source: &SourceImage,
        cancel: &CancelToken,
        mut on_progress: impl FnMut(ProgressEvent),
    ) -> std::result::Result<ResultArtifact, StageFailure> {
        let _slot = self
            .acquire_run_slot()
            .map_err(|err| StageFailure::new(Stage::Initializing, err))?;

        let run_id = RunId::new();
        let span = info_span!(
            "dehaze_run",
            run_id = %run_id,
            source_hash = source.content_hash(),
            source_bytes = source.len(),
        );
        let _entered = span.enter();

        let mut resolver = self.resolver.lock().expect("resolver lock poisoned");

        // Initializing: resolve (or recall) the strategy. Probe failures
        // degrade silently to the fallback — never surfaced to the caller.
        ensure_live(cancel, Stage::Initializing)?;
        let resolved = resolver.resolve(&self.config, &mut |event| on_progress(event));
        debug!(strategy = %resolved, "strategy resolved");

        // Decoding: fatal on undecodable bytes, no retry.
        ensure_live(cancel, Stage::Decoding)?;
        let decoded = image::load_from_memory(source.bytes()).map_err(|err| {
            StageFailure::new(Stage::Decoding, DehazeError::Decode(err.to_string()))
        })?;
        info!(
            width = decoded.width(),
            height = decoded.height(),
            media_type = source.media_type(),
            "source image decoded"
        );

        // Resizing: bound the working raster, preserving aspect ratio.
        ensure_live(cancel, Stage::Resizing)?;
        emit(&mut on_progress, Stage::Resizing);
        let (orig_w, orig_h) = (decoded.width(), decoded.height());
        let (target_w, target_h) =
            resize::target_dimensions(orig_w, orig_h, self.config.max_dimension);
        let working: RgbaImage = if (target_w, target_h) != (orig_w, orig_h) {
            debug!(target_w, target_h, "downscaling working raster");
            decoded
                .resize_exact(target_w, target_h, FilterType::Lanczos3)
                .to_rgba8()
        } else {
            decoded.to_rgba8()
        };
        drop(decoded);

        // Transforming: one accelerated attempt; on a recoverable failure
        // the resolver downgrades the instance and retries with fallback.
        ensure_live(cancel, Stage::Transforming)?;
        emit(&mut on_progress, Stage::Transforming);
        let (output, strategy_used) = resolver
            .transform(&working)
            .map_err(|err| StageFailure::new(Stage::Transforming, err))?;
        drop(working);

        // Encoding: PNG at fixed settings. The configured quality knob is
        // accepted for contract compatibility; PNG encoding ignores it.
        ensure_live(cancel, Stage::Encoding)?;
        emit(&mut on_progress, Stage::Encoding);
        let png = encode_png(&output)
            .map_err(|err| StageFailure::new(Stage::Encoding, err))?;
        let (width, height) = output.dimensions();
        drop(output);

        emit(&mut on_progress, Stage::Complete);
        info!(
            width,
            height,
            strategy = %strategy_used,
            png_bytes = png.len(),
            "run complete"
        );

        Ok(ResultArtifact {
            run_id,
            png,
            width,
            height,
            strategy: strategy_used,
            source_hash: source.content_hash().to_string(),
            completed_at: Utc::now(),
        })
    }

    fn acquire_run_slot(&self) -> Result<RunSlot<'_>> {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DehazeError::Busy);
        }
        Ok(RunSlot {
            flag: &self.in_flight,
        })
    }
}

/// RAII guard for the single-run-in-flight slot; released on every exit path.
struct RunSlot<'a> {
    flag: &'a AtomicBool,
}

impl Drop for RunSlot<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn emit(on_progress: &mut impl FnMut(ProgressEvent), stage: Stage) {
    if let Some(event) = ProgressEvent::at_stage(stage) {
        on_progress(event);
    }
}

fn ensure_live(cancel: &CancelToken, stage: Stage) -> std::result::Result<(), StageFailure> {
    if cancel.is_cancelled() {
        info!(%stage, "run cancelled");
        return Err(StageFailure::new(stage, DehazeError::Cancelled));
    }
    Ok(())
}

/// Encode an RGBA buffer into PNG bytes.
fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| DehazeError::Encode(err.to_string()))?;
    Ok(buffer)
}
