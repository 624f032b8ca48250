// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the ODD-Net dehazing engine.

use thiserror::Error;

use crate::types::Stage;

/// Top-level error type for all dehazing operations.
#[derive(Debug, Error)]
pub enum DehazeError {
    /// The accelerated backend could not be acquired. Never surfaced from a
    /// run — it only triggers the silent downgrade to the fallback strategy
    /// and is logged at that point.
    #[error("accelerated backend unavailable: {0}")]
    CapabilityUnavailable(String),

    /// Input bytes are not a decodable image. Fatal for the run.
    #[error("image decoding failed: {0}")]
    Decode(String),

    /// The transform step failed. Recoverable once via the fallback
    /// downgrade when raised by the accelerated path; fatal otherwise.
    #[error("transform failed: {0}")]
    Transform(String),

    /// PNG encoding of the output buffer failed. Fatal.
    #[error("result encoding failed: {0}")]
    Encode(String),

    /// A run is already in progress on this pipeline instance.
    #[error("a run is already in progress on this pipeline instance")]
    Busy,

    /// The caller cancelled the run between stages.
    #[error("run cancelled")]
    Cancelled,

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DehazeError>;

/// A failed run: the stage that was executing plus the underlying cause.
///
/// This is the single error value a run rejects with — no partial or corrupt
/// artifact is ever returned alongside it.
#[derive(Debug, Error)]
#[error("pipeline failed at {stage} stage: {source}")]
pub struct StageFailure {
    /// The stage that was executing when the run failed.
    pub stage: Stage,
    #[source]
    pub source: DehazeError,
}

impl StageFailure {
    pub fn new(stage: Stage, source: DehazeError) -> Self {
        Self { stage, source }
    }
}
