// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the ODD-Net dehazing engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Unique identifier for a single pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The execution path chosen for the transform step.
///
/// Resolved once per pipeline instance and cached for its lifetime. Once the
/// accelerated path has failed (at initialization or mid-run), the instance
/// permanently uses `Fallback` — there is no per-call re-probing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessingStrategy {
    /// Hardware-accelerated model execution via the optional rten backend.
    Accelerated,
    /// Deterministic per-pixel contrast/tint adjustment.
    Fallback,
}

impl std::fmt::Display for ProcessingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accelerated => f.write_str("accelerated"),
            Self::Fallback => f.write_str("fallback"),
        }
    }
}

/// Pipeline stages, in execution order.
///
/// `Failed` is reachable from any non-terminal stage; it never appears in
/// progress events, only in [`StageFailure`](crate::error::StageFailure).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    Initializing,
    Decoding,
    Resizing,
    Transforming,
    Encoding,
    Complete,
}

impl Stage {
    /// The fixed progress checkpoint emitted when this stage begins, as
    /// `(label, percent)`. `Decoding` has no checkpoint of its own — the
    /// run reports 10% while the model loads and next at 30% once the
    /// decoded raster is being resized.
    pub fn checkpoint(&self) -> Option<(&'static str, u8)> {
        match self {
            Self::Initializing => Some(("Loading dehazing model...", 10)),
            Self::Decoding => None,
            Self::Resizing => Some(("Processing image...", 30)),
            Self::Transforming => Some(("Applying dehazing algorithm...", 60)),
            Self::Encoding => Some(("Finalizing result...", 90)),
            Self::Complete => Some(("Complete!", 100)),
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Initializing => "initializing",
            Self::Decoding => "decoding",
            Self::Resizing => "resizing",
            Self::Transforming => "transforming",
            Self::Encoding => "encoding",
            Self::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// A progress checkpoint reported to the caller.
///
/// Within one run the `progress` values are strictly non-decreasing, and the
/// final event of a successful run always carries `progress == 100`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Which pipeline stage is beginning.
    pub stage: Stage,
    /// Human-readable description of the stage.
    pub label: String,
    /// Completion percentage in `0..=100`.
    pub progress: u8,
}

impl ProgressEvent {
    /// Build the checkpoint event for a stage, if the stage has one.
    pub fn at_stage(stage: Stage) -> Option<Self> {
        stage.checkpoint().map(|(label, progress)| Self {
            stage,
            label: label.to_string(),
            progress,
        })
    }
}

/// Advisory upper bound on source image size, in bytes (10 MB).
///
/// Enforced by the upload collaborator, not by the pipeline itself — the
/// pipeline will attempt to decode whatever it is handed.
pub const SOURCE_SIZE_ADVISORY_LIMIT: usize = 10 * 1024 * 1024;

/// A user-submitted raster image, immutable once accepted.
///
/// The pipeline only borrows a `SourceImage` for the duration of one run;
/// ownership stays with the caller.
#[derive(Debug, Clone)]
pub struct SourceImage {
    data: Vec<u8>,
    media_type: String,
    /// SHA-256 of `data`, hex-encoded. Computed at construction and recorded
    /// on the result artifact for provenance.
    content_hash: String,
}

impl SourceImage {
    /// Accept raw encoded bytes with their declared MIME type (`image/*`).
    pub fn new(data: Vec<u8>, media_type: impl Into<String>) -> Self {
        let content_hash = hex::encode(Sha256::digest(&data));
        Self {
            data,
            media_type: media_type.into(),
            content_hash,
        }
    }

    /// The raw encoded bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Size of the encoded payload in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The declared MIME type (e.g. `image/jpeg`). Informational only — the
    /// decoder sniffs the actual format from the bytes.
    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    /// Hex-encoded SHA-256 of the payload.
    pub fn content_hash(&self) -> &str {
        &self.content_hash
    }
}

/// The final encoded output of a successful run.
///
/// Produced exactly once per run; ownership transfers to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultArtifact {
    /// Identifier of the run that produced this artifact.
    pub run_id: RunId,
    /// PNG-encoded image bytes.
    pub png: Vec<u8>,
    /// Output raster width in pixels.
    pub width: u32,
    /// Output raster height in pixels.
    pub height: u32,
    /// Which strategy actually produced the pixels (after any downgrade).
    pub strategy: ProcessingStrategy,
    /// SHA-256 of the source image bytes this artifact was derived from.
    pub source_hash: String,
    /// When the run completed.
    pub completed_at: DateTime<Utc>,
}
