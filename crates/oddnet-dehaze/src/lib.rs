// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// oddnet-dehaze — Staged image dehazing pipeline for the ODD-Net engine.
//
// Provides capability resolution (accelerated model vs. deterministic
// fallback), a bounded resize policy, the per-pixel transform engine, and the
// orchestrating pipeline that reports progress checkpoints and produces a
// PNG result artifact.

pub mod capability;
pub mod model;
pub mod pipeline;
pub mod resize;
pub mod transform;

// Re-export the primary types so callers can use `oddnet_dehaze::DehazePipeline` etc.
pub use capability::{BackendFactory, CapabilityResolver, ResolvedStrategy};
pub use model::ModelBackend;
pub use pipeline::{CancelToken, DehazePipeline};

#[cfg(feature = "accelerated")]
pub use model::RtenModel;
