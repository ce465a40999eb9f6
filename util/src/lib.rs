#![warn(missing_docs)]

//! Provides generic utilities for noisepipe, the procedural noise pipeline library.

/// Configures log4rs for the noisepipe binary and tests.
pub mod logging;
/// Interpolation helpers and smoothing curves shared by the noise generators.
pub mod math;
/// A fixed size thread pool that runs batches of jobs against per-worker state.
pub mod threadpool;
