#![warn(missing_docs)]

//! Procedural noise pipelines.
//!
//! Noise is described by a [`ModuleGraph`], a directed acyclic graph of generator, transform and
//! combinator modules. A graph is compiled into a [`Pipeline`] of flat elements which are evaluated
//! with a per-coordinate memo [`Cache`], so a module shared by several parents is only computed once
//! per coordinate. Bulk evaluation, such as filling a plane with [`PlaneBuilder2D`], can be spread over
//! a [`ThreadedPipeline`] whose workers each own a private cache.
//!
//! ```
//! use noisepipe::{ModuleGraph, ModuleKind, Pipeline2D};
//!
//! let mut graph = ModuleGraph::new();
//! let perlin = graph.add(ModuleKind::perlin());
//! let offset = graph.add(ModuleKind::Constant { value: 0.5 });
//! let sum = graph.add(ModuleKind::Addition);
//! graph.set_source_module(sum, 0, perlin).unwrap();
//! graph.set_source_module(sum, 1, offset).unwrap();
//!
//! let mut pipeline = Pipeline2D::new();
//! let root = pipeline.add_module(&graph, sum).unwrap();
//! let mut cache = pipeline.create_cache();
//! let value = pipeline.get_value(root, &[1.2, 0.2], &mut cache);
//! assert!(value.is_finite());
//! ```

/// Plane builder filling row-major buffers from a module graph.
pub mod builder;
/// Render configuration used by the `noisepipe` binary.
pub mod config;
mod error;
/// Scalar noise primitives.
pub mod generator;
/// Binary pipeline stream reading and writing.
pub mod io;
/// The module graph and module kinds.
pub mod module;
/// Compiled pipelines, caches, jobs and the threaded pipeline.
pub mod pipeline;

pub use builder::{Bounds, PlaneBuilder2D};
pub use error::*;
pub use generator::Quality;
pub use module::{Module, ModuleGraph, ModuleId, ModuleKind, ModuleType};
pub use pipeline::{
    Cache,
    Dim1,
    Dim2,
    Dim3,
    Dimension,
    Element,
    ElementId,
    LineJob,
    Pipeline,
    Pipeline1D,
    Pipeline2D,
    Pipeline3D,
    PipelineJob,
    SeamlessLineJob,
    ThreadedPipeline,
};

/// The real number type used for coordinates, parameters and noise values.
#[cfg(not(feature = "single-precision"))]
pub type Real = f64;

/// The real number type used for coordinates, parameters and noise values.
#[cfg(feature = "single-precision")]
pub type Real = f32;
