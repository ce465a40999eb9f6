use crate::{generator::InvalidQuality, module::ModuleId, Real};
use noisepipe_util::threadpool::BatchError;
use std::{
    error::Error,
    fmt::{self, Display, Formatter},
    io::Error as IoError,
};

/// Errors raised while editing or validating a [`ModuleGraph`](crate::ModuleGraph).
#[derive(Debug, Clone, PartialEq)]
pub enum GraphError {
    /// The id does not belong to a module of this graph.
    UnknownModule(ModuleId),
    /// The module kind has fewer source slots than the requested slot.
    InvalidSlot {
        /// The module whose source was being set
        module: ModuleId,
        /// The requested slot
        slot: usize,
        /// The number of source slots of the module's kind
        source_count: usize,
    },
    /// A module cannot be its own source.
    SelfReference(ModuleId),
    /// The assignment would make `module` a transitive source of itself.
    Cycle {
        /// The module whose source was being set
        module: ModuleId,
        /// The rejected source
        source: ModuleId,
    },
    /// A required source slot is empty.
    MissingSource {
        /// The module with the empty slot
        module: ModuleId,
        /// The empty slot
        slot: usize,
    },
    /// A module's parameters are invalid.
    Param {
        /// The offending module
        module: ModuleId,
        /// What is wrong with it
        error: ParamError,
    },
}

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            GraphError::UnknownModule(id) => write!(f, "Unknown module {}", id),
            GraphError::InvalidSlot {
                module,
                slot,
                source_count,
            } => write!(
                f,
                "Module {} has {} source slots, cannot set slot {}",
                module, source_count, slot
            ),
            GraphError::SelfReference(id) => write!(f, "Module {} cannot be its own source", id),
            GraphError::Cycle { module, source } => write!(
                f,
                "Using module {} as a source of module {} would create a cycle",
                source, module
            ),
            GraphError::MissingSource { module, slot } =>
                write!(f, "Module {} has no source module in slot {}", module, slot),
            GraphError::Param { module, error } => write!(f, "Module {}: {}", module, error),
        }
    }
}

impl Error for GraphError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GraphError::Param { error, .. } => Some(error),
            _ => None,
        }
    }
}

/// Invalid module parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamError {
    /// A curve or terrace has fewer control points than it needs.
    TooFewControlPoints {
        /// The minimum number of points
        required: usize,
        /// The number of points present
        found: usize,
    },
    /// Two control points share the same position.
    DuplicateControlPoint(Real),
    /// Octave counts must lie in `1 ..= MAX_OCTAVES`.
    OctaveCount(i32),
    /// A parameter that must be positive or non-negative is not.
    OutOfRange {
        /// The parameter name
        name: &'static str,
        /// The rejected value
        value: Real,
    },
    /// A lower bound is not below its upper bound.
    InvertedBounds {
        /// The lower bound
        lower: Real,
        /// The upper bound
        upper: Real,
    },
    /// An integer does not name a noise quality.
    Quality(InvalidQuality),
}

impl Display for ParamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParamError::TooFewControlPoints { required, found } => write!(
                f,
                "At least {} control points are required, found {}",
                required, found
            ),
            ParamError::DuplicateControlPoint(position) =>
                write!(f, "Duplicate control point at {}", position),
            ParamError::OctaveCount(count) => write!(f, "Invalid octave count {}", count),
            ParamError::OutOfRange { name, value } =>
                write!(f, "Parameter {} is out of range: {}", name, value),
            ParamError::InvertedBounds { lower, upper } => write!(
                f,
                "Lower bound {} must be less than upper bound {}",
                lower, upper
            ),
            ParamError::Quality(error) => Display::fmt(error, f),
        }
    }
}

impl Error for ParamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ParamError::Quality(error) => Some(error),
            _ => None,
        }
    }
}

impl From<InvalidQuality> for ParamError {
    fn from(x: InvalidQuality) -> Self {
        ParamError::Quality(x)
    }
}

/// Errors raised while compiling modules into a pipeline or running its jobs.
#[derive(Debug)]
pub enum PipelineError {
    /// The id does not belong to a module of the graph being compiled.
    UnknownModule(ModuleId),
    /// A required source slot is empty.
    MissingSource {
        /// The module with the empty slot
        module: ModuleId,
        /// The empty slot
        slot: usize,
    },
    /// A module's parameters cannot be compiled.
    Param {
        /// The offending module
        module: ModuleId,
        /// What is wrong with it
        error: ParamError,
    },
    /// The worker threads could not be spawned.
    ThreadPool(IoError),
    /// A batch of jobs failed.
    Batch(BatchError),
}

impl Display for PipelineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::UnknownModule(id) => write!(f, "Unknown module {}", id),
            PipelineError::MissingSource { module, slot } =>
                write!(f, "Module {} has no source module in slot {}", module, slot),
            PipelineError::Param { module, error } => write!(f, "Module {}: {}", module, error),
            PipelineError::ThreadPool(error) =>
                write!(f, "Failed to start pipeline workers: {}", error),
            PipelineError::Batch(error) => write!(f, "Pipeline jobs failed: {}", error),
        }
    }
}

impl Error for PipelineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            PipelineError::Param { error, .. } => Some(error),
            PipelineError::ThreadPool(error) => Some(error),
            PipelineError::Batch(error) => Some(error),
            _ => None,
        }
    }
}

impl From<BatchError> for PipelineError {
    fn from(x: BatchError) -> Self {
        PipelineError::Batch(x)
    }
}

/// Errors raised by the plane builder.
#[derive(Debug)]
pub enum BuildError {
    /// The builder was configured with unusable dimensions or bounds.
    InvalidParameter(String),
    /// Compiling or evaluating the module graph failed.
    Pipeline(PipelineError),
}

impl Display for BuildError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::InvalidParameter(msg) => write!(f, "Invalid builder parameter: {}", msg),
            BuildError::Pipeline(error) => Display::fmt(error, f),
        }
    }
}

impl Error for BuildError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BuildError::Pipeline(error) => Some(error),
            _ => None,
        }
    }
}

impl From<PipelineError> for BuildError {
    fn from(x: PipelineError) -> Self {
        BuildError::Pipeline(x)
    }
}

/// Errors raised while reading or writing a pipeline stream.
#[derive(Debug)]
pub enum StreamError {
    /// The underlying reader or writer failed.
    StdIo(IoError),
    /// The stream was written by an unsupported format version.
    WrongVersion {
        /// The version this library reads
        expected: u8,
        /// The version found in the stream
        found: u8,
    },
    /// The stream names a module type that is not registered.
    UnknownModuleType(u16),
    /// A source slot refers to a module id past the end of the stream.
    DanglingReference {
        /// The stream id of the module owning the slot
        module: u16,
        /// The slot
        slot: usize,
        /// The referenced id
        child: u16,
    },
    /// A module parameter in the stream is invalid.
    InvalidParameter(ParamError),
    /// The graph could not be wired or does not form a complete pipeline.
    Graph(GraphError),
    /// The graph has more modules than the format can address.
    TooManyModules(usize),
    /// The stream contains no modules.
    Empty,
}

impl Display for StreamError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::StdIo(error) => Display::fmt(error, f),
            StreamError::WrongVersion { expected, found } => write!(
                f,
                "Wrong pipeline stream version {}, expected {}",
                found, expected
            ),
            StreamError::UnknownModuleType(id) => write!(f, "Invalid module type ID {}", id),
            StreamError::DanglingReference {
                module,
                slot,
                child,
            } => write!(
                f,
                "Module {} refers to missing module {} in slot {}",
                module, child, slot
            ),
            StreamError::InvalidParameter(error) => write!(f, "Invalid module parameter: {}", error),
            StreamError::Graph(error) => Display::fmt(error, f),
            StreamError::TooManyModules(count) =>
                write!(f, "Too many modules to write a pipeline stream: {}", count),
            StreamError::Empty => write!(f, "Pipeline stream contains no modules"),
        }
    }
}

impl Error for StreamError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StreamError::StdIo(error) => Some(error),
            StreamError::InvalidParameter(error) => Some(error),
            StreamError::Graph(error) => Some(error),
            _ => None,
        }
    }
}

impl From<IoError> for StreamError {
    fn from(x: IoError) -> Self {
        StreamError::StdIo(x)
    }
}

impl From<GraphError> for StreamError {
    fn from(x: GraphError) -> Self {
        StreamError::Graph(x)
    }
}

impl From<ParamError> for StreamError {
    fn from(x: ParamError) -> Self {
        StreamError::InvalidParameter(x)
    }
}
