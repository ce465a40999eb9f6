mod cache;
mod dimension;
mod element;
mod job;
mod threaded;

pub use cache::*;
pub use dimension::*;
pub use element::{fractal_octaves, ridged_octaves, Element, Octave};
pub use job::*;
pub use threaded::*;

use crate::{
    generator::{self, Quality},
    module::{ModuleGraph, ModuleId, ModuleKey},
    PipelineError,
    Real,
};
use element::{curve_value, terrace_value};
use log::debug;
use noisepipe_util::math::LerpExt;
use std::{
    collections::HashMap,
    fmt::{self, Display, Formatter},
    marker::PhantomData,
};

// Offsets keeping the three displacement noises of a turbulence element uncorrelated
const TURBULENCE_OFFSETS: [[Real; 3]; 3] = [
    [12414.0 / 65536.0, 65124.0 / 65536.0, 31337.0 / 65536.0],
    [26519.0 / 65536.0, 18128.0 / 65536.0, 60493.0 / 65536.0],
    [53820.0 / 65536.0, 11213.0 / 65536.0, 44845.0 / 65536.0],
];

/// A dense handle to an element of a [`Pipeline`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    /// Wraps a raw element index.
    pub const fn new(index: usize) -> Self {
        ElementId(index)
    }

    /// The index of the element in its pipeline and of its slot in a [`Cache`].
    pub const fn index(self) -> usize {
        self.0
    }
}

impl Display for ElementId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "@{}", self.0)
    }
}

/// A one dimensional pipeline.
pub type Pipeline1D = Pipeline<Dim1>;
/// A two dimensional pipeline.
pub type Pipeline2D = Pipeline<Dim2>;
/// A three dimensional pipeline.
pub type Pipeline3D = Pipeline<Dim3>;

/// Module graphs compiled into a flat list of elements.
///
/// Compiling visits sources before their parents, so an element's sources always have smaller ids.
/// A module that was already compiled into this pipeline, identified by its graph and id rather than
/// by its parameters, is never compiled twice: every parent refers to the same element.
///
/// Evaluation is read-only on the pipeline. All mutable state lives in the [`Cache`] passed to
/// [`get_value`](Pipeline::get_value), one per evaluation stream.
#[derive(Clone, Debug)]
pub struct Pipeline<D: Dimension> {
    elements: Vec<Element>,
    compiled: HashMap<ModuleKey, ElementId>,
    _dimension: PhantomData<D>,
}

impl<D: Dimension> Pipeline<D> {
    /// Creates a pipeline without elements.
    pub fn new() -> Self {
        Pipeline {
            elements: Vec::new(),
            compiled: HashMap::new(),
            _dimension: PhantomData,
        }
    }

    /// Compiles `root` and all of its transitive sources, returning the element of `root`.
    pub fn add_module(
        &mut self,
        graph: &ModuleGraph,
        root: ModuleId,
    ) -> Result<ElementId, PipelineError> {
        let before = self.elements.len();
        let id = self.compile(graph, root)?;
        debug!(
            "Compiled module {} to element {}, {} new of {} elements",
            root,
            id,
            self.elements.len() - before,
            self.elements.len()
        );
        Ok(id)
    }

    fn compile(&mut self, graph: &ModuleGraph, id: ModuleId) -> Result<ElementId, PipelineError> {
        let key = graph.key(id);
        if let Some(&element) = self.compiled.get(&key) {
            return Ok(element);
        }

        let module = graph.module(id).ok_or(PipelineError::UnknownModule(id))?;
        let source_count = module.kind().source_count();
        let mut sources = Vec::with_capacity(source_count);
        for slot in 0 .. source_count {
            let source = module
                .source(slot)
                .ok_or(PipelineError::MissingSource { module: id, slot })?;
            sources.push(self.compile(graph, source)?);
        }

        let element = Element::compile(module.kind(), &sources)
            .map_err(|error| PipelineError::Param { module: id, error })?;
        Ok(self.add_element(key, element))
    }

    /// Registers a compiled element for the given module.
    ///
    /// If the module already has an element in this pipeline that element's id is returned and
    /// `element` is discarded.
    pub fn add_element(&mut self, key: ModuleKey, element: Element) -> ElementId {
        if let Some(&id) = self.compiled.get(&key) {
            return id;
        }

        let id = ElementId(self.elements.len());
        debug!("Adding {} element {}", element.name(), id);
        self.elements.push(element);
        self.compiled.insert(key, id);
        id
    }

    /// Returns the element with the given id.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this pipeline.
    pub fn element(&self, id: ElementId) -> &Element {
        &self.elements[id.0]
    }

    /// The element a module compiled to, if it has been added to this pipeline.
    pub fn element_id(&self, graph: &ModuleGraph, module: ModuleId) -> Option<ElementId> {
        self.compiled.get(&graph.key(module)).copied()
    }

    /// The number of elements in this pipeline.
    pub fn element_count(&self) -> usize {
        self.elements.len()
    }

    /// Creates a cache with one slot per element.
    pub fn create_cache(&self) -> Cache {
        Cache::with_len(self.elements.len())
    }

    /// Prepares a cache for a new coordinate.
    pub fn clean_cache(&self, cache: &mut Cache) {
        cache.clean();
        cache.reserve_slots(self.elements.len());
    }

    /// Releases a cache.
    pub fn free_cache(&self, cache: Cache) {
        drop(cache);
    }

    /// Evaluates an element at `point`.
    ///
    /// Every element reached at `point` is computed at most once until the cache is cleaned.
    /// Subtrees below elements that move the point, such as translations, are evaluated in a
    /// nested frame of the cache, since their values belong to a different coordinate.
    ///
    /// # Panics
    ///
    /// Panics if the id was not issued by this pipeline.
    pub fn get_value(&self, id: ElementId, point: &D::Point, cache: &mut Cache) -> Real {
        self.value(id, point, cache)
    }

    /// Executes jobs one after the other on the calling thread, sharing a single cache.
    pub fn execute_jobs<J: PipelineJob<D>>(&self, jobs: &mut [J]) {
        let mut cache = self.create_cache();
        for job in jobs.iter_mut() {
            job.execute(self, &mut cache);
        }
    }

    fn value(&self, id: ElementId, point: &D::Point, cache: &mut Cache) -> Real {
        if let Some(value) = cache.get(id) {
            return value;
        }

        let value = self.compute(&self.elements[id.0], point, cache);
        cache.store(id, value);
        value
    }

    // Evaluates a source at a moved coordinate in the cache's nested frame
    fn moved_value(&self, id: ElementId, moved: &D::Point, cache: &mut Cache) -> Real {
        let mut frame = cache.take_frame(self.elements.len());
        let value = self.value(id, moved, &mut frame);
        cache.restore_frame(frame);
        value
    }

    fn compute(&self, element: &Element, point: &D::Point, cache: &mut Cache) -> Real {
        let source = |id: ElementId, cache: &mut Cache| self.value(id, point, cache);

        match element {
            Element::Perlin {
                octaves,
                quality,
                scale,
            } => fractal_sum::<D>(octaves, point, *quality, *scale, 0.0, |signal| signal),
            Element::Billow {
                octaves,
                quality,
                scale,
            } => fractal_sum::<D>(octaves, point, *quality, *scale, 0.5, |signal| {
                2.0 * signal.abs() - 1.0
            }),
            Element::RidgedMulti {
                octaves,
                quality,
                scale,
                offset,
                gain,
            } => {
                let mut value = 0.0;
                let mut weight = 1.0;
                for octave in octaves {
                    let signal = D::gradient_noise(
                        &octave_point::<D>(point, octave.scale),
                        octave.seed,
                        *quality,
                        *scale,
                    );
                    let signal = offset - signal.abs();
                    let signal = signal * signal * weight;
                    weight = (signal * gain).clamp(-1.0, 1.0);
                    value += signal * octave.weight;
                }
                value * 1.25 - 1.0
            }
            Element::Voronoi {
                frequency,
                seed,
                displacement,
                enable_distance,
            } => {
                let mut scaled = *point;
                for coord in scaled.as_mut() {
                    *coord *= frequency;
                }
                generator::voronoi(
                    D::to_xyz(&scaled),
                    D::AXES,
                    *seed,
                    *displacement,
                    *enable_distance,
                )
            }
            Element::Checkerboard => {
                let parity = point.as_ref().iter().fold(0, |parity, coord| {
                    parity ^ (generator::lattice(Real::make_int32_range(*coord)) & 1)
                });
                if parity == 1 {
                    -1.0
                } else {
                    1.0
                }
            }
            Element::Constant(value) => *value,
            Element::Abs(id) => source(*id, cache).abs(),
            Element::Invert(id) => -source(*id, cache),
            Element::Clamp {
                source: id,
                lower,
                upper,
            } => source(*id, cache).clamp(*lower, *upper),
            Element::Exponent {
                source: id,
                exponent,
            } => ((source(*id, cache) + 1.0) / 2.0).abs().powf(*exponent) * 2.0 - 1.0,
            Element::ScaleBias {
                source: id,
                scale,
                bias,
            } => source(*id, cache) * scale + bias,
            Element::Curve { source: id, points } => curve_value(points, source(*id, cache)),
            Element::Terrace {
                source: id,
                points,
                invert,
            } => terrace_value(points, *invert, source(*id, cache)),
            Element::ScalePoint {
                source: id,
                factors,
            } => {
                let mut moved = *point;
                for (coord, factor) in moved.as_mut().iter_mut().zip(factors) {
                    *coord *= factor;
                }
                self.moved_value(*id, &moved, cache)
            }
            Element::TranslatePoint {
                source: id,
                offsets,
            } => {
                let mut moved = *point;
                for (coord, offset) in moved.as_mut().iter_mut().zip(offsets) {
                    *coord += offset;
                }
                self.moved_value(*id, &moved, cache)
            }
            Element::Turbulence {
                source: id,
                power,
                displacement,
            } => {
                let mut moved = *point;
                for axis in 0 .. D::AXES {
                    let mut sample = *point;
                    for (coord, offset) in sample.as_mut().iter_mut().zip(&TURBULENCE_OFFSETS[axis]) {
                        *coord += offset;
                    }
                    let distortion = fractal_sum::<D>(
                        &displacement[axis],
                        &sample,
                        Quality::Standard,
                        generator::DEFAULT_GRADIENT_SCALE,
                        0.0,
                        |signal| signal,
                    );
                    moved.as_mut()[axis] += distortion * power;
                }
                self.moved_value(*id, &moved, cache)
            }
            Element::Addition([a, b]) => source(*a, cache) + source(*b, cache),
            Element::Multiply([a, b]) => source(*a, cache) * source(*b, cache),
            Element::Minimum([a, b]) => source(*a, cache).min(source(*b, cache)),
            Element::Maximum([a, b]) => source(*a, cache).max(source(*b, cache)),
            Element::Power([a, b]) => source(*a, cache).powf(source(*b, cache)),
            Element::Select {
                sources: [a, b, control],
                lower,
                upper,
                edge_falloff,
            } => {
                let control = source(*control, cache);
                let start = lower - edge_falloff;
                let end = upper + edge_falloff;

                if control < start {
                    source(*a, cache)
                } else if control > end {
                    source(*b, cache)
                } else {
                    let alpha = Real::s_curve3((control - start) / (end - start));
                    Real::lerp(alpha, source(*a, cache), source(*b, cache))
                }
            }
            Element::Blend([a, b, control]) => {
                let alpha = (source(*control, cache) + 1.0) / 2.0;
                Real::lerp(alpha, source(*a, cache), source(*b, cache))
            }
        }
    }
}

impl<D: Dimension> Default for Pipeline<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn octave_point<D: Dimension>(point: &D::Point, scale: Real) -> D::Point {
    let mut scaled = *point;
    for coord in scaled.as_mut() {
        *coord = Real::make_int32_range(*coord * scale);
    }
    scaled
}

#[inline]
fn fractal_sum<D: Dimension>(
    octaves: &[Octave],
    point: &D::Point,
    quality: Quality,
    scale: Real,
    initial: Real,
    shape: impl Fn(Real) -> Real,
) -> Real {
    octaves.iter().fold(initial, |value, octave| {
        let signal = D::gradient_noise(
            &octave_point::<D>(point, octave.scale),
            octave.seed,
            quality,
            scale,
        );
        value + shape(signal) * octave.weight
    })
}
