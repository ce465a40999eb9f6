use super::{Cache, Dim2, Dimension, ElementId, Pipeline};
use crate::Real;
use noisepipe_util::math::LerpExt;

/// A unit of deferred evaluation work.
///
/// Jobs own their output. Executing a job must clean the cache before every independent coordinate
/// it evaluates, since the cache it receives may still hold values of the previous job.
pub trait PipelineJob<D: Dimension>: Send + 'static {
    /// Evaluates this job with the given pipeline and the cache of the executing thread.
    fn execute(&mut self, pipeline: &Pipeline<D>, cache: &mut Cache);
}

/// Fills a row of samples starting at a point and stepping along the x axis.
#[derive(Clone, Debug)]
pub struct LineJob<D: Dimension> {
    element: ElementId,
    start: D::Point,
    delta: Real,
    output: Vec<Real>,
}

impl<D: Dimension> LineJob<D> {
    /// Creates a job sampling `len` points from `start`, `delta` apart along x.
    pub fn new(element: ElementId, start: D::Point, delta: Real, len: usize) -> Self {
        LineJob {
            element,
            start,
            delta,
            output: vec![0.0; len],
        }
    }

    /// The samples of this job, zero until it has been executed.
    pub fn output(&self) -> &[Real] {
        &self.output
    }

    /// Consumes this job, returning its samples.
    pub fn into_output(self) -> Vec<Real> {
        self.output
    }
}

impl<D: Dimension> PipelineJob<D> for LineJob<D> {
    fn execute(&mut self, pipeline: &Pipeline<D>, cache: &mut Cache) {
        let mut point = self.start;
        for sample in self.output.iter_mut() {
            pipeline.clean_cache(cache);
            *sample = pipeline.get_value(self.element, &point, cache);
            point.as_mut()[0] += self.delta;
        }
    }
}

/// Fills a row of a plane that tiles seamlessly.
///
/// Every sample blends four evaluations: at the sample, one tile width to the right, one tile
/// height above, and both. The weights depend on the sample's position within the tile, so opposite
/// edges of the tile match.
#[derive(Clone, Debug)]
pub struct SeamlessLineJob {
    element: ElementId,
    lower: [Real; 2],
    extent: [Real; 2],
    y: Real,
    delta: Real,
    output: Vec<Real>,
}

impl SeamlessLineJob {
    /// Creates a job for the row at `y` of the tile starting at `lower` with the size `extent`.
    pub fn new(
        element: ElementId,
        lower: [Real; 2],
        extent: [Real; 2],
        y: Real,
        delta: Real,
        len: usize,
    ) -> Self {
        SeamlessLineJob {
            element,
            lower,
            extent,
            y,
            delta,
            output: vec![0.0; len],
        }
    }

    /// The samples of this job, zero until it has been executed.
    pub fn output(&self) -> &[Real] {
        &self.output
    }

    /// Consumes this job, returning its samples.
    pub fn into_output(self) -> Vec<Real> {
        self.output
    }
}

impl PipelineJob<Dim2> for SeamlessLineJob {
    fn execute(&mut self, pipeline: &Pipeline<Dim2>, cache: &mut Cache) {
        let [lower_x, lower_y] = self.lower;
        let [x_extent, y_extent] = self.extent;
        let (element, y, delta) = (self.element, self.y, self.delta);
        let y_blend = 1.0 - (y - lower_y) / y_extent;

        let mut sample = |x: Real, y: Real| {
            pipeline.clean_cache(cache);
            pipeline.get_value(element, &[x, y], cache)
        };

        let mut x = lower_x;
        for value in self.output.iter_mut() {
            let x_blend = 1.0 - (x - lower_x) / x_extent;

            let sw = sample(x, y);
            let se = sample(x + x_extent, y);
            let nw = sample(x, y + y_extent);
            let ne = sample(x + x_extent, y + y_extent);

            let south = Real::lerp(x_blend, sw, se);
            let north = Real::lerp(x_blend, nw, ne);
            *value = Real::lerp(y_blend, south, north);

            x += delta;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{ModuleGraph, ModuleKind};
    use crate::pipeline::{Pipeline1D, Pipeline2D};

    #[test]
    fn line_job_matches_direct_evaluation() {
        let mut graph = ModuleGraph::new();
        let perlin = graph.add(ModuleKind::perlin());
        let mut pipeline = Pipeline1D::new();
        let root = pipeline.add_module(&graph, perlin).unwrap();

        let mut jobs = vec![LineJob::<crate::Dim1>::new(root, [0.25], 0.5, 4)];
        pipeline.execute_jobs(&mut jobs);

        let mut cache = pipeline.create_cache();
        let mut x = 0.25;
        for sample in jobs[0].output() {
            pipeline.clean_cache(&mut cache);
            assert_eq!(*sample, pipeline.get_value(root, &[x], &mut cache));
            x += 0.5;
        }
    }

    #[test]
    fn seamless_job_of_constant_is_constant() {
        let mut graph = ModuleGraph::new();
        let constant = graph.add(ModuleKind::Constant { value: 0.75 });
        let mut pipeline = Pipeline2D::new();
        let root = pipeline.add_module(&graph, constant).unwrap();

        let mut job = SeamlessLineJob::new(root, [0.0, 0.0], [2.0, 2.0], 0.5, 0.25, 8);
        let mut cache = pipeline.create_cache();
        job.execute(&pipeline, &mut cache);
        for value in job.into_output() {
            assert!((value - 0.75).abs() < 1e-12);
        }
    }
}
