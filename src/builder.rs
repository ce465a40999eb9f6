use crate::{
    module::{ModuleGraph, ModuleId},
    pipeline::{
        Cache,
        Dim2,
        ElementId,
        LineJob,
        Pipeline,
        Pipeline2D,
        PipelineJob,
        SeamlessLineJob,
        ThreadedPipeline,
    },
    BuildError,
    Real,
};
use log::{debug, info};
use noisepipe_util::threadpool::DistributionStrategy;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// The rectangle of the xy-plane a builder samples.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Smallest x coordinate, sampled by the first column
    pub lower_x: Real,
    /// Smallest y coordinate, sampled by the first row
    pub lower_y: Real,
    /// Largest x coordinate, excluded from the samples
    pub upper_x: Real,
    /// Largest y coordinate, excluded from the samples
    pub upper_y: Real,
}

impl Bounds {
    /// Creates bounds from the lower and upper corners.
    pub const fn new(lower_x: Real, lower_y: Real, upper_x: Real, upper_y: Real) -> Self {
        Bounds {
            lower_x,
            lower_y,
            upper_x,
            upper_y,
        }
    }

    /// The width of the rectangle.
    pub fn x_extent(&self) -> Real {
        self.upper_x - self.lower_x
    }

    /// The height of the rectangle.
    pub fn y_extent(&self) -> Real {
        self.upper_y - self.lower_y
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Bounds::new(-1.0, -1.0, 1.0, 1.0)
    }
}

/// Fills a row-major buffer with samples of a module over a rectangle of the xy-plane.
///
/// Column `i` of row `j` holds the value at `(lower_x + i * x_extent / width, lower_y + j *
/// y_extent / height)`. With more than one thread every row becomes a job of a
/// [`ThreadedPipeline`]; the output does not depend on the thread count.
#[derive(Clone, Debug)]
pub struct PlaneBuilder2D {
    width: usize,
    height: usize,
    bounds: Bounds,
    seamless: bool,
    thread_count: usize,
    distribution: DistributionStrategy,
}

impl PlaneBuilder2D {
    /// Creates a builder for a plane of the given size with default bounds, running on the calling
    /// thread.
    pub fn new(width: usize, height: usize) -> Self {
        PlaneBuilder2D {
            width,
            height,
            bounds: Bounds::default(),
            seamless: false,
            thread_count: 1,
            distribution: DistributionStrategy::Interleaved,
        }
    }

    /// The number of columns.
    pub fn width(&self) -> usize {
        self.width
    }

    /// The number of rows.
    pub fn height(&self) -> usize {
        self.height
    }

    /// The sampled rectangle.
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Whether the output tiles seamlessly.
    pub fn is_seamless(&self) -> bool {
        self.seamless
    }

    /// The number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.thread_count
    }

    /// Sets the number of columns and rows.
    pub fn set_size(&mut self, width: usize, height: usize) -> &mut Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Sets the sampled rectangle.
    pub fn set_bounds(&mut self, bounds: Bounds) -> &mut Self {
        self.bounds = bounds;
        self
    }

    /// Enables or disables seamless tiling.
    ///
    /// Every sample of a seamless plane costs four evaluations.
    pub fn set_seamless(&mut self, seamless: bool) -> &mut Self {
        self.seamless = seamless;
        self
    }

    /// Sets the number of worker threads, one or less builds on the calling thread.
    pub fn set_thread_count(&mut self, thread_count: usize) -> &mut Self {
        self.thread_count = thread_count;
        self
    }

    /// Sets how rows are split between worker threads.
    pub fn set_distribution(&mut self, distribution: DistributionStrategy) -> &mut Self {
        self.distribution = distribution;
        self
    }

    /// Builds the plane for `root` into a new buffer of `width * height` values.
    pub fn build(&self, graph: &ModuleGraph, root: ModuleId) -> Result<Vec<Real>, BuildError> {
        let len = self.check_params()?;
        let mut dest = Vec::new();
        dest.try_reserve_exact(len).map_err(|e| {
            BuildError::InvalidParameter(format!(
                "cannot allocate a {}x{} plane: {}",
                self.width, self.height, e
            ))
        })?;
        dest.resize(len, 0.0);
        self.build_into(graph, root, &mut dest)?;
        Ok(dest)
    }

    /// Builds the plane for `root` into `dest`, which must hold exactly `width * height` values.
    pub fn build_into(
        &self,
        graph: &ModuleGraph,
        root: ModuleId,
        dest: &mut [Real],
    ) -> Result<(), BuildError> {
        let required = self.check_params()?;
        if dest.len() != required {
            return Err(BuildError::InvalidParameter(format!(
                "destination holds {} values but the plane needs {}",
                dest.len(),
                required
            )));
        }

        let start = Instant::now();
        let mut pipeline = Pipeline2D::new();
        let element = pipeline.add_module(graph, root)?;
        let jobs = self.row_jobs(element);

        let jobs = if self.thread_count <= 1 {
            let mut jobs = jobs;
            pipeline.execute_jobs(&mut jobs);
            jobs
        } else {
            let mut threaded =
                ThreadedPipeline::with_strategy(pipeline, self.thread_count, self.distribution)?;
            for job in jobs {
                threaded.add_job(job);
            }
            threaded.execute_jobs()?
        };

        for (row, job) in dest.chunks_exact_mut(self.width).zip(&jobs) {
            row.copy_from_slice(job.output());
        }

        info!(
            "Built {}x{} plane in {}ms",
            self.width,
            self.height,
            start.elapsed().as_millis()
        );
        Ok(())
    }

    // Returns the number of samples in the plane
    fn check_params(&self) -> Result<usize, BuildError> {
        if self.width == 0 || self.height == 0 {
            return Err(BuildError::InvalidParameter(format!(
                "plane size {}x{} is empty",
                self.width, self.height
            )));
        }

        let bounds = &self.bounds;
        if !(bounds.lower_x < bounds.upper_x && bounds.lower_y < bounds.upper_y) {
            return Err(BuildError::InvalidParameter(format!(
                "lower bounds ({}, {}) must be below upper bounds ({}, {})",
                bounds.lower_x, bounds.lower_y, bounds.upper_x, bounds.upper_y
            )));
        }

        self.width.checked_mul(self.height).ok_or_else(|| {
            BuildError::InvalidParameter(format!(
                "plane size {}x{} overflows",
                self.width, self.height
            ))
        })
    }

    fn row_jobs(&self, element: ElementId) -> Vec<PlaneRow> {
        let bounds = self.bounds;
        let x_delta = bounds.x_extent() / self.width as Real;
        let y_delta = bounds.y_extent() / self.height as Real;
        debug!(
            "Sampling {} rows with deltas ({}, {})",
            self.height, x_delta, y_delta
        );

        (0 .. self.height)
            .map(|row| {
                let y = bounds.lower_y + row as Real * y_delta;
                if self.seamless {
                    PlaneRow::Seamless(SeamlessLineJob::new(
                        element,
                        [bounds.lower_x, bounds.lower_y],
                        [bounds.x_extent(), bounds.y_extent()],
                        y,
                        x_delta,
                        self.width,
                    ))
                } else {
                    PlaneRow::Plain(LineJob::new(element, [bounds.lower_x, y], x_delta, self.width))
                }
            })
            .collect()
    }
}

enum PlaneRow {
    Plain(LineJob<Dim2>),
    Seamless(SeamlessLineJob),
}

impl PlaneRow {
    fn output(&self) -> &[Real] {
        match self {
            PlaneRow::Plain(job) => job.output(),
            PlaneRow::Seamless(job) => job.output(),
        }
    }
}

impl PipelineJob<Dim2> for PlaneRow {
    fn execute(&mut self, pipeline: &Pipeline<Dim2>, cache: &mut Cache) {
        match self {
            PlaneRow::Plain(job) => job.execute(pipeline, cache),
            PlaneRow::Seamless(job) => job.execute(pipeline, cache),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::ModuleKind;

    #[test]
    fn fills_rows_in_order() {
        let mut graph = ModuleGraph::new();
        let board = graph.add(ModuleKind::Checkerboard);

        let mut builder = PlaneBuilder2D::new(2, 2);
        builder.set_bounds(Bounds::new(0.0, 0.0, 2.0, 2.0));
        assert_eq!(builder.build(&graph, board).unwrap(), vec![1.0, -1.0, -1.0, 1.0]);
    }

    #[test]
    fn thread_count_does_not_change_output() {
        let mut graph = ModuleGraph::new();
        let perlin = graph.add(ModuleKind::perlin());

        let mut builder = PlaneBuilder2D::new(13, 7);
        builder.set_bounds(Bounds::new(-0.5, 2.0, 3.5, 4.25));
        let single = builder.build(&graph, perlin).unwrap();

        builder
            .set_thread_count(3)
            .set_distribution(DistributionStrategy::Contiguous);
        let threaded = builder.build(&graph, perlin).unwrap();

        assert_eq!(single, threaded);
    }

    #[test]
    fn seamless_planes_wrap_around() {
        let mut graph = ModuleGraph::new();
        let perlin = graph.add(ModuleKind::perlin());

        let mut builder = PlaneBuilder2D::new(4, 4);
        builder.set_bounds(Bounds::new(0.3, 0.6, 1.3, 1.6));
        let plain = builder.build(&graph, perlin).unwrap();
        let seamless = builder.set_seamless(true).build(&graph, perlin).unwrap();

        // The first sample blends in the opposite corner of the tile completely
        let mut pipeline = Pipeline2D::new();
        let element = pipeline.add_module(&graph, perlin).unwrap();
        let mut cache = pipeline.create_cache();
        let corner = pipeline.get_value(element, &[1.3, 1.6], &mut cache);
        assert!((seamless[0] - corner).abs() < 1e-9);
        assert_ne!(seamless[5], plain[5]);
    }

    #[test]
    fn rejects_bad_parameters() {
        let mut graph = ModuleGraph::new();
        let constant = graph.add(ModuleKind::Constant { value: 0.0 });

        let builder = PlaneBuilder2D::new(0, 4);
        assert!(matches!(
            builder.build(&graph, constant),
            Err(BuildError::InvalidParameter(_))
        ));

        let mut builder = PlaneBuilder2D::new(4, 4);
        builder.set_bounds(Bounds::new(1.0, 0.0, 1.0, 1.0));
        assert!(matches!(
            builder.build(&graph, constant),
            Err(BuildError::InvalidParameter(_))
        ));

        let builder = PlaneBuilder2D::new(usize::MAX, 2);
        assert!(matches!(
            builder.build(&graph, constant),
            Err(BuildError::InvalidParameter(_))
        ));

        let builder = PlaneBuilder2D::new(usize::MAX / 2, 2);
        assert!(matches!(
            builder.build(&graph, constant),
            Err(BuildError::InvalidParameter(_))
        ));

        let builder = PlaneBuilder2D::new(4, 4);
        let mut dest = vec![0.0; 15];
        assert!(matches!(
            builder.build_into(&graph, constant, &mut dest),
            Err(BuildError::InvalidParameter(_))
        ));
    }

    #[test]
    fn reports_missing_sources() {
        let mut graph = ModuleGraph::new();
        let sum = graph.add(ModuleKind::Addition);
        let builder = PlaneBuilder2D::new(2, 2);
        assert!(matches!(
            builder.build(&graph, sum),
            Err(BuildError::Pipeline(_))
        ));
    }
}
