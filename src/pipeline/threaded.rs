use super::{Cache, Dimension, ElementId, Pipeline, PipelineJob};
use crate::{
    module::{ModuleGraph, ModuleId},
    PipelineError,
};
use log::{debug, info};
use noisepipe_util::threadpool::{DistributionStrategy, WorkerPool};
use std::{mem, sync::Arc};

const POOL_NAME: &str = "noisepipe pipeline";

/// A pipeline that executes queued jobs on a fixed set of worker threads.
///
/// Every worker owns a private [`Cache`] for the lifetime of this pipeline and reuses it for every
/// job it executes, so no cache is ever shared between threads. Queued jobs are run as one batch by
/// [`execute_jobs`](ThreadedPipeline::execute_jobs), which blocks until every job has finished.
pub struct ThreadedPipeline<D: Dimension, J: PipelineJob<D>> {
    pipeline: Arc<Pipeline<D>>,
    pool: WorkerPool<J, Pipeline<D>, Cache>,
    jobs: Vec<J>,
}

impl<D: Dimension, J: PipelineJob<D>> ThreadedPipeline<D, J> {
    /// Creates an empty threaded pipeline with the given number of workers.
    pub fn new(thread_count: usize) -> Result<Self, PipelineError> {
        Self::from_pipeline(Pipeline::new(), thread_count)
    }

    /// Wraps an existing pipeline, distributing jobs to the workers in turn.
    pub fn from_pipeline(pipeline: Pipeline<D>, thread_count: usize) -> Result<Self, PipelineError> {
        Self::with_strategy(pipeline, thread_count, DistributionStrategy::Interleaved)
    }

    /// Wraps an existing pipeline, splitting batches between the workers with `strategy`.
    ///
    /// Worker caches start out with one slot per element currently in `pipeline`.
    pub fn with_strategy(
        pipeline: Pipeline<D>,
        thread_count: usize,
        strategy: DistributionStrategy,
    ) -> Result<Self, PipelineError> {
        let pool = WorkerPool::open(
            &POOL_NAME,
            thread_count,
            pipeline.create_cache(),
            strategy,
            run_job::<D, J>,
        )
        .map_err(PipelineError::ThreadPool)?;

        info!(
            "Started threaded pipeline with {} workers and {} elements",
            pool.size(),
            pipeline.element_count()
        );

        Ok(ThreadedPipeline {
            pipeline: Arc::new(pipeline),
            pool,
            jobs: Vec::new(),
        })
    }

    /// The compiled pipeline shared by the workers.
    pub fn pipeline(&self) -> &Pipeline<D> {
        &self.pipeline
    }

    /// The number of worker threads.
    pub fn thread_count(&self) -> usize {
        self.pool.size()
    }

    /// Compiles a module into the shared pipeline.
    ///
    /// Worker caches grow on their next clean, so modules may be added between batches.
    pub fn add_module(
        &mut self,
        graph: &ModuleGraph,
        root: ModuleId,
    ) -> Result<ElementId, PipelineError> {
        Arc::make_mut(&mut self.pipeline).add_module(graph, root)
    }

    /// Queues a job for the next call to [`execute_jobs`](ThreadedPipeline::execute_jobs).
    pub fn add_job(&mut self, job: J) {
        self.jobs.push(job);
    }

    /// The number of queued jobs.
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }

    /// Executes every queued job and returns them in the order they were queued.
    ///
    /// The queue is empty afterwards, whether or not the batch succeeded. If any job panics the
    /// whole batch fails and none of its jobs are returned.
    pub fn execute_jobs(&mut self) -> Result<Vec<J>, PipelineError> {
        let jobs = mem::take(&mut self.jobs);
        debug!(
            "Executing {} jobs on {} workers",
            jobs.len(),
            self.pool.size()
        );
        Ok(self.pool.run_batch(Arc::clone(&self.pipeline), jobs)?)
    }
}

fn run_job<D: Dimension, J: PipelineJob<D>>(job: &mut J, pipeline: &Pipeline<D>, cache: &mut Cache) {
    job.execute(pipeline, cache);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        module::ModuleKind,
        pipeline::{Dim2, LineJob, Pipeline2D},
        Real,
    };

    fn perlin_pipeline() -> (Pipeline2D, ElementId) {
        let mut graph = ModuleGraph::new();
        let perlin = graph.add(ModuleKind::perlin());
        let mut pipeline = Pipeline2D::new();
        let root = pipeline.add_module(&graph, perlin).unwrap();
        (pipeline, root)
    }

    fn rows(root: ElementId, count: usize) -> Vec<LineJob<Dim2>> {
        (0 .. count)
            .map(|row| LineJob::new(root, [-1.0, row as Real * 0.37], 0.21, 16))
            .collect()
    }

    #[test]
    fn threaded_rows_match_sequential_rows() {
        let (pipeline, root) = perlin_pipeline();
        let mut expected = rows(root, 9);
        pipeline.execute_jobs(&mut expected);

        let mut threaded = ThreadedPipeline::from_pipeline(pipeline, 3).unwrap();
        for job in rows(root, 9) {
            threaded.add_job(job);
        }
        assert_eq!(threaded.job_count(), 9);

        let done = threaded.execute_jobs().unwrap();
        assert_eq!(threaded.job_count(), 0);
        for (job, expected) in done.iter().zip(&expected) {
            assert_eq!(job.output(), expected.output());
        }
    }

    #[test]
    fn modules_can_be_added_between_batches() {
        let mut threaded: ThreadedPipeline<Dim2, LineJob<Dim2>> =
            ThreadedPipeline::with_strategy(Pipeline2D::new(), 2, DistributionStrategy::Contiguous)
                .unwrap();

        let mut graph = ModuleGraph::new();
        let constant = graph.add(ModuleKind::Constant { value: 0.25 });
        let first = threaded.add_module(&graph, constant).unwrap();
        threaded.add_job(LineJob::new(first, [0.0, 0.0], 1.0, 4));
        let done = threaded.execute_jobs().unwrap();
        assert_eq!(done[0].output(), &[0.25; 4]);

        let perlin = graph.add(ModuleKind::perlin());
        let second = threaded.add_module(&graph, perlin).unwrap();
        assert_eq!(threaded.pipeline().element_count(), 2);
        threaded.add_job(LineJob::new(second, [0.5, 0.5], 1.0, 4));
        threaded.add_job(LineJob::new(first, [0.5, 0.5], 1.0, 4));
        let done = threaded.execute_jobs().unwrap();
        assert_eq!(done.len(), 2);
        assert_eq!(done[1].output(), &[0.25; 4]);
    }

    #[test]
    fn empty_queue_executes_nothing() {
        let (pipeline, _) = perlin_pipeline();
        let mut threaded: ThreadedPipeline<Dim2, LineJob<Dim2>> =
            ThreadedPipeline::from_pipeline(pipeline, 0).unwrap();
        assert_eq!(threaded.thread_count(), 1);
        assert!(threaded.execute_jobs().unwrap().is_empty());
    }
}
