use log::{debug, error};
use std::any::Any;
use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::io;
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{
    mpsc::{self, Receiver, SendError, Sender},
    Arc,
};
use std::thread::{self, JoinHandle};

/// A fixed size threadpool that executes batches of jobs with a specific function.
///
/// The function this pool's workers execute accepts a mutable reference to a "job", a shared
/// reference to the batch "context" and a mutable reference to an internal "state". Every worker owns
/// its own copy of the state for the whole lifetime of the pool and nothing else ever touches it, so
/// the state needs no synchronization. The context is handed to the workers only for the duration of
/// a batch: once [`run_batch`] returns every worker has dropped its reference to it.
///
/// [`run_batch`]: crate::threadpool::WorkerPool::run_batch
pub struct WorkerPool<J, C, S> {
    name: String,
    pool: Vec<Worker<J, C>>,
    report_receiver: Receiver<Report<J>>,
    distribution_strategy: DistributionStrategy,
    _state: PhantomData<fn() -> S>,
}

impl<J, C, S> WorkerPool<J, C, S>
where
    J: Send + 'static,
    C: Send + Sync + 'static,
    S: Send + Clone + 'static,
{
    /// Creates a new threadpool with the given name and size.
    ///
    /// Every worker is spawned with a clone of the initial state and immediately blocks while waiting
    /// for a batch.
    ///
    /// # Arguments
    ///
    /// * `name` - The name of the thread pool, used for thread names and log messages
    /// * `size` - The number of workers, at least one worker is always spawned
    /// * `initial_state` - The initial state of all worker threads in this pool
    /// * `distribution_strategy` - How a batch is split between the workers (see
    /// [`DistributionStrategy`])
    /// * `executor` - The job executor
    ///
    /// [`DistributionStrategy`]: crate::threadpool::DistributionStrategy
    pub fn open<N: Display>(
        name: &N,
        size: usize,
        initial_state: S,
        distribution_strategy: DistributionStrategy,
        executor: fn(&mut J, &C, &mut S),
    ) -> io::Result<Self> {
        let name = name.to_string();
        let (report_sender, report_receiver) = mpsc::channel();
        let mut pool = Vec::with_capacity(size.max(1));

        for number in 1 ..= size.max(1) {
            pool.push(Worker::spawn(
                &name,
                number,
                initial_state.clone(),
                report_sender.clone(),
                executor,
            )?);
        }

        debug!("Opened {} with {} workers", name, pool.len());

        Ok(WorkerPool {
            name,
            pool,
            report_receiver,
            distribution_strategy,
            _state: PhantomData,
        })
    }
}

impl<J, C, S> WorkerPool<J, C, S> {
    /// The number of workers in this pool.
    pub fn size(&self) -> usize {
        self.pool.len()
    }

    /// Runs a batch of jobs and blocks until every worker is done with its share.
    ///
    /// The jobs are returned in the order they were given. If a job panics, the rest of that worker's
    /// share is abandoned and the batch fails with [`BatchError::JobPanicked`]; the other workers still
    /// finish their shares and the pool remains usable for later batches.
    ///
    /// [`BatchError::JobPanicked`]: crate::threadpool::BatchError::JobPanicked
    pub fn run_batch(&mut self, context: Arc<C>, jobs: Vec<J>) -> Result<Vec<J>, BatchError> {
        let total = jobs.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let worker_count = self.pool.len();
        let mut shares: Vec<Vec<(usize, J)>> = (0 .. worker_count).map(|_| Vec::new()).collect();
        match self.distribution_strategy {
            DistributionStrategy::Interleaved =>
                for (index, job) in jobs.into_iter().enumerate() {
                    shares[index % worker_count].push((index, job));
                },
            DistributionStrategy::Contiguous => {
                let share_len = (total + worker_count - 1) / worker_count;
                for (index, job) in jobs.into_iter().enumerate() {
                    shares[index / share_len].push((index, job));
                }
            }
        }

        let mut failure = None;
        let mut dispatched = 0;
        for (worker, share) in self.pool.iter().zip(shares) {
            if share.is_empty() {
                continue;
            }

            match worker.send_batch(Batch {
                context: Arc::clone(&context),
                jobs: share,
            }) {
                Ok(()) => dispatched += 1,
                Err(e) => {
                    error!(
                        "Failed to send batch to {}/Worker#{}: {}",
                        self.name, worker.number, e
                    );
                    failure.get_or_insert(BatchError::WorkerLost {
                        worker: worker.number,
                    });
                }
            }
        }
        drop(context);

        // Every dispatched share is reported exactly once, even if one of its jobs panicked
        let mut finished: Vec<Option<J>> = (0 .. total).map(|_| None).collect();
        for _ in 0 .. dispatched {
            let report = match self.report_receiver.recv() {
                Ok(report) => report,
                Err(_) => return Err(BatchError::Disconnected),
            };

            match report.outcome {
                Ok(jobs) =>
                    for (index, job) in jobs {
                        finished[index] = Some(job);
                    },
                Err(message) => {
                    error!(
                        "Job panicked in {}/Worker#{}: {}",
                        self.name, report.worker, message
                    );
                    failure.get_or_insert(BatchError::JobPanicked {
                        worker: report.worker,
                        message,
                    });
                }
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(finished.into_iter().flatten().collect()),
        }
    }

    /// Closes this pool and joins all underlying worker threads.
    pub fn close(&mut self) {
        for worker in self.pool.drain(..) {
            worker.join();
        }
    }
}

impl<J, C, S> Drop for WorkerPool<J, C, S> {
    fn drop(&mut self) {
        self.close();
    }
}

/// Different strategies a worker pool can use to split a batch between its workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistributionStrategy {
    /// Job `i` goes to worker `i % size`. Neighbouring jobs, which usually cost about the same, end
    /// up on different workers.
    Interleaved,
    /// Every worker receives one contiguous run of jobs.
    Contiguous,
}

/// Errors that abort a batch.
#[derive(Debug)]
pub enum BatchError {
    /// A job panicked on the given worker.
    JobPanicked {
        /// The number of the worker the job ran on
        worker: usize,
        /// The panic payload, if it was a string
        message: String,
    },
    /// A worker thread is gone and could not receive its share.
    WorkerLost {
        /// The number of the lost worker
        worker: usize,
    },
    /// Every worker thread is gone.
    Disconnected,
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            BatchError::JobPanicked { worker, message } =>
                write!(f, "job panicked on worker #{}: {}", worker, message),
            BatchError::WorkerLost { worker } => write!(f, "worker #{} is no longer running", worker),
            BatchError::Disconnected => write!(f, "all workers disconnected"),
        }
    }
}

impl Error for BatchError {}

struct Batch<J, C> {
    context: Arc<C>,
    jobs: Vec<(usize, J)>,
}

struct Report<J> {
    worker: usize,
    outcome: Result<Vec<(usize, J)>, String>,
}

/// A worker for a fixed threadpool.
struct Worker<J, C> {
    number: usize,
    batch_sender: Sender<Option<Batch<J, C>>>,
    handle: JoinHandle<()>,
}

impl<J, C> Worker<J, C> {
    /// Join this worker's thread.
    fn join(self) {
        // There isn't really anything useful we could do with the errors that could occur here
        drop(self.batch_sender.send(None));
        drop(self.handle.join());
    }

    /// Send a batch to this worker to execute.
    fn send_batch(&self, batch: Batch<J, C>) -> Result<(), SendError<Option<Batch<J, C>>>> {
        self.batch_sender.send(Some(batch))
    }
}

impl<J: Send + 'static, C: Send + Sync + 'static> Worker<J, C> {
    /// Spawns a new worker thread with the given parameters, returning a handle to the worker thread.
    fn spawn<S: Send + 'static>(
        pool_name: &str,
        number: usize,
        mut state: S,
        report_sender: Sender<Report<J>>,
        executor: fn(&mut J, &C, &mut S),
    ) -> io::Result<Worker<J, C>> {
        let (batch_sender, batch_receiver) = mpsc::channel::<Option<Batch<J, C>>>();

        let handle = thread::Builder::new()
            .name(format!("{}/Worker#{}", pool_name, number))
            .spawn(move || {
                while let Ok(Some(Batch { context, mut jobs })) = batch_receiver.recv() {
                    let result = panic::catch_unwind(AssertUnwindSafe(|| {
                        for (_, job) in jobs.iter_mut() {
                            executor(job, &context, &mut state);
                        }
                    }));

                    // The context must be released before the pool hears back from us
                    drop(context);

                    let outcome = match result {
                        Ok(()) => Ok(jobs),
                        Err(payload) => Err(panic_message(payload.as_ref())),
                    };

                    if report_sender.send(Report { worker: number, outcome }).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Worker {
            number,
            batch_sender,
            handle,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
