//! Single-worker task executor
//!
//! Each asynchronous backend owns one [`TaskExecutor`]: a named worker thread
//! draining one FIFO queue. Tasks run outside any lock, in submission order.
//! Shutdown closes the queue and lets the worker finish everything already
//! submitted before it exits.
//!
//! The queue is unbounded unless a limit is given, in which case the
//! [`OverflowPolicy`] decides whether a full queue blocks the submitter or
//! rejects the task.

use super::error::{LoggerError, Result};
use super::overflow_policy::OverflowPolicy;
use crossbeam_channel::{bounded, unbounded, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle, ThreadId};

type Task = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct Counters {
    submitted: u64,
    completed: u64,
}

#[derive(Default)]
struct Progress {
    counters: Mutex<Counters>,
    done: Condvar,
}

impl Progress {
    fn complete_one(&self) {
        let mut counters = self.counters.lock();
        counters.completed += 1;
        self.done.notify_all();
    }
}

/// FIFO task queue served by one dedicated thread
///
/// # Examples
///
/// ```
/// use rust_logit::TaskExecutor;
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// let executor = TaskExecutor::new("example-writer").unwrap();
/// let count = Arc::new(AtomicUsize::new(0));
/// for _ in 0..10 {
///     let count = Arc::clone(&count);
///     executor.submit(move || {
///         count.fetch_add(1, Ordering::SeqCst);
///     }).unwrap();
/// }
/// executor.wait();
/// assert_eq!(count.load(Ordering::SeqCst), 10);
/// ```
pub struct TaskExecutor {
    name: String,
    sender: Mutex<Option<Sender<Task>>>,
    max_queue_size: Option<usize>,
    policy: OverflowPolicy,
    dropped: AtomicU64,
    progress: Arc<Progress>,
    worker: Mutex<Option<JoinHandle<()>>>,
    worker_id: ThreadId,
}

impl TaskExecutor {
    /// Start the worker thread.
    ///
    /// # Errors
    ///
    /// Returns an IO error if the thread cannot be spawned
    pub fn new(name: impl Into<String>) -> Result<Self> {
        Self::with_queue_limit(name, None, OverflowPolicy::Block)
    }

    /// Start the worker thread with at most `max_queue_size` queued tasks.
    ///
    /// `None` leaves the queue unbounded and `policy` unused.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for a zero queue size, or an IO error if
    /// the thread cannot be spawned
    ///
    /// # Examples
    ///
    /// ```
    /// use rust_logit::{OverflowPolicy, TaskExecutor};
    ///
    /// let executor =
    ///     TaskExecutor::with_queue_limit("bounded-writer", Some(64), OverflowPolicy::DropNewest)
    ///         .unwrap();
    /// assert_eq!(executor.max_queue_size(), Some(64));
    /// assert_eq!(executor.dropped_tasks(), 0);
    /// ```
    pub fn with_queue_limit(
        name: impl Into<String>,
        max_queue_size: Option<usize>,
        policy: OverflowPolicy,
    ) -> Result<Self> {
        let name = name.into();
        if max_queue_size == Some(0) {
            return Err(LoggerError::config(
                format!("TaskExecutor '{}'", name),
                "max_queue_size must be at least 1",
            ));
        }
        let (sender, receiver) = match max_queue_size {
            Some(capacity) => bounded::<Task>(capacity),
            None => unbounded::<Task>(),
        };
        let progress = Arc::new(Progress::default());
        let worker_progress = Arc::clone(&progress);
        let worker_name = name.clone();

        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            // Ends once every sender is gone and the queue is drained
            for task in receiver.iter() {
                if let Err(panic_info) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task)) {
                    eprintln!(
                        "[LOGGER CRITICAL] Task on executor '{}' panicked: {}. \
                         The executor keeps running.",
                        worker_name,
                        panic_message(panic_info.as_ref())
                    );
                }
                worker_progress.complete_one();
            }
        })?;

        Ok(Self {
            name,
            worker_id: handle.thread().id(),
            sender: Mutex::new(Some(sender)),
            max_queue_size,
            policy,
            dropped: AtomicU64::new(0),
            progress,
            worker: Mutex::new(Some(handle)),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_queue_size(&self) -> Option<usize> {
        self.max_queue_size
    }

    pub fn overflow_policy(&self) -> OverflowPolicy {
        self.policy
    }

    /// Tasks rejected because the queue was full
    pub fn dropped_tasks(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue `task` behind everything submitted before it.
    ///
    /// With a queue limit and [`OverflowPolicy::Block`] this waits for room.
    ///
    /// # Errors
    ///
    /// Returns [`LoggerError::ExecutorStopped`] after [`shutdown`](Self::shutdown),
    /// or [`LoggerError::QueueFull`] when the queue is full under
    /// [`OverflowPolicy::DropNewest`]
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        // Cloned so a blocked submitter does not hold up shutdown or other submitters
        let Some(sender) = self.sender.lock().as_ref().cloned() else {
            return Err(LoggerError::ExecutorStopped);
        };
        self.progress.counters.lock().submitted += 1;

        let task: Task = Box::new(task);
        let sent = if self.max_queue_size.is_some() && self.policy == OverflowPolicy::DropNewest {
            sender.try_send(task)
        } else {
            sender
                .send(task)
                .map_err(|e| TrySendError::Disconnected(e.into_inner()))
        };

        match sent {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.progress.complete_one();
                if self.dropped.fetch_add(1, Ordering::Relaxed) == 0 {
                    eprintln!(
                        "[WARN] Executor '{}' queue is full ({} tasks); dropping new entries",
                        self.name,
                        self.max_queue_size.unwrap_or(0)
                    );
                }
                Err(LoggerError::queue_full(&self.name))
            }
            Err(TrySendError::Disconnected(_)) => {
                self.progress.complete_one();
                Err(LoggerError::ExecutorStopped)
            }
        }
    }

    /// Block until every task submitted before this call has run.
    ///
    /// Returns immediately when called from the worker thread itself.
    pub fn wait(&self) {
        if thread::current().id() == self.worker_id {
            return;
        }
        let mut counters = self.progress.counters.lock();
        let target = counters.submitted;
        while counters.completed < target {
            self.progress.done.wait(&mut counters);
        }
    }

    /// Tasks submitted but not yet finished
    pub fn pending(&self) -> u64 {
        let counters = self.progress.counters.lock();
        counters.submitted - counters.completed
    }

    pub fn is_running(&self) -> bool {
        self.sender.lock().is_some()
    }

    /// Stop accepting tasks, drain the queue and join the worker.
    pub fn shutdown(&self) {
        drop(self.sender.lock().take());

        if thread::current().id() == self.worker_id {
            return;
        }
        if let Some(handle) = self.worker.lock().take() {
            if let Err(e) = handle.join() {
                eprintln!(
                    "[LOGGER ERROR] Executor '{}' worker panicked during shutdown: {}",
                    self.name,
                    panic_message(e.as_ref())
                );
            }
        }
    }
}

impl Drop for TaskExecutor {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .field("pending", &self.pending())
            .field("max_queue_size", &self.max_queue_size)
            .field("policy", &self.policy)
            .field("dropped", &self.dropped_tasks())
            .finish()
    }
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_fifo_order() {
        let executor = TaskExecutor::new("fifo").unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for i in 0..100 {
            let seen = Arc::clone(&seen);
            executor.submit(move || seen.lock().push(i)).unwrap();
        }
        executor.wait();
        assert_eq!(*seen.lock(), (0..100).collect::<Vec<_>>());
    }

    #[test]
    fn test_wait_covers_slow_tasks() {
        let executor = TaskExecutor::new("slow").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..5 {
            let count = Arc::clone(&count);
            executor
                .submit(move || {
                    thread::sleep(Duration::from_millis(10));
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        executor.wait();
        assert_eq!(count.load(Ordering::SeqCst), 5);
        assert_eq!(executor.pending(), 0);
    }

    #[test]
    fn test_shutdown_drains_queue() {
        let executor = TaskExecutor::new("drain").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        for _ in 0..50 {
            let count = Arc::clone(&count);
            executor
                .submit(move || {
                    thread::sleep(Duration::from_millis(1));
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        executor.shutdown();
        assert_eq!(count.load(Ordering::SeqCst), 50);
        assert!(!executor.is_running());
        assert!(matches!(executor.submit(|| {}), Err(LoggerError::ExecutorStopped)));
    }

    #[test]
    fn test_drop_drains_queue() {
        let count = Arc::new(AtomicUsize::new(0));
        {
            let executor = TaskExecutor::new("drop").unwrap();
            for _ in 0..20 {
                let count = Arc::clone(&count);
                executor
                    .submit(move || {
                        count.fetch_add(1, Ordering::SeqCst);
                    })
                    .unwrap();
            }
        }
        assert_eq!(count.load(Ordering::SeqCst), 20);
    }

    #[test]
    fn test_panicking_task_does_not_stop_worker() {
        let executor = TaskExecutor::new("panics").unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        executor.submit(|| panic!("task failure")).unwrap();
        let after = Arc::clone(&count);
        executor
            .submit(move || {
                after.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        executor.wait();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_wait_from_worker_returns() {
        let executor = Arc::new(TaskExecutor::new("reentrant").unwrap());
        let inner = Arc::clone(&executor);
        let done = Arc::new(AtomicUsize::new(0));
        let flag = Arc::clone(&done);
        executor
            .submit(move || {
                inner.wait();
                flag.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        executor.wait();
        assert_eq!(done.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_submitters() {
        let executor = Arc::new(TaskExecutor::new("concurrent").unwrap());
        let count = Arc::new(AtomicUsize::new(0));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let executor = Arc::clone(&executor);
                let count = Arc::clone(&count);
                thread::spawn(move || {
                    for _ in 0..250 {
                        let count = Arc::clone(&count);
                        executor
                            .submit(move || {
                                count.fetch_add(1, Ordering::SeqCst);
                            })
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        executor.wait();
        assert_eq!(count.load(Ordering::SeqCst), 2000);
    }

    /// Occupy the worker until the returned sender fires or is dropped.
    fn block_worker(executor: &TaskExecutor) -> crossbeam_channel::Sender<()> {
        let (started_tx, started_rx) = crossbeam_channel::bounded::<()>(1);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(1);
        executor
            .submit(move || {
                let _ = started_tx.send(());
                let _ = release_rx.recv();
            })
            .unwrap();
        started_rx.recv().unwrap();
        release_tx
    }

    #[test]
    fn test_drop_newest_rejects_when_full() {
        let executor =
            TaskExecutor::with_queue_limit("drop-newest", Some(2), OverflowPolicy::DropNewest)
                .unwrap();
        let count = Arc::new(AtomicUsize::new(0));
        let release = block_worker(&executor);

        for _ in 0..2 {
            let count = Arc::clone(&count);
            executor
                .submit(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                })
                .unwrap();
        }
        let rejected = executor.submit(|| {});
        assert!(matches!(rejected, Err(LoggerError::QueueFull { .. })));
        assert!(matches!(executor.submit(|| {}), Err(LoggerError::QueueFull { .. })));
        assert_eq!(executor.dropped_tasks(), 2);

        release.send(()).unwrap();
        executor.wait();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(executor.pending(), 0);

        // Room again once drained
        executor.submit(|| {}).unwrap();
        executor.wait();
        assert_eq!(executor.dropped_tasks(), 2);
    }

    #[test]
    fn test_block_waits_for_room() {
        let executor = Arc::new(
            TaskExecutor::with_queue_limit("block", Some(1), OverflowPolicy::Block).unwrap(),
        );
        let count = Arc::new(AtomicUsize::new(0));
        let release = block_worker(&executor);

        let first = Arc::clone(&count);
        executor
            .submit(move || {
                first.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        let returned = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let producer = {
            let executor = Arc::clone(&executor);
            let count = Arc::clone(&count);
            let returned = Arc::clone(&returned);
            thread::spawn(move || {
                let result = executor.submit(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                });
                returned.store(true, Ordering::SeqCst);
                result
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!returned.load(Ordering::SeqCst));

        release.send(()).unwrap();
        producer.join().unwrap().unwrap();
        executor.wait();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(executor.dropped_tasks(), 0);
    }

    #[test]
    fn test_zero_queue_size_rejected() {
        let result = TaskExecutor::with_queue_limit("zero", Some(0), OverflowPolicy::Block);
        assert!(matches!(result, Err(LoggerError::InvalidConfiguration { .. })));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "Unknown panic");
    }
}
