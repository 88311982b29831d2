use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;

/// Single-consumer FIFO task runner.
///
/// A fair binary semaphore guards the critical section: tasks start in the
/// order their `run_task` calls reach the semaphore, and a task never starts
/// before the previous one has fully settled, success or failure. There is
/// no cancellation of queued tasks and no priority; a slow task blocks the
/// queue behind it. Callers needing timeouts wrap individual calls
/// externally.
#[derive(Debug, Clone)]
pub struct SerialQueue {
    permit: Arc<Semaphore>,
}

impl SerialQueue {
    pub fn new() -> Self {
        SerialQueue {
            permit: Arc::new(Semaphore::new(1)),
        }
    }

    /// Run `task` once every previously queued task has settled.
    ///
    /// The task's output is returned as-is; an `Err` settles the task like
    /// any other output and releases the queue.
    pub async fn run_task<F, T>(&self, task: F) -> T
    where
        F: Future<Output = T>,
    {
        // The semaphore is never closed, so acquisition only fails if the
        // queue itself was dropped mid-await, which cannot be observed here.
        let _guard = self
            .permit
            .acquire()
            .await
            .expect("serial queue semaphore closed");
        task.await
    }
}

impl Default for SerialQueue {
    fn default() -> Self {
        SerialQueue::new()
    }
}
