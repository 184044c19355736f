//! Bounded worker pool for backend fan-out.
//!
//! One task per contributing backend is spawned on the Tokio runtime; a
//! semaphore caps how many of them talk to backends at once. Callers past
//! the cap queue on the semaphore.

use std::future::Future;
use std::sync::Arc;

use futures::future::join_all;
use geofed_core::{BackendError, BackendRef, BackendResult};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio::task::JoinHandle;

use crate::error::AggregateError;

/// A backend task that failed, with the backend it ran against
#[derive(Debug)]
pub(crate) struct TaskFailure {
    pub backend: BackendRef,
    pub source: BackendError,
}

impl TaskFailure {
    pub fn into_read_error(self) -> AggregateError {
        AggregateError::BackendRead {
            backend: self.backend,
            source: self.source,
        }
    }

    pub fn into_configuration_error(self) -> AggregateError {
        AggregateError::Configuration {
            backend: self.backend,
            source: self.source,
        }
    }
}

/// Semaphore-bounded task pool
#[derive(Debug, Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    max_permits: usize,
}

impl WorkerPool {
    /// Pool running at most `max_concurrent` tasks at once (minimum 1)
    pub fn new(max_concurrent: usize) -> Self {
        let max_permits = max_concurrent.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(max_permits)),
            max_permits,
        }
    }

    pub fn max_permits(&self) -> usize {
        self.max_permits
    }

    /// Permits not currently held
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Wait for a slot; the slot is released when the permit drops.
    ///
    /// The semaphore is never closed, so this only returns `None` if that
    /// invariant is broken.
    pub async fn acquire(&self) -> Option<SemaphorePermit<'_>> {
        self.semaphore.acquire().await.ok()
    }

    /// Spawn `task`, running it once a slot is free
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await.ok();
            task.await
        })
    }

    /// Run one task per backend and wait for all of them.
    ///
    /// Results come back in input order. The first failure in input order
    /// is reported; every task has finished by then. Dropping the returned
    /// future aborts the tasks still running.
    pub(crate) async fn gather<T, F>(
        &self,
        jobs: Vec<(BackendRef, F)>,
    ) -> Result<Vec<T>, TaskFailure>
    where
        F: Future<Output = BackendResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (backends, handles): (Vec<_>, Vec<_>) = jobs
            .into_iter()
            .map(|(backend, job)| (backend, self.spawn(job)))
            .unzip();
        let mut tasks = AbortOnDrop(handles);
        let joined = join_all(tasks.0.iter_mut()).await;

        let mut results = Vec::with_capacity(backends.len());
        for (backend, joined) in backends.into_iter().zip(joined) {
            match joined {
                Ok(Ok(value)) => results.push(value),
                Ok(Err(source)) => return Err(TaskFailure { backend, source }),
                Err(join_error) => {
                    return Err(TaskFailure {
                        backend,
                        source: BackendError::Internal(format!(
                            "backend task failed: {}",
                            join_error
                        )),
                    })
                }
            }
        }
        Ok(results)
    }
}

/// Aborts spawned tasks that are still running when dropped
struct AbortOnDrop<T>(Vec<JoinHandle<T>>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        for handle in &self.0 {
            handle.abort();
        }
    }
}
