//! Global bound on in-flight fetches
//!
//! Every domain crawler of a run shares one `FetchPool`. A permit is held
//! only while a page is being fetched, never while parsing or queueing.

use std::sync::Arc;
use tokio::sync::{AcquireError, OwnedSemaphorePermit, Semaphore};

#[derive(Debug, Clone)]
pub struct FetchPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl FetchPool {
    /// Creates a pool allowing `size` concurrent fetches
    ///
    /// A size of zero is treated as one.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    /// Waits for a fetch slot
    ///
    /// Fails only once the pool has been closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, AcquireError> {
        Arc::clone(&self.semaphore).acquire_owned().await
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Slots not currently held by a fetch
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Closes the pool; pending and future acquisitions fail
    pub fn close(&self) {
        self.semaphore.close();
    }
}
