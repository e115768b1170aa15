//! Exclusive access to the shared graph

use crate::store::GraphStore;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use veritas_domain::ClaimId;

/// Owner of the graph store
///
/// The store is only reachable through an [`ActiveClaim`], and at most one
/// exists at a time, so reset → ingest → query sequences never interleave.
#[derive(Clone)]
pub struct GraphLock {
    store: Arc<Mutex<Arc<dyn GraphStore>>>,
}

impl GraphLock {
    /// Take ownership of `store`
    pub fn new(store: Arc<dyn GraphStore>) -> Self {
        Self {
            store: Arc::new(Mutex::new(store)),
        }
    }

    /// Wait for the graph and claim it for `claim_id`
    pub async fn acquire(&self, claim_id: ClaimId) -> ActiveClaim {
        let started = Instant::now();
        let guard = self.store.clone().lock_owned().await;
        debug!("Claim {} acquired the graph after {:?}", claim_id, started.elapsed());
        ActiveClaim { guard, claim_id }
    }

    /// Claim the graph only if it is free
    pub fn try_acquire(&self, claim_id: ClaimId) -> Option<ActiveClaim> {
        let guard = self.store.clone().try_lock_owned().ok()?;
        Some(ActiveClaim { guard, claim_id })
    }
}

impl fmt::Debug for GraphLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphLock").finish_non_exhaustive()
    }
}

/// Token for the single claim currently using the graph
///
/// Dropping it releases the graph.
pub struct ActiveClaim {
    guard: OwnedMutexGuard<Arc<dyn GraphStore>>,
    claim_id: ClaimId,
}

impl ActiveClaim {
    /// The claim holding the graph
    pub fn claim_id(&self) -> ClaimId {
        self.claim_id
    }

    /// The graph store
    pub fn store(&self) -> &dyn GraphStore {
        &**self.guard
    }
}

impl fmt::Debug for ActiveClaim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveClaim")
            .field("claim_id", &self.claim_id)
            .finish_non_exhaustive()
    }
}

impl Drop for ActiveClaim {
    fn drop(&mut self) {
        debug!("Claim {} released the graph", self.claim_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InMemoryGraph;

    #[tokio::test]
    async fn test_single_active_claim() {
        let lock = GraphLock::new(Arc::new(InMemoryGraph::new()));
        let first = lock.acquire(ClaimId::new()).await;

        assert!(lock.try_acquire(ClaimId::new()).is_none());
        drop(first);
        assert!(lock.try_acquire(ClaimId::new()).is_some());
    }

    #[tokio::test]
    async fn test_waiter_gets_graph_after_release() {
        let lock = GraphLock::new(Arc::new(InMemoryGraph::new()));
        let first = lock.acquire(ClaimId::new()).await;
        let second_id = ClaimId::new();

        let waiter = {
            let lock = lock.clone();
            tokio::spawn(async move { lock.acquire(second_id).await.claim_id() })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        drop(first);
        assert_eq!(waiter.await.unwrap(), second_id);
    }
}
