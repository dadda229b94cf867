use hashbrown::HashMap;
use std::cell::{Cell, RefCell};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::error::{ReconcileError, Result};
use crate::models::Feature;
use crate::overpass::{FeatureQuery, GeodataService};

/// Shared flag that stops a run between records and before lookups.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ReconcileError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Memoizes service responses by query text for the lifetime of a run.
pub struct Lookups<S> {
    service: S,
    cache: RefCell<HashMap<String, Arc<Vec<Feature>>>>,
    cancel: CancelToken,
    issued: Cell<usize>,
}

impl<S: GeodataService> Lookups<S> {
    pub fn new(service: S, cancel: CancelToken) -> Self {
        Self {
            service,
            cache: RefCell::new(HashMap::new()),
            cancel,
            issued: Cell::new(0),
        }
    }

    /// Cached response for `query`, asking the service on a miss.
    pub fn fetch(&self, query: &FeatureQuery) -> Result<Arc<Vec<Feature>>> {
        let key = query.to_ql();
        if let Some(hit) = self.cache.borrow().get(&key) {
            return Ok(Arc::clone(hit));
        }

        self.cancel.check()?;
        debug!("Cache miss: {}", key);
        let features = Arc::new(self.service.query(query)?);
        self.issued.set(self.issued.get() + 1);
        self.cache.borrow_mut().insert(key, Arc::clone(&features));
        Ok(features)
    }

    /// Number of queries actually sent to the service.
    pub fn issued(&self) -> usize {
        self.issued.get()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }
}

impl<S: GeodataService> GeodataService for Lookups<S> {
    fn query(&self, query: &FeatureQuery) -> Result<Vec<Feature>> {
        self.fetch(query).map(|features| features.as_ref().clone())
    }
}
