//! Failure injection.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use taskd_core::{Item, ItemDraft, ItemError, ItemId, ItemResult, RequestContext};

use crate::store::ItemStore;

/// Names a single store operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// [`ItemStore::list`].
    List,
    /// [`ItemStore::get`].
    Get,
    /// [`ItemStore::create`].
    Create,
    /// [`ItemStore::update`].
    Update,
    /// [`ItemStore::delete`].
    Delete,
}

type FailureFn = Arc<dyn Fn() -> ItemError + Send + Sync>;

/// Store wrapper that fails chosen operations on demand.
///
/// The context is still checked first, so the cancellation contract holds
/// for injected failures too. Operations without an injected failure are
/// delegated to the wrapped store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskd_core::{ErrorKind, ItemError, RequestContext};
/// use taskd_store::{FailingStore, ItemStore, MemoryStore, StoreOperation};
///
/// let store = FailingStore::new(Arc::new(MemoryStore::new()));
/// store.fail_with(StoreOperation::List, || ItemError::internal("index corrupted"));
///
/// let err = store.list(&RequestContext::new()).unwrap_err();
/// assert_eq!(err.kind(), ErrorKind::Internal);
/// ```
pub struct FailingStore {
    inner: Arc<dyn ItemStore>,
    failures: Mutex<HashMap<StoreOperation, FailureFn>>,
}

impl FailingStore {
    /// Wraps `inner` with no failures injected.
    #[must_use]
    pub fn new(inner: Arc<dyn ItemStore>) -> Self {
        Self {
            inner,
            failures: Mutex::new(HashMap::new()),
        }
    }

    /// Makes every call to `operation` fail with the error built by `make`.
    pub fn fail_with<F>(&self, operation: StoreOperation, make: F)
    where
        F: Fn() -> ItemError + Send + Sync + 'static,
    {
        self.failures.lock().insert(operation, Arc::new(make));
    }

    /// Stops injecting failures into `operation`.
    pub fn clear(&self, operation: StoreOperation) {
        self.failures.lock().remove(&operation);
    }

    /// Stops injecting failures altogether.
    pub fn clear_all(&self) {
        self.failures.lock().clear();
    }

    fn guard(&self, ctx: &RequestContext, operation: StoreOperation) -> ItemResult<()> {
        ctx.check()?;
        let make = self.failures.lock().get(&operation).cloned();
        match make {
            Some(make) => Err(make()),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for FailingStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut failing: Vec<StoreOperation> = self.failures.lock().keys().copied().collect();
        failing.sort_by_key(|op| *op as u8);
        f.debug_struct("FailingStore")
            .field("failing", &failing)
            .finish_non_exhaustive()
    }
}

impl ItemStore for FailingStore {
    fn list(&self, ctx: &RequestContext) -> ItemResult<Vec<Item>> {
        self.guard(ctx, StoreOperation::List)?;
        self.inner.list(ctx)
    }

    fn get(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<Item> {
        self.guard(ctx, StoreOperation::Get)?;
        self.inner.get(ctx, id)
    }

    fn create(&self, ctx: &RequestContext, draft: ItemDraft) -> ItemResult<Item> {
        self.guard(ctx, StoreOperation::Create)?;
        self.inner.create(ctx, draft)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        id: ItemId,
        mutate: &mut dyn FnMut(&mut Item),
    ) -> ItemResult<Item> {
        self.guard(ctx, StoreOperation::Update)?;
        self.inner.update(ctx, id, mutate)
    }

    fn delete(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<()> {
        self.guard(ctx, StoreOperation::Delete)?;
        self.inner.delete(ctx, id)
    }
}
