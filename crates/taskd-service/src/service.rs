//! Item orchestration.

use std::sync::Arc;

use taskd_core::{Item, ItemDraft, ItemId, ItemPatch, ItemResult, RequestContext};
use taskd_store::ItemStore;

/// Orchestrates item operations over a shared store.
///
/// Cloning is cheap; clones share the store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskd_core::{ItemPatch, RequestContext};
/// use taskd_service::ItemService;
/// use taskd_store::MemoryStore;
///
/// let service = ItemService::new(Arc::new(MemoryStore::new()));
/// let ctx = RequestContext::new();
///
/// let item = service.create(&ctx, "Learn Go", Some("Read docs".into())).unwrap();
/// assert!(!item.completed);
///
/// let patch = ItemPatch { completed: Some(true), ..ItemPatch::default() };
/// let item = service.update(&ctx, item.id, &patch).unwrap();
/// assert!(item.completed);
/// assert_eq!(item.title, "Learn Go");
/// ```
#[derive(Clone)]
pub struct ItemService {
    store: Arc<dyn ItemStore>,
}

impl ItemService {
    /// Creates a service over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn ItemStore>) -> Self {
        Self { store }
    }

    /// Returns every item ordered by identity.
    pub fn list_all(&self, ctx: &RequestContext) -> ItemResult<Vec<Item>> {
        let result = self.store.list(ctx).map(|mut items| {
            items.sort_by_key(|item| item.id);
            items
        });
        record(ctx, "list", None, &result);
        result
    }

    /// Returns the item with identity `id`.
    pub fn get_by_id(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<Item> {
        let result = self.store.get(ctx, id);
        record(ctx, "get", Some(id), &result);
        result
    }

    /// Creates an incomplete item.
    ///
    /// A missing description is stored as an empty one.
    pub fn create(
        &self,
        ctx: &RequestContext,
        title: impl Into<String>,
        description: Option<String>,
    ) -> ItemResult<Item> {
        let draft = ItemDraft::new(title, description.unwrap_or_default());
        let result = self.store.create(ctx, draft);
        let id = result.as_ref().ok().map(|item| item.id);
        record(ctx, "create", id, &result);
        result
    }

    /// Applies a sparse patch to the item with identity `id`.
    ///
    /// The patch is applied to the current value inside the store's
    /// exclusive section, so concurrent updates never lose each other's
    /// fields.
    pub fn update(&self, ctx: &RequestContext, id: ItemId, patch: &ItemPatch) -> ItemResult<Item> {
        let result = self
            .store
            .update(ctx, id, &mut |item: &mut Item| patch.apply_to(item));
        record(ctx, "update", Some(id), &result);
        result
    }

    /// Removes the item with identity `id`.
    pub fn delete(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<()> {
        let result = self.store.delete(ctx, id);
        record(ctx, "delete", Some(id), &result);
        result
    }
}

impl std::fmt::Debug for ItemService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemService").finish_non_exhaustive()
    }
}

fn record<T>(ctx: &RequestContext, operation: &'static str, id: Option<ItemId>, result: &ItemResult<T>) {
    let item_id = id.map(ItemId::get);
    match result {
        Ok(_) => tracing::info!(
            request_id = %ctx.request_id(),
            operation,
            item_id,
            outcome = "ok",
            "item operation completed"
        ),
        Err(err) => tracing::warn!(
            request_id = %ctx.request_id(),
            operation,
            item_id,
            outcome = err.kind().as_str(),
            "item operation failed"
        ),
    }
}
