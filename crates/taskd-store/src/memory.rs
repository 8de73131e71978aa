//! In-memory item store.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use taskd_core::{Item, ItemDraft, ItemError, ItemId, ItemResult, RequestContext};

use crate::store::ItemStore;

/// Map and identity counter, guarded together.
#[derive(Debug)]
struct Inner {
    items: HashMap<ItemId, Item>,
    next_id: ItemId,
}

/// Memory-resident item store.
///
/// Reads share the lock, writes take it exclusively. The identity counter
/// lives under the same lock as the map, so assigning an identity and
/// inserting the item is one critical section.
///
/// # Example
///
/// ```
/// use taskd_core::{ItemDraft, RequestContext};
/// use taskd_store::{ItemStore, MemoryStore};
///
/// let store = MemoryStore::new();
/// let ctx = RequestContext::new();
///
/// let item = store.create(&ctx, ItemDraft::new("Learn Go", "Read docs")).unwrap();
/// assert_eq!(item.id.get(), 1);
/// assert_eq!(store.get(&ctx, item.id).unwrap().title, "Learn Go");
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store whose first identity is 1.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                items: HashMap::new(),
                next_id: ItemId::FIRST,
            }),
        }
    }

    /// Returns the number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().items.len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().items.is_empty()
    }

    /// Returns the identity the next create will assign.
    #[must_use]
    pub fn next_id(&self) -> ItemId {
        self.inner.read().next_id
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemStore for MemoryStore {
    fn list(&self, ctx: &RequestContext) -> ItemResult<Vec<Item>> {
        ctx.check()?;
        let inner = self.inner.read();
        Ok(inner.items.values().cloned().collect())
    }

    fn get(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<Item> {
        ctx.check()?;
        let inner = self.inner.read();
        inner.items.get(&id).cloned().ok_or(ItemError::NotFound)
    }

    fn create(&self, ctx: &RequestContext, draft: ItemDraft) -> ItemResult<Item> {
        ctx.check()?;
        let mut inner = self.inner.write();
        // the lock wait may have outlived the request
        ctx.check()?;

        let id = inner.next_id;
        let item = draft.into_item(id, Utc::now());
        inner.next_id = id.next();
        inner.items.insert(id, item.clone());

        tracing::debug!(item_id = %id, "item stored");
        Ok(item)
    }

    fn update(
        &self,
        ctx: &RequestContext,
        id: ItemId,
        mutate: &mut dyn FnMut(&mut Item),
    ) -> ItemResult<Item> {
        ctx.check()?;
        let mut inner = self.inner.write();
        ctx.check()?;

        let stored = inner.items.get_mut(&id).ok_or(ItemError::NotFound)?;
        let mut next = stored.clone();
        mutate(&mut next);

        next.id = stored.id;
        next.created_at = stored.created_at;
        next.updated_at = Utc::now().max(stored.updated_at);

        *stored = next.clone();
        Ok(next)
    }

    fn delete(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<()> {
        ctx.check()?;
        let mut inner = self.inner.write();
        ctx.check()?;

        inner.items.remove(&id).map(drop).ok_or(ItemError::NotFound)
    }
}
