//! The storage capability.

use taskd_core::{Item, ItemDraft, ItemId, ItemResult, RequestContext};

/// Storage for items.
///
/// Implementations must honour the same contract as [`MemoryStore`](crate::MemoryStore):
///
/// - the context is checked first, and a cancelled or expired context fails
///   the call with no mutation
/// - identities are assigned by the store, strictly increasing, never reused
/// - `created_at` never changes after creation and `updated_at` never regresses
/// - a missing identity fails with [`ItemError::NotFound`](taskd_core::ItemError::NotFound)
pub trait ItemStore: Send + Sync {
    /// Returns a snapshot of every stored item, in no particular order.
    fn list(&self, ctx: &RequestContext) -> ItemResult<Vec<Item>>;

    /// Returns a copy of the item with identity `id`.
    fn get(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<Item>;

    /// Assigns the next identity to `draft`, stamps it and stores it.
    fn create(&self, ctx: &RequestContext, draft: ItemDraft) -> ItemResult<Item>;

    /// Applies `mutate` to the stored item in one exclusive section.
    ///
    /// The callback sees the current value. Changes it makes to `id` or
    /// `created_at` are discarded, and `updated_at` is stamped by the store.
    fn update(
        &self,
        ctx: &RequestContext,
        id: ItemId,
        mutate: &mut dyn FnMut(&mut Item),
    ) -> ItemResult<Item>;

    /// Removes the item with identity `id`.
    fn delete(&self, ctx: &RequestContext, id: ItemId) -> ItemResult<()>;
}
