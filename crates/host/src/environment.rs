//! The simulated world as seen by background mechanics.

use edutools_core::{ActorId, HelperId};

/// Actors, their inventories, and auxiliary helper objects.
///
/// Helpers are tagged with the actor they were spawned for so a sweep can
/// tell whose they were, but the authoritative ownership lives in the
/// mechanics' link registry.
pub trait Environment {
    /// Connected actors, sorted.
    fn online_actors(&self) -> Vec<ActorId>;

    /// Whether `actor` is connected.
    fn is_online(&self, actor: &ActorId) -> bool;

    /// Number of inventory slots the actor has, 0 when offline.
    fn inventory_size(&self, actor: &ActorId) -> usize;

    /// Item type in a slot.
    fn inventory_slot(&self, actor: &ActorId, slot: usize) -> Option<String>;

    /// Empty a slot, returning the removed item type.
    fn clear_slot(&mut self, actor: &ActorId, slot: usize) -> Option<String>;

    /// Spawn a helper object near `owner`.
    fn spawn_helper(&mut self, owner: &ActorId) -> HelperId;

    /// Remove a helper. Returns `false` if it was already gone.
    fn despawn_helper(&mut self, helper: &HelperId) -> bool;

    /// Every live helper, sorted.
    fn helpers(&self) -> Vec<HelperId>;

    /// Owner tag of a live helper.
    fn helper_owner(&self, helper: &HelperId) -> Option<ActorId>;
}
