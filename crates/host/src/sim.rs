//! In-memory environment used by the console and tests.

use std::collections::BTreeMap;

use edutools_core::{ActorId, HelperId};
use tracing::debug;

use crate::environment::Environment;

/// Default number of inventory slots per actor.
pub const DEFAULT_INVENTORY_SLOTS: usize = 36;

/// Simulated environment: actors join and leave, carry items, and helpers are
/// plain ids.
#[derive(Debug, Clone)]
pub struct SimEnvironment {
    slots: usize,
    actors: BTreeMap<ActorId, Vec<Option<String>>>,
    helpers: BTreeMap<HelperId, ActorId>,
    next_helper: u64,
}

impl Default for SimEnvironment {
    fn default() -> Self {
        Self::new(DEFAULT_INVENTORY_SLOTS)
    }
}

impl SimEnvironment {
    /// Create an empty environment whose actors have `slots` inventory slots.
    pub fn new(slots: usize) -> Self {
        Self {
            slots,
            actors: BTreeMap::new(),
            helpers: BTreeMap::new(),
            next_helper: 0,
        }
    }

    /// Connect an actor with an empty inventory. Returns `false` if already online.
    pub fn join(&mut self, actor: ActorId) -> bool {
        if self.actors.contains_key(&actor) {
            return false;
        }
        debug!(actor = %actor, "actor joined");
        self.actors.insert(actor, vec![None; self.slots]);
        true
    }

    /// Disconnect an actor. Helpers spawned for it are left behind.
    pub fn leave(&mut self, actor: &ActorId) -> bool {
        let left = self.actors.remove(actor).is_some();
        if left {
            debug!(actor = %actor, "actor left");
        }
        left
    }

    /// Put an item in the first empty slot. Returns the slot used.
    pub fn give(&mut self, actor: &ActorId, item: impl Into<String>) -> Option<usize> {
        let inventory = self.actors.get_mut(actor)?;
        let slot = inventory.iter().position(Option::is_none)?;
        inventory[slot] = Some(item.into());
        Some(slot)
    }

    /// Items the actor carries, with their slots.
    pub fn inventory(&self, actor: &ActorId) -> Vec<(usize, String)> {
        self.actors
            .get(actor)
            .map(|inventory| {
                inventory
                    .iter()
                    .enumerate()
                    .filter_map(|(slot, item)| item.clone().map(|item| (slot, item)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Environment for SimEnvironment {
    fn online_actors(&self) -> Vec<ActorId> {
        self.actors.keys().cloned().collect()
    }

    fn is_online(&self, actor: &ActorId) -> bool {
        self.actors.contains_key(actor)
    }

    fn inventory_size(&self, actor: &ActorId) -> usize {
        self.actors.get(actor).map_or(0, Vec::len)
    }

    fn inventory_slot(&self, actor: &ActorId, slot: usize) -> Option<String> {
        self.actors.get(actor)?.get(slot)?.clone()
    }

    fn clear_slot(&mut self, actor: &ActorId, slot: usize) -> Option<String> {
        self.actors.get_mut(actor)?.get_mut(slot)?.take()
    }

    fn spawn_helper(&mut self, owner: &ActorId) -> HelperId {
        self.next_helper += 1;
        let helper = HelperId::new(format!("helper-{}", self.next_helper));
        debug!(helper = %helper, owner = %owner, "helper spawned");
        self.helpers.insert(helper.clone(), owner.clone());
        helper
    }

    fn despawn_helper(&mut self, helper: &HelperId) -> bool {
        self.helpers.remove(helper).is_some()
    }

    fn helpers(&self) -> Vec<HelperId> {
        self.helpers.keys().cloned().collect()
    }

    fn helper_owner(&self, helper: &HelperId) -> Option<ActorId> {
        self.helpers.get(helper).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_give_and_clear() {
        let mut env = SimEnvironment::new(3);
        let alex = ActorId::from("alex");
        assert!(env.join(alex.clone()));
        assert!(!env.join(alex.clone()));

        assert_eq!(env.give(&alex, "minecraft:tnt"), Some(0));
        assert_eq!(env.give(&alex, "minecraft:bread"), Some(1));
        assert_eq!(env.inventory_slot(&alex, 0).as_deref(), Some("minecraft:tnt"));
        assert_eq!(env.clear_slot(&alex, 0).as_deref(), Some("minecraft:tnt"));
        assert_eq!(env.clear_slot(&alex, 0), None);
        assert_eq!(env.inventory(&alex), vec![(1, "minecraft:bread".to_string())]);
        assert_eq!(env.inventory_size(&alex), 3);
    }

    #[test]
    fn test_full_inventory_and_offline_actor() {
        let mut env = SimEnvironment::new(1);
        let alex = ActorId::from("alex");
        env.join(alex.clone());
        env.give(&alex, "minecraft:dirt");
        assert_eq!(env.give(&alex, "minecraft:dirt"), None);

        assert!(env.leave(&alex));
        assert_eq!(env.inventory_size(&alex), 0);
        assert_eq!(env.give(&alex, "minecraft:dirt"), None);
    }

    #[test]
    fn test_helpers_outlive_owner() {
        let mut env = SimEnvironment::default();
        let alex = ActorId::from("alex");
        env.join(alex.clone());
        let helper = env.spawn_helper(&alex);
        env.leave(&alex);

        assert_eq!(env.helpers(), vec![helper.clone()]);
        assert_eq!(env.helper_owner(&helper), Some(alex));
        assert!(env.despawn_helper(&helper));
        assert!(!env.despawn_helper(&helper));
    }
}
