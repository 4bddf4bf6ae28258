use crate::CollectionState;
use aprando_game::{Item, PlayerId};
use hashbrown::HashMap;
use std::any::Any;

/// Per-world callbacks fired when a player's item multiset changes.
pub trait StateHook: Send + Sync {
    fn init(&self, _state: &mut CollectionState, _player: PlayerId) {}
    fn collected(&self, _state: &mut CollectionState, _player: PlayerId, _item: &Item) {}
    fn removed(&self, _state: &mut CollectionState, _player: PlayerId, _item: &Item) {}
}

pub trait AuxState: Any + Send + Sync {
    fn clone_box(&self) -> Box<dyn AuxState>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any + Clone + Send + Sync> AuxState for T {
    fn clone_box(&self) -> Box<dyn AuxState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

// Opaque per-(player, world kind) blobs carried along with a CollectionState.
#[derive(Default)]
pub struct AuxTable {
    entries: HashMap<(PlayerId, &'static str), Box<dyn AuxState>>,
}

impl Clone for AuxTable {
    fn clone(&self) -> Self {
        AuxTable {
            entries: self
                .entries
                .iter()
                .map(|(k, v)| (*k, (**v).clone_box()))
                .collect(),
        }
    }
}

impl AuxTable {
    pub fn insert<T: AuxState>(&mut self, player: PlayerId, kind: &'static str, value: T) {
        self.entries.insert((player, kind), Box::new(value));
    }

    pub fn get<T: Any>(&self, player: PlayerId, kind: &'static str) -> Option<&T> {
        self.entries
            .get(&(player, kind))
            .and_then(|b| (**b).as_any().downcast_ref::<T>())
    }

    pub fn get_mut<T: Any>(&mut self, player: PlayerId, kind: &'static str) -> Option<&mut T> {
        self.entries
            .get_mut(&(player, kind))
            .and_then(|b| (**b).as_any_mut().downcast_mut::<T>())
    }

    pub fn remove(&mut self, player: PlayerId, kind: &'static str) -> bool {
        self.entries.remove(&(player, kind)).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Combat {
        offense: u32,
        dirty: bool,
    }

    #[test]
    fn aux_table_roundtrip() {
        let mut table = AuxTable::default();
        table.insert(
            0,
            "combat",
            Combat {
                offense: 3,
                dirty: false,
            },
        );
        assert_eq!(table.get::<Combat>(0, "combat").map(|c| c.offense), Some(3));
        assert!(table.get::<Combat>(1, "combat").is_none());
        assert!(table.get::<u32>(0, "combat").is_none());

        let copy = table.clone();
        if let Some(c) = table.get_mut::<Combat>(0, "combat") {
            c.dirty = true;
        }
        assert_eq!(
            copy.get::<Combat>(0, "combat").map(|c| c.dirty),
            Some(false)
        );
        assert_eq!(
            table.get::<Combat>(0, "combat").map(|c| c.dirty),
            Some(true)
        );
        assert!(table.remove(0, "combat"));
        assert!(table.is_empty());
    }
}
