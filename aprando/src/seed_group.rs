use anyhow::{bail, Result};
use aprando_game::PlayerId;
use hashbrown::HashMap;
use std::any::Any;

/// Settings that several players can share by joining the same named group.
pub trait MergeSettings: Clone {
    /// Folds `other` (belonging to `player_name`) into the group's settings.
    fn merge(&mut self, other: &Self, group: &str, player_name: &str) -> Result<()>;
}

pub struct SeedGroup<S> {
    pub settings: S,
    pub members: Vec<PlayerId>,
}

/// Named groups of players whose settings are merged into one. The first member's settings
/// seed the group and every later member is merged in.
pub struct SeedGroups<S: MergeSettings> {
    groups: HashMap<String, SeedGroup<S>>,
}

impl<S: MergeSettings> Default for SeedGroups<S> {
    fn default() -> Self {
        SeedGroups {
            groups: HashMap::new(),
        }
    }
}

impl<S: MergeSettings> SeedGroups<S> {
    pub fn join(
        &mut self,
        group: &str,
        player: PlayerId,
        player_name: &str,
        settings: &S,
    ) -> Result<()> {
        match self.groups.get_mut(group) {
            None => {
                self.groups.insert(
                    group.to_string(),
                    SeedGroup {
                        settings: settings.clone(),
                        members: vec![player],
                    },
                );
            }
            Some(g) => {
                g.settings.merge(settings, group, player_name)?;
                g.members.push(player);
            }
        }
        Ok(())
    }

    pub fn get(&self, group: &str) -> Option<&SeedGroup<S>> {
        self.groups.get(group)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Per-generation shared state handed to every world during the merge stage, keyed by game.
#[derive(Default)]
pub struct MergeContext {
    entries: HashMap<&'static str, Box<dyn Any>>,
}

impl MergeContext {
    pub fn get_or_default<T: Any + Default>(&mut self, key: &'static str) -> Result<&mut T> {
        let entry = self
            .entries
            .entry(key)
            .or_insert_with(|| Box::new(T::default()) as Box<dyn Any>);
        match entry.downcast_mut::<T>() {
            Some(x) => Ok(x),
            None => bail!("merge context entry '{key}' has an unexpected type"),
        }
    }

    pub fn get<T: Any>(&self, key: &'static str) -> Option<&T> {
        self.entries.get(key).and_then(|x| x.downcast_ref::<T>())
    }
}
