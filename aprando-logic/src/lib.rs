// TODO: consider removing this later. It's not a bad lint but I don't want to deal with it now.
#![allow(clippy::too_many_arguments)]

pub mod helpers;
pub mod hooks;

pub use helpers::Rule;
pub use hooks::{AuxState, AuxTable, StateHook};

use aprando_game::{EntranceIdx, Item, LocationIdx, PlayerId, RegionIdx};
use hashbrown::{HashMap, HashSet};
use std::sync::Arc;

/// Memoized reachability for one player.
///
/// While every rule is monotone, `regions` only grows as items are collected, so a stale cache is
/// resumed from the `blocked` frontier instead of being recomputed from scratch. An empty
/// `regions` set means the traversal has not been seeded yet.
#[derive(Clone, Debug)]
pub struct ReachableCache {
    pub regions: HashSet<RegionIdx>,
    pub blocked: Vec<EntranceIdx>,
    pub stale: bool,
}

impl Default for ReachableCache {
    fn default() -> Self {
        ReachableCache {
            regions: HashSet::new(),
            blocked: vec![],
            stale: true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ItemLinkGroup {
    pub group: PlayerId,
    pub members: Vec<PlayerId>,
}

#[derive(Clone)]
pub struct CollectionState {
    pub prog_items: Vec<HashMap<String, u32>>,
    pub reachable: Vec<ReachableCache>,
    pub checked_locations: HashSet<LocationIdx>,
    pub aux: AuxTable,
    // Item taken from each checked location, as (name, owning player).
    location_items: HashMap<LocationIdx, (String, PlayerId)>,
    hooks: Vec<Option<Arc<dyn StateHook>>>,
    link_members: Vec<Vec<PlayerId>>,
}

impl CollectionState {
    pub fn new(num_players: usize) -> Self {
        CollectionState {
            prog_items: vec![HashMap::new(); num_players],
            reachable: vec![ReachableCache::default(); num_players],
            checked_locations: HashSet::new(),
            aux: AuxTable::default(),
            location_items: HashMap::new(),
            hooks: vec![None; num_players],
            link_members: vec![vec![]; num_players],
        }
    }

    /// Creates a state and runs each installed hook's `init` for its player.
    pub fn with_hooks(hooks: Vec<Option<Arc<dyn StateHook>>>) -> Self {
        let mut state = CollectionState::new(hooks.len());
        state.hooks = hooks;
        for player in 0..state.num_players() {
            if let Some(hook) = state.hooks[player].clone() {
                hook.init(&mut state, player);
            }
        }
        state
    }

    pub fn num_players(&self) -> usize {
        self.prog_items.len()
    }

    pub fn add_link_group(&mut self, link: &ItemLinkGroup) {
        self.check_player(link.group);
        for &m in &link.members {
            self.check_player(m);
        }
        self.link_members[link.group] = link.members.clone();
    }

    fn check_player(&self, player: PlayerId) {
        assert!(
            player < self.num_players(),
            "player {} out of range (num_players = {})",
            player,
            self.num_players()
        );
    }

    fn items(&self, player: PlayerId) -> &HashMap<String, u32> {
        self.check_player(player);
        &self.prog_items[player]
    }

    // The owning player first, followed by link members when the owner is a group slot.
    fn credited_players(&self, player: PlayerId) -> Vec<PlayerId> {
        self.check_player(player);
        let mut out = vec![player];
        out.extend(self.link_members[player].iter().copied());
        out
    }

    pub fn count(&self, name: &str, player: PlayerId) -> u32 {
        self.items(player).get(name).copied().unwrap_or(0)
    }

    pub fn has(&self, name: &str, player: PlayerId) -> bool {
        self.count(name, player) >= 1
    }

    pub fn has_count(&self, name: &str, player: PlayerId, count: u32) -> bool {
        self.count(name, player) >= count
    }

    pub fn has_any<S: AsRef<str>>(&self, names: &[S], player: PlayerId) -> bool {
        let items = self.items(player);
        names.iter().any(|n| items.contains_key(n.as_ref()))
    }

    pub fn has_all<S: AsRef<str>>(&self, names: &[S], player: PlayerId) -> bool {
        let items = self.items(player);
        names.iter().all(|n| items.contains_key(n.as_ref()))
    }

    pub fn count_from_list<S: AsRef<str>>(&self, names: &[S], player: PlayerId) -> u32 {
        let items = self.items(player);
        names
            .iter()
            .map(|n| items.get(n.as_ref()).copied().unwrap_or(0))
            .sum()
    }

    pub fn count_unique<S: AsRef<str>>(&self, names: &[S], player: PlayerId) -> u32 {
        let items = self.items(player);
        let distinct: HashSet<&str> = names
            .iter()
            .map(|n| n.as_ref())
            .filter(|n| items.contains_key(*n))
            .collect();
        distinct.len() as u32
    }

    pub fn has_from_list<S: AsRef<str>>(&self, names: &[S], player: PlayerId, count: u32) -> bool {
        self.count_from_list(names, player) >= count
    }

    pub fn has_from_list_unique<S: AsRef<str>>(
        &self,
        names: &[S],
        player: PlayerId,
        count: u32,
    ) -> bool {
        self.count_unique(names, player) >= count
    }

    /// Adds a progression item to the state. Returns false (and leaves the state untouched)
    /// for any other classification.
    pub fn collect(&mut self, item: &Item) -> bool {
        if !item.is_progression() {
            return false;
        }
        for player in self.credited_players(item.player) {
            *self.prog_items[player].entry(item.name.clone()).or_insert(0) += 1;
            self.reachable[player].stale = true;
            if let Some(hook) = self.hooks[player].clone() {
                hook.collected(self, player, item);
            }
        }
        true
    }

    /// Marks `location` as checked and collects the item found there. Removing that item later
    /// unchecks the location again.
    pub fn collect_from_location(&mut self, location: LocationIdx, item: &Item) -> bool {
        self.checked_locations.insert(location);
        self.location_items
            .insert(location, (item.name.clone(), item.player));
        self.collect(item)
    }

    /// Takes one copy of a progression item back out of the state. Returns false, changing
    /// nothing, when the item is not progression or its owner holds no copy.
    pub fn remove(&mut self, item: &Item) -> bool {
        if !item.is_progression() || !self.has(&item.name, item.player) {
            return false;
        }
        for player in self.credited_players(item.player) {
            let items = &mut self.prog_items[player];
            if let Some(cnt) = items.get_mut(&item.name) {
                *cnt -= 1;
                if *cnt == 0 {
                    items.remove(&item.name);
                }
            }
            self.reachable[player] = ReachableCache::default();
            if let Some(hook) = self.hooks[player].clone() {
                hook.removed(self, player, item);
            }
        }
        self.uncheck_surplus_locations(item);
        true
    }

    // Checked locations holding `item` can't outnumber the copies still held, so a sweep picks
    // the surplus back up.
    fn uncheck_surplus_locations(&mut self, item: &Item) {
        let mut holding: Vec<LocationIdx> = self
            .location_items
            .iter()
            .filter(|(_, (name, player))| *name == item.name && *player == item.player)
            .map(|(&loc, _)| loc)
            .collect();
        holding.sort_unstable();
        let remaining = self.count(&item.name, item.player) as usize;
        for loc in holding.into_iter().skip(remaining) {
            self.checked_locations.remove(&loc);
            self.location_items.remove(&loc);
        }
    }

    /// Drops memoized reachability for a player, e.g. after its rules were rewritten.
    pub fn invalidate(&mut self, player: PlayerId) {
        self.check_player(player);
        self.reachable[player] = ReachableCache::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aprando_game::ItemClassification;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn prog(name: &str, player: PlayerId) -> Item {
        Item::new(name, ItemClassification::Progression, Some(1), player)
    }

    #[test]
    fn collect_counts_only_progression() {
        let mut state = CollectionState::new(2);
        assert!(state.collect(&prog("Key", 0)));
        assert!(state.collect(&prog("Key", 0)));
        let filler = Item::new("Rupee", ItemClassification::Filler, Some(2), 0);
        assert!(!state.collect(&filler));
        assert_eq!(state.count("Key", 0), 2);
        assert_eq!(state.count("Key", 1), 0);
        assert_eq!(state.count("Rupee", 0), 0);
        assert!(state.has_count("Key", 0, 2));
        assert!(!state.has_count("Key", 0, 3));
    }

    #[test]
    fn list_queries() {
        let mut state = CollectionState::new(1);
        state.collect(&prog("A", 0));
        state.collect(&prog("A", 0));
        state.collect(&prog("B", 0));
        let empty: [&str; 0] = [];
        assert!(state.has_all(&empty, 0));
        assert!(!state.has_any(&empty, 0));
        assert!(state.has_any(&["C", "B"], 0));
        assert!(!state.has_all(&["A", "C"], 0));
        assert_eq!(state.count_from_list(&["A", "B", "C"], 0), 3);
        assert_eq!(state.count_unique(&["A", "B", "C", "A"], 0), 2);
        assert!(state.has_from_list(&["A", "B"], 0, 3));
        assert!(!state.has_from_list_unique(&["A", "B"], 0, 3));
    }

    #[test]
    fn remove_restores_count_and_clears_cache() {
        let mut state = CollectionState::new(1);
        state.collect(&prog("A", 0));
        state.reachable[0].regions.insert(0);
        state.reachable[0].stale = false;
        assert!(state.remove(&prog("A", 0)));
        assert_eq!(state.count("A", 0), 0);
        assert!(state.reachable[0].regions.is_empty());
        assert!(state.reachable[0].stale);
    }

    #[test]
    fn remove_uncollected_is_a_no_op() {
        let mut state = CollectionState::new(2);
        state.collect(&prog("A", 1));
        state.reachable[0].stale = false;
        assert!(!state.remove(&prog("A", 0)));
        assert!(!state.reachable[0].stale);
        assert_eq!(state.count("A", 1), 1);
        assert!(state.remove(&prog("A", 1)));
        assert!(!state.remove(&prog("A", 1)));
        assert_eq!(state.count("A", 1), 0);
    }

    #[test]
    fn remove_unchecks_source_location() {
        let mut state = CollectionState::new(1);
        state.collect_from_location(3, &prog("A", 0));
        state.collect_from_location(5, &prog("A", 0));
        state.collect_from_location(7, &prog("B", 0));
        state.collect(&prog("A", 0));
        // A loose copy is removed first; both locations stay accounted for.
        state.remove(&prog("A", 0));
        assert_eq!(state.checked_locations.len(), 3);
        state.remove(&prog("A", 0));
        assert!(state.checked_locations.contains(&3));
        assert!(!state.checked_locations.contains(&5));
        assert!(state.checked_locations.contains(&7));
        state.collect_from_location(5, &prog("A", 0));
        assert_eq!(state.count("A", 0), 2);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn player_out_of_range_panics() {
        let state = CollectionState::new(1);
        state.has("A", 3);
    }

    #[test]
    fn link_group_credits_members() {
        let mut state = CollectionState::new(3);
        state.add_link_group(&ItemLinkGroup {
            group: 2,
            members: vec![0, 1],
        });
        state.collect(&prog("Hookshot", 2));
        assert!(state.has("Hookshot", 0));
        assert!(state.has("Hookshot", 1));
        assert!(state.has("Hookshot", 2));
        state.remove(&prog("Hookshot", 2));
        assert!(!state.has("Hookshot", 0));
    }

    struct CountingHook {
        calls: Arc<AtomicUsize>,
    }

    impl StateHook for CountingHook {
        fn collected(&self, state: &mut CollectionState, player: PlayerId, _item: &Item) {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let n = state.count("A", player) as usize;
            state.aux.insert(player, "counting", n);
        }
    }

    #[test]
    fn hooks_fire_on_collect() {
        let calls = Arc::new(AtomicUsize::new(0));
        let hook: Arc<dyn StateHook> = Arc::new(CountingHook {
            calls: calls.clone(),
        });
        let mut state = CollectionState::with_hooks(vec![Some(hook), None]);
        state.collect(&prog("A", 0));
        state.collect(&prog("A", 1));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(state.aux.get::<usize>(0, "counting"), Some(&1));
        let copy = state.clone();
        assert_eq!(copy.aux.get::<usize>(0, "counting"), Some(&1));
    }
}
