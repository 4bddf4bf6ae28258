use aprando_game::{EntranceIdx, LocationIdx, PlayerId, RegionIdx, StepTrailId};
use aprando_logic::CollectionState;
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;

use crate::multiworld::MultiWorld;

/// Brings the memoized region set of `player` up to date.
///
/// A fresh cache is seeded from the player's Menu region. A stale cache that still holds regions
/// is resumed from its blocked frontier: collecting items can only open monotone entrances, so
/// previously reached regions stay reached and only the entrances that failed last time need
/// another look. If any reached region has a non-monotone exit the cache is rebuilt from Menu.
/// Exits are expanded breadth-first in creation order.
pub fn update_reachable_regions(world: &MultiWorld, state: &mut CollectionState, player: PlayerId) {
    if !state.reachable[player].stale {
        return;
    }
    // Taken out while rules are evaluated against `state`; rules never consult reachability.
    let mut cache = std::mem::take(&mut state.reachable[player]);
    let mut queue: VecDeque<EntranceIdx> = VecDeque::new();
    if cache.regions.is_empty() || has_non_monotone_exit(world, cache.regions.iter().copied()) {
        cache.regions.clear();
        cache.blocked.clear();
        if let Some(menu) = world.menu_region(player) {
            cache.regions.insert(menu);
            queue.extend(world.regions[menu].exits.iter().copied());
        }
    } else {
        queue.extend(std::mem::take(&mut cache.blocked));
    }

    while let Some(entrance_idx) = queue.pop_front() {
        let entrance = &world.entrances[entrance_idx];
        let Some(target) = entrance.connected_region else {
            cache.blocked.push(entrance_idx);
            continue;
        };
        if cache.regions.contains(&target) {
            continue;
        }
        if entrance.access_rule.eval(state) {
            cache.regions.insert(target);
            queue.extend(world.regions[target].exits.iter().copied());
        } else {
            cache.blocked.push(entrance_idx);
        }
    }
    cache.stale = false;
    state.reachable[player] = cache;
}

fn has_non_monotone_exit(world: &MultiWorld, mut regions: impl Iterator<Item = RegionIdx>) -> bool {
    regions.any(|r| {
        world.regions[r]
            .exits
            .iter()
            .any(|&e| !world.entrances[e].access_rule.is_monotone())
    })
}

pub fn can_reach_region(
    world: &MultiWorld,
    state: &mut CollectionState,
    region: RegionIdx,
) -> bool {
    let player = world.regions[region].player;
    update_reachable_regions(world, state, player);
    state.reachable[player].regions.contains(&region)
}

pub fn can_reach_location(
    world: &MultiWorld,
    state: &mut CollectionState,
    location: LocationIdx,
) -> bool {
    let loc = &world.locations[location];
    can_reach_region(world, state, loc.parent_region) && loc.access_rule.eval(state)
}

pub fn can_reach_entrance(
    world: &MultiWorld,
    state: &mut CollectionState,
    entrance: EntranceIdx,
) -> bool {
    let e = &world.entrances[entrance];
    can_reach_region(world, state, e.parent_region) && e.access_rule.eval(state)
}

/// Regions reachable by `player`, computed from scratch without touching the memo.
pub fn reachable_regions(
    world: &MultiWorld,
    state: &CollectionState,
    player: PlayerId,
) -> HashSet<RegionIdx> {
    let mut traverser = Traverser::new(player);
    traverser.traverse(world, state);
    traverser.trail_by_region.keys().copied().collect()
}

/// Reachable locations in creation order, for one player or (with `None`) for everyone.
pub fn get_reachable_locations(
    world: &MultiWorld,
    state: &mut CollectionState,
    player: Option<PlayerId>,
) -> Vec<LocationIdx> {
    let mut out = vec![];
    for i in 0..world.locations.len() {
        if let Some(p) = player {
            if world.locations[i].player != p {
                continue;
            }
        }
        if can_reach_location(world, state, i) {
            out.push(i);
        }
    }
    out
}

#[derive(Clone, Debug)]
pub struct StepTrail {
    pub entrance_idx: EntranceIdx,
    pub prev_trail_id: StepTrailId,
}

/// Breadth-first traversal that remembers, for every region reached, the entrance used to reach
/// it. Paths are recovered by walking the trail back to the Menu region (trail id -1).
#[derive(Clone)]
pub struct Traverser {
    pub player: PlayerId,
    pub step_trails: Vec<StepTrail>,
    pub trail_by_region: HashMap<RegionIdx, StepTrailId>,
    pub blocked: Vec<EntranceIdx>,
    pub step_num: usize,
}

impl Traverser {
    pub fn new(player: PlayerId) -> Self {
        Self {
            player,
            step_trails: vec![],
            trail_by_region: HashMap::new(),
            blocked: vec![],
            step_num: 0,
        }
    }

    /// Extends the traversal under `state`. The first call seeds from Menu; later calls resume
    /// from the entrances that were blocked, so they must see a state that only grew. A
    /// traversal that passed a non-monotone entrance starts over from Menu instead.
    /// Returns the number of newly reached regions.
    pub fn traverse(&mut self, world: &MultiWorld, state: &CollectionState) -> usize {
        let mut queue: VecDeque<EntranceIdx> = VecDeque::new();
        let start_count = self.trail_by_region.len();
        if self.step_num > 0 && has_non_monotone_exit(world, self.trail_by_region.keys().copied()) {
            self.step_trails.clear();
            self.trail_by_region.clear();
            self.blocked.clear();
            self.step_num = 0;
        }
        if self.step_num == 0 {
            if let Some(menu) = world.menu_region(self.player) {
                self.trail_by_region.insert(menu, -1);
                queue.extend(world.regions[menu].exits.iter().copied());
            }
        } else {
            queue.extend(std::mem::take(&mut self.blocked));
        }
        self.step_num += 1;

        while let Some(entrance_idx) = queue.pop_front() {
            let entrance = &world.entrances[entrance_idx];
            let Some(target) = entrance.connected_region else {
                self.blocked.push(entrance_idx);
                continue;
            };
            if self.trail_by_region.contains_key(&target) {
                continue;
            }
            if !entrance.access_rule.eval(state) {
                self.blocked.push(entrance_idx);
                continue;
            }
            let prev_trail_id = self.trail_by_region[&entrance.parent_region];
            let trail_id = self.step_trails.len() as StepTrailId;
            self.step_trails.push(StepTrail {
                entrance_idx,
                prev_trail_id,
            });
            self.trail_by_region.insert(target, trail_id);
            queue.extend(world.regions[target].exits.iter().copied());
        }
        self.trail_by_region.len().saturating_sub(start_count)
    }

    pub fn is_reachable(&self, region: RegionIdx) -> bool {
        self.trail_by_region.contains_key(&region)
    }
}

pub fn get_spoiler_trail_ids(traverser: &Traverser, region: RegionIdx) -> Vec<StepTrailId> {
    let mut trail_id = traverser.trail_by_region[&region];
    let mut steps: Vec<StepTrailId> = Vec::new();
    while trail_id != -1 {
        let step_trail = &traverser.step_trails[trail_id as usize];
        steps.push(trail_id);
        trail_id = step_trail.prev_trail_id;
    }
    steps.reverse();
    steps
}

/// Entrances leading from Menu to `region`, or `None` if the traversal never reached it.
pub fn get_spoiler_trail(traverser: &Traverser, region: RegionIdx) -> Option<Vec<EntranceIdx>> {
    if !traverser.is_reachable(region) {
        return None;
    }
    Some(
        get_spoiler_trail_ids(traverser, region)
            .into_iter()
            .map(|id| traverser.step_trails[id as usize].entrance_idx)
            .collect(),
    )
}

pub fn get_path(
    world: &MultiWorld,
    state: &CollectionState,
    region: RegionIdx,
) -> Option<Vec<EntranceIdx>> {
    let mut traverser = Traverser::new(world.regions[region].player);
    traverser.traverse(world, state);
    get_spoiler_trail(&traverser, region)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use aprando_game::{Item, ItemClassification};
    use aprando_logic::helpers::has;

    fn key(player: PlayerId) -> Item {
        Item::new("Key", ItemClassification::Progression, Some(1), player)
    }

    // Menu -> A -> B (Key) -> C, plus Menu -> C (never).
    fn chain() -> Result<(MultiWorld, PlayerId)> {
        let mut mw = MultiWorld::new();
        let p = mw.add_player("P", "Test");
        for r in ["Menu", "A", "B", "C"] {
            mw.create_region(p, r)?;
        }
        mw.connect(p, "Menu", "A", None, None)?;
        mw.connect(p, "A", "B", None, Some(has("Key", p)))?;
        mw.connect(p, "B", "C", None, None)?;
        mw.connect(
            p,
            "Menu",
            "C",
            Some("Locked Shortcut"),
            Some(aprando_logic::Rule::never()),
        )?;
        Ok((mw, p))
    }

    #[test]
    fn test_resume_from_frontier() -> Result<()> {
        let (mw, p) = chain()?;
        let mut state = mw.new_state();
        let c = mw.get_region("C", p)?;
        assert!(!can_reach_region(&mw, &mut state, c));
        assert_eq!(state.reachable[p].regions.len(), 2);
        assert_eq!(state.reachable[p].blocked.len(), 2);
        state.collect(&key(p));
        assert!(state.reachable[p].stale);
        assert!(can_reach_region(&mw, &mut state, c));
        assert!(!state.reachable[p].stale);
        assert_eq!(
            state.reachable[p].regions,
            reachable_regions(&mw, &state, p)
        );
        Ok(())
    }

    // Menu -> Dark Room, open only while the player does not hold the Curse.
    fn cursed() -> Result<(MultiWorld, PlayerId)> {
        let mut mw = MultiWorld::new();
        let p = mw.add_player("P", "Test");
        for r in ["Menu", "Hall", "Dark Room", "Vault"] {
            mw.create_region(p, r)?;
        }
        mw.connect(p, "Menu", "Hall", None, None)?;
        mw.connect(p, "Hall", "Dark Room", None, Some(!has("Curse", p)))?;
        mw.connect(p, "Hall", "Vault", None, Some(has("Key", p)))?;
        Ok((mw, p))
    }

    #[test]
    fn test_negated_rule_closes_after_collect() -> Result<()> {
        let (mw, p) = cursed()?;
        let mut state = mw.new_state();
        let dark = mw.get_region("Dark Room", p)?;
        let vault = mw.get_region("Vault", p)?;
        assert!(can_reach_region(&mw, &mut state, dark));
        assert!(!can_reach_region(&mw, &mut state, vault));

        let item = |name: &str| Item::new(name, ItemClassification::Progression, Some(1), p);
        state.collect(&item("Curse"));
        assert!(!can_reach_region(&mw, &mut state, dark));
        assert_eq!(
            state.reachable[p].regions,
            reachable_regions(&mw, &state, p)
        );

        state.collect(&item("Key"));
        assert!(can_reach_region(&mw, &mut state, vault));
        assert!(!can_reach_region(&mw, &mut state, dark));
        assert_eq!(
            state.reachable[p].regions,
            reachable_regions(&mw, &state, p)
        );

        state.remove(&item("Curse"));
        assert!(can_reach_region(&mw, &mut state, dark));
        assert_eq!(state.reachable[p].regions.len(), 4);
        Ok(())
    }

    #[test]
    fn test_traverser_restarts_past_negated_rule() -> Result<()> {
        let (mw, p) = cursed()?;
        let mut state = mw.new_state();
        let mut traverser = Traverser::new(p);
        assert_eq!(traverser.traverse(&mw, &state), 3);
        state.collect(&Item::new("Curse", ItemClassification::Progression, Some(1), p));
        traverser.traverse(&mw, &state);
        let dark = mw.get_region("Dark Room", p)?;
        assert!(!traverser.is_reachable(dark));
        assert!(get_spoiler_trail(&traverser, dark).is_none());
        Ok(())
    }

    #[test]
    fn test_path() -> Result<()> {
        let (mw, p) = chain()?;
        let mut state = mw.new_state();
        let c = mw.get_region("C", p)?;
        assert!(get_path(&mw, &state, c).is_none());
        state.collect(&key(p));
        let path = get_path(&mw, &state, c).unwrap_or_default();
        let names: Vec<&str> = path.iter().map(|&e| mw.entrances[e].name.as_str()).collect();
        assert_eq!(names, vec!["Menu -> A", "A -> B", "B -> C"]);
        let menu = mw.get_region("Menu", p)?;
        assert_eq!(get_path(&mw, &state, menu), Some(vec![]));
        Ok(())
    }

    #[test]
    fn test_traverser_resumes() -> Result<()> {
        let (mw, p) = chain()?;
        let mut state = mw.new_state();
        let mut traverser = Traverser::new(p);
        assert_eq!(traverser.traverse(&mw, &state), 2);
        state.collect(&key(p));
        assert_eq!(traverser.traverse(&mw, &state), 2);
        assert_eq!(traverser.traverse(&mw, &state), 0);
        let c = mw.get_region("C", p)?;
        assert_eq!(get_spoiler_trail_ids(&traverser, c).len(), 3);
        Ok(())
    }
}
