use aprando_game::{LocationIdx, PlayerId};
use aprando_logic::CollectionState;
use log::debug;

use crate::multiworld::MultiWorld;
use crate::traverse::{can_reach_location, get_reachable_locations};

fn sweep(world: &MultiWorld, state: &mut CollectionState, events_only: bool) -> usize {
    let mut num_collected = 0;
    loop {
        let mut progress = false;
        for i in 0..world.locations.len() {
            let loc = &world.locations[i];
            if events_only && !loc.is_event() {
                continue;
            }
            let Some(item) = &loc.item else {
                continue;
            };
            if state.checked_locations.contains(&i) || !can_reach_location(world, state, i) {
                continue;
            }
            if state.collect_from_location(i, item) {
                num_collected += 1;
            }
            progress = true;
        }
        if !progress {
            break;
        }
    }
    num_collected
}

/// Collects locked items from reachable event locations until nothing new opens up.
pub fn sweep_for_events(world: &MultiWorld, state: &mut CollectionState) -> usize {
    let n = sweep(world, state, true);
    debug!("event sweep collected {n} items");
    n
}

/// Like `sweep_for_events`, but also collects from filled non-event locations.
pub fn sweep_for_advancements(world: &MultiWorld, state: &mut CollectionState) -> usize {
    sweep(world, state, false)
}

pub fn has_beaten_game(world: &MultiWorld, state: &CollectionState, player: PlayerId) -> bool {
    world.completion_conditions[player].eval(state)
}

/// Every real player can reach their goal from `state` once events are swept.
pub fn can_beat_game(world: &MultiWorld, state: &CollectionState) -> bool {
    let mut state = state.clone();
    sweep_for_events(world, &mut state);
    world
        .real_players()
        .all(|p| has_beaten_game(world, &state, p))
}

/// A state holding the whole item pool and precollected items, swept for placed items.
pub fn get_all_state(world: &MultiWorld) -> CollectionState {
    let mut state = world.new_state();
    for item in &world.itempool {
        state.collect(item);
    }
    sweep_for_advancements(world, &mut state);
    state
}

/// Playthrough spheres: each sphere is the set of filled locations newly reachable once
/// everything from the previous spheres is collected.
pub fn get_spheres(world: &MultiWorld, state: &CollectionState) -> Vec<Vec<LocationIdx>> {
    let mut state = state.clone();
    let mut spheres = vec![];
    loop {
        let sphere: Vec<LocationIdx> = get_reachable_locations(world, &mut state, None)
            .into_iter()
            .filter(|i| {
                world.locations[*i].item.is_some() && !state.checked_locations.contains(i)
            })
            .collect();
        if sphere.is_empty() {
            break;
        }
        for &i in &sphere {
            if let Some(item) = &world.locations[i].item {
                state.collect_from_location(i, item);
            }
        }
        spheres.push(sphere);
    }
    spheres
}

pub fn unreachable_locations(world: &MultiWorld, state: &mut CollectionState) -> Vec<LocationIdx> {
    (0..world.locations.len())
        .filter(|&i| !can_reach_location(world, state, i))
        .collect()
}
