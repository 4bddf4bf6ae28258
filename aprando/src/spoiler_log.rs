use aprando_game::{EntranceIdx, LocationIdx};
use serde::{Deserialize, Serialize};

use crate::generate::Generator;
use crate::multiworld::MultiWorld;
use crate::sweep::{get_all_state, get_spheres, unreachable_locations};
use crate::traverse::{get_spoiler_trail, Traverser};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerRouteEntry {
    pub entrance: String,
    pub from_region: String,
    pub to_region: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerRegionRoute {
    pub region: String,
    pub route: Vec<SpoilerRouteEntry>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerItemLoc {
    pub location: String,
    pub player: String,
    pub item: String,
    pub item_player: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerPlayer {
    pub name: String,
    pub game: String,
    pub notes: Vec<String>,
    pub routes: Vec<SpoilerRegionRoute>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SpoilerLog {
    pub seed: usize,
    pub players: Vec<SpoilerPlayer>,
    pub spheres: Vec<Vec<SpoilerItemLoc>>,
    pub unreachable_locations: Vec<String>,
}

fn get_route(mw: &MultiWorld, trail: &[EntranceIdx]) -> Vec<SpoilerRouteEntry> {
    trail
        .iter()
        .map(|&e| {
            let entrance = &mw.entrances[e];
            SpoilerRouteEntry {
                entrance: entrance.name.clone(),
                from_region: mw.regions[entrance.parent_region].name.clone(),
                to_region: entrance
                    .connected_region
                    .map(|r| mw.regions[r].name.clone())
                    .unwrap_or_default(),
            }
        })
        .collect()
}

fn get_item_loc(mw: &MultiWorld, idx: LocationIdx) -> Option<SpoilerItemLoc> {
    let loc = &mw.locations[idx];
    let item = loc.item.as_ref()?;
    Some(SpoilerItemLoc {
        location: loc.name.clone(),
        player: mw.player_name(loc.player).to_string(),
        item: item.name.clone(),
        item_player: mw.player_name(item.player).to_string(),
    })
}

/// Routes are taken under the all-items state, so they show how each region is first entered
/// once everything is available.
pub fn get_spoiler_log(generator: &Generator) -> SpoilerLog {
    let mw = &generator.multiworld;
    let mut all_state = get_all_state(mw);

    let mut players = vec![];
    for world in &generator.worlds {
        let player = world.player();
        let mut traverser = Traverser::new(player);
        traverser.traverse(mw, &all_state);
        let routes = mw
            .regions
            .iter()
            .enumerate()
            .filter(|(_, r)| r.player == player)
            .filter_map(|(i, r)| {
                let trail = get_spoiler_trail(&traverser, i)?;
                Some(SpoilerRegionRoute {
                    region: r.name.clone(),
                    route: get_route(mw, &trail),
                })
            })
            .collect();
        players.push(SpoilerPlayer {
            name: mw.player_name(player).to_string(),
            game: world.game().to_string(),
            notes: world.spoiler_notes(),
            routes,
        });
    }

    let spheres = get_spheres(mw, &mw.new_state())
        .into_iter()
        .map(|sphere| {
            sphere
                .into_iter()
                .filter_map(|i| get_item_loc(mw, i))
                .collect()
        })
        .collect();

    let unreachable_locations = unreachable_locations(mw, &mut all_state)
        .into_iter()
        .map(|i| mw.locations[i].name.clone())
        .collect();

    SpoilerLog {
        seed: generator.seed,
        players,
        spheres,
        unreachable_locations,
    }
}
