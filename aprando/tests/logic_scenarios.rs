use std::path::Path;

use anyhow::{bail, Context, Result};
use aprando::multiworld::MultiWorld;
use aprando::sweep::{has_beaten_game, sweep_for_events};
use aprando::traverse::{can_reach_entrance, can_reach_location, can_reach_region, get_path};
use aprando::world::World;
use aprando::worlds::data_world::DataWorld;
use aprando_game::WorldData;
use aprando_logic::CollectionState;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct ScenariosList {
    scenarios: Vec<Scenario>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Scenario {
    #[serde(rename = "name")]
    _name: Option<String>,
    #[serde(default)]
    items: Vec<String>,
    #[serde(default)]
    remove_items: Vec<String>,
    #[serde(default)]
    sweep: bool,
    target_region: Option<String>,
    target_location: Option<String>,
    target_entrance: Option<String>,
    path: Option<Vec<String>>,
    beaten: Option<bool>,
    #[serde(default)]
    fail: bool,
}

fn build_world(data: WorldData) -> Result<(MultiWorld, DataWorld)> {
    let mut mw = MultiWorld::new();
    let player = mw.add_player("Tester", &data.game);
    let mut world = DataWorld::new(player, data);
    let mut rng = StdRng::seed_from_u64(0);
    world.create_regions(&mut mw, &mut rng)?;
    world.set_rules(&mut mw)?;
    mw.validate()?;
    Ok((mw, world))
}

fn get_state(mw: &MultiWorld, world: &DataWorld, scenario: &Scenario) -> Result<CollectionState> {
    let mut state = mw.new_state();
    for name in &scenario.items {
        state.collect(&world.create_item(name)?);
    }
    for name in &scenario.remove_items {
        state.remove(&world.create_item(name)?);
    }
    if scenario.sweep {
        sweep_for_events(mw, &mut state);
    }
    Ok(state)
}

fn test_scenario(mw: &MultiWorld, world: &DataWorld, scenario: &Scenario) -> Result<()> {
    let player = world.player();
    let mut state = get_state(mw, world, scenario)?;

    let mut target_region = None;
    let reachable = if let Some(name) = &scenario.target_region {
        let region = mw.get_region(name, player)?;
        target_region = Some(region);
        Some(can_reach_region(mw, &mut state, region))
    } else if let Some(name) = &scenario.target_location {
        let loc = mw.get_location(name, player)?;
        target_region = Some(mw.locations[loc].parent_region);
        Some(can_reach_location(mw, &mut state, loc))
    } else if let Some(name) = &scenario.target_entrance {
        let entrance = mw.get_entrance(name, player)?;
        target_region = mw.entrances[entrance].connected_region;
        Some(can_reach_entrance(mw, &mut state, entrance))
    } else {
        None
    };

    match reachable {
        Some(true) if scenario.fail => bail!("Failure expected, but target is reachable"),
        Some(false) if !scenario.fail => bail!("Target is unreachable"),
        _ => {}
    }

    if let (Some(expected), Some(region)) = (&scenario.path, target_region) {
        let Some(path) = get_path(mw, &state, region) else {
            bail!("No path found to {}", mw.regions[region].name);
        };
        let names: Vec<&str> = path.iter().map(|&e| mw.entrances[e].name.as_str()).collect();
        if names != *expected {
            bail!("Path mismatch: expected {:?}, got {:?}", expected, names);
        }
    }

    if let Some(expected) = scenario.beaten {
        let beaten = has_beaten_game(mw, &state, player);
        if beaten != expected {
            bail!("Expected beaten={expected}, got {beaten}");
        }
    }
    Ok(())
}

#[test]
fn test_logic_scenarios() -> Result<()> {
    let scenarios_dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/scenarios");
    for entry in std::fs::read_dir(&scenarios_dir)? {
        let entry = entry?;
        println!("{}", entry.file_name().to_string_lossy());

        let data = WorldData::load(&entry.path().join("world.json"))?;
        let (mw, world) = build_world(data)?;

        let scenarios_path = entry.path().join("scenarios.json");
        let scenarios_str = std::fs::read_to_string(scenarios_path.clone())
            .context(format!("loading {}", scenarios_path.display()))?;
        let scenarios_list: ScenariosList = serde_json::from_str(&scenarios_str)
            .context(format!("parsing {}", scenarios_path.display()))?;
        for scenario in &scenarios_list.scenarios {
            println!("Scenario: {:?}", scenario);
            test_scenario(&mw, &world, scenario).context(format!("{:?}", scenario._name))?;
        }
    }
    Ok(())
}
