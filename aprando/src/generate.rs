use anyhow::{bail, Context, Result};
use aprando_game::{Item, PlayerId};
use aprando_logic::ItemLinkGroup;
use hashbrown::{HashMap, HashSet};
use log::{info, warn};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::multiworld::MultiWorld;
use crate::seed_group::MergeContext;
use crate::settings::GenerationSettings;
use crate::sweep::{can_beat_game, get_all_state, unreachable_locations};
use crate::world::World;
use crate::worlds::make_world;

pub fn make_rng(seed: usize) -> StdRng {
    let mut rng_seed = [0u8; 32];
    rng_seed[..8].copy_from_slice(&seed.to_le_bytes());
    StdRng::from_seed(rng_seed)
}

pub fn random_seed() -> usize {
    (StdRng::from_entropy().next_u64() & 0xFFFFFFFF) as usize
}

// Non-event locations of this player that nothing has been locked into.
fn num_open_locations(mw: &MultiWorld, player: PlayerId) -> usize {
    mw.player_locations(player)
        .filter(|&i| {
            let loc = &mw.locations[i];
            !loc.is_event() && loc.item.is_none()
        })
        .count()
}

// Expands an item link's pool (item names or item group names) against a member's world.
// An empty pool links every progression item.
fn linked_names(world: &dyn World, item_pool: &[String]) -> Option<HashSet<String>> {
    if item_pool.is_empty() {
        return None;
    }
    let groups = world.item_name_groups();
    let mut names = HashSet::new();
    for name in item_pool {
        match groups.get(name) {
            Some(members) => names.extend(members.iter().cloned()),
            None => {
                names.insert(name.clone());
            }
        }
    }
    Some(names)
}

/// Hands the items every member of `link` has in common over to the group slot. Each member
/// gives up its copies; the group gets the smallest per-member count of each shared item, and the
/// pool is topped back up with the members' filler.
fn link_items(
    mw: &mut MultiWorld,
    worlds: &[Box<dyn World>],
    link: &ItemLinkGroup,
    item_pool: &[String],
    rng: &mut StdRng,
) -> Result<()> {
    let members = &link.members;
    let linked = linked_names(worlds[members[0]].as_ref(), item_pool);
    let is_linked = |item: &Item| match &linked {
        Some(names) => names.contains(&item.name),
        None => item.is_progression(),
    };

    let mut counts: Vec<HashMap<&str, usize>> = vec![HashMap::new(); members.len()];
    for item in &mw.itempool {
        if let Some(m) = members.iter().position(|&p| p == item.player) {
            if is_linked(item) {
                *counts[m].entry(item.name.as_str()).or_insert(0) += 1;
            }
        }
    }
    let mut shared: Vec<(String, usize)> = counts[0]
        .keys()
        .map(|&name| {
            let n = counts.iter().map(|c| c.get(name).copied().unwrap_or(0)).min();
            (name.to_string(), n.unwrap_or(0))
        })
        .filter(|(_, n)| *n > 0)
        .collect();
    shared.sort();
    drop(counts);

    let mut to_remove: HashMap<(PlayerId, String), usize> = HashMap::new();
    for &m in members {
        for (name, n) in &shared {
            to_remove.insert((m, name.clone()), *n);
        }
    }
    let pool_size = mw.itempool.len();
    let mut templates: HashMap<String, Item> = HashMap::new();
    let mut new_pool = vec![];
    for item in std::mem::take(&mut mw.itempool) {
        match to_remove.get_mut(&(item.player, item.name.clone())) {
            Some(n) if *n > 0 => {
                *n -= 1;
                templates.entry(item.name.clone()).or_insert(item);
            }
            _ => new_pool.push(item),
        }
    }
    for (name, n) in &shared {
        if let Some(template) = templates.get(name) {
            for _ in 0..*n {
                let mut item = template.clone();
                item.player = link.group;
                new_pool.push(item);
            }
        }
    }
    let mut i = 0;
    while new_pool.len() < pool_size {
        let world = &worlds[members[i % members.len()]];
        let name = world.get_filler_item_name(rng)?;
        new_pool.push(world.create_item(&name)?);
        i += 1;
    }
    info!(
        "Item link '{}': {} shared item names, {} filler added",
        mw.player_name(link.group),
        shared.len(),
        i
    );
    mw.itempool = new_pool;
    Ok(())
}

/// Drives every player's world through the generation stages and owns the resulting multiworld.
pub struct Generator {
    pub multiworld: MultiWorld,
    pub worlds: Vec<Box<dyn World>>,
    pub seed: usize,
    rng: StdRng,
    // Item pool of each link, parallel to `multiworld.link_groups`.
    link_item_pools: Vec<Vec<String>>,
}

impl Generator {
    pub fn new(settings: &GenerationSettings, seed: usize) -> Result<Self> {
        settings.validate()?;
        let mut multiworld = MultiWorld::new();
        let mut worlds: Vec<Box<dyn World>> = vec![];
        for p in &settings.players {
            let player = multiworld.add_player(&p.name, p.world.game());
            worlds.push(make_world(player, &p.world)?);
        }
        let mut link_item_pools = vec![];
        for link in &settings.item_links {
            let members: Vec<PlayerId> = link
                .players
                .iter()
                .filter_map(|name| settings.player_index(name))
                .collect();
            multiworld.add_item_link_group(&link.name, &members)?;
            link_item_pools.push(link.item_pool.clone());
        }
        Ok(Generator {
            multiworld,
            worlds,
            seed,
            rng: make_rng(seed),
            link_item_pools,
        })
    }

    pub fn generate(&mut self) -> Result<()> {
        info!(
            "Generating seed {} for {} players",
            self.seed,
            self.worlds.len()
        );
        for world in &mut self.worlds {
            let player = world.player();
            world
                .generate_early(&mut self.rng)
                .with_context(|| format!("invalid options for player {player}"))?;
        }

        let mut ctx = MergeContext::default();
        for world in &self.worlds {
            let name = self.multiworld.player_name(world.player()).to_string();
            world.merge(&mut ctx, &name)?;
        }
        for world in &mut self.worlds {
            world.apply_merge(&ctx)?;
        }

        for world in &mut self.worlds {
            world.create_regions(&mut self.multiworld, &mut self.rng)?;
        }
        for world in &self.worlds {
            let player = world.player();
            self.multiworld.hooks[player] = world.state_hook();
            for item in world.precollected_items()? {
                self.multiworld.push_precollected(item);
            }
        }

        for world in &mut self.worlds {
            let mut items = world.create_items(&self.multiworld)?;
            let player = world.player();
            let num_open = num_open_locations(&self.multiworld, player);
            if items.len() > num_open {
                bail!(
                    "{} player {}: {} pool items but only {} open locations",
                    world.game(),
                    player,
                    items.len(),
                    num_open
                );
            }
            while items.len() < num_open {
                let name = world.get_filler_item_name(&mut self.rng)?;
                items.push(world.create_item(&name)?);
            }
            self.multiworld.itempool.extend(items);
        }
        for (link, item_pool) in self
            .multiworld
            .link_groups
            .clone()
            .iter()
            .zip(&self.link_item_pools)
        {
            link_items(&mut self.multiworld, &self.worlds, link, item_pool, &mut self.rng)?;
        }

        for world in &mut self.worlds {
            world.set_rules(&mut self.multiworld)?;
        }
        self.multiworld.validate()?;
        self.validate_solvability()?;
        info!(
            "Generated {} regions, {} locations, {} pool items",
            self.multiworld.regions.len(),
            self.multiworld.locations.len(),
            self.multiworld.itempool.len()
        );
        Ok(())
    }

    /// With every pool item in hand, every location must be reachable and every player's goal
    /// must be met.
    pub fn validate_solvability(&self) -> Result<()> {
        let mw = &self.multiworld;
        let mut state = get_all_state(mw);
        if !can_beat_game(mw, &state) {
            let stuck: Vec<&str> = mw
                .real_players()
                .filter(|&p| !mw.completion_conditions[p].eval(&state))
                .map(|p| mw.player_name(p))
                .collect();
            bail!("unbeatable with all items: {}", stuck.join(", "));
        }
        let unreachable = unreachable_locations(mw, &mut state);
        if !unreachable.is_empty() {
            for &i in &unreachable {
                let loc = &mw.locations[i];
                warn!("unreachable: {} ({})", loc.name, mw.player_name(loc.player));
            }
            bail!(
                "{} locations are unreachable with all items",
                unreachable.len()
            );
        }
        Ok(())
    }
}
