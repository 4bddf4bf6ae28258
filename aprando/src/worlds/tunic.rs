use anyhow::{bail, Result};
use aprando_game::{Item, ItemClassification, LocationCode, PlayerId, VICTORY_ITEM};
use aprando_logic::helpers::{has, has_all, has_any};
use aprando_logic::{CollectionState, Rule, StateHook};
use hashbrown::{HashMap, HashSet};
use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use strum_macros::Display;

use crate::multiworld::MultiWorld;
use crate::rules::{add_rule, Combine, Spot};
use crate::seed_group::{MergeContext, MergeSettings, SeedGroups};
use crate::world::World;

pub const GAME: &str = "TUNIC";

const COMBAT_KIND: &str = "tunic_combat";
const LOCATION_BASE_ID: LocationCode = 509_342_000;
const ITEM_BASE_ID: i64 = 509_342_000;

const STICK: &str = "Stick";
const SWORD_UPGRADE: &str = "Sword Upgrade";
const MAGIC_WAND: &str = "Magic Wand";
const ATTACK_OFFERING: &str = "Attack Offering";
const SHIELD: &str = "Shield";
const DEFENSE_OFFERING: &str = "Defense Offering";
const HP_OFFERING: &str = "HP Offering";
const LAURELS: &str = "Hero's Laurels";
const LANTERN: &str = "Lantern";

// (name, id offset, classification, quantity)
const ITEM_TABLE: &[(&str, i64, ItemClassification, usize)] = &[
    (STICK, 0, ItemClassification::Progression, 1),
    (SWORD_UPGRADE, 1, ItemClassification::Progression, 2),
    (MAGIC_WAND, 2, ItemClassification::Progression, 1),
    (ATTACK_OFFERING, 3, ItemClassification::Progression, 3),
    (SHIELD, 4, ItemClassification::Progression, 1),
    (DEFENSE_OFFERING, 5, ItemClassification::Progression, 2),
    (HP_OFFERING, 6, ItemClassification::Progression, 2),
    (LAURELS, 7, ItemClassification::Progression, 1),
    (LANTERN, 8, ItemClassification::Progression, 1),
    ("Potion Flask", 9, ItemClassification::Useful, 0),
    ("Money", 10, ItemClassification::Filler, 0),
];

// (item, offense, defense)
const COMBAT_ITEMS: [(&str, u32, u32); 7] = [
    (STICK, 1, 0),
    (SWORD_UPGRADE, 2, 0),
    (MAGIC_WAND, 1, 0),
    (ATTACK_OFFERING, 1, 0),
    (SHIELD, 0, 1),
    (DEFENSE_OFFERING, 0, 1),
    (HP_OFFERING, 0, 1),
];

// (area, offense, defense) needed to fight through it.
const AREA_COMBAT: [(&str, u32, u32); 7] = [
    ("East Forest", 1, 0),
    ("Beneath the Well", 2, 0),
    ("West Garden", 3, 1),
    ("Quarry", 4, 2),
    ("Swamp", 4, 2),
    ("Cathedral", 5, 3),
    ("Heir Arena", 6, 4),
];

// Overworld portals and the area each leads to when left alone.
const PORTALS: [(&str, &str); 5] = [
    ("Overworld - Forest Gate", "East Forest"),
    ("Overworld - Well Hatch", "Beneath the Well"),
    ("Overworld - Garden Door", "West Garden"),
    ("Overworld - Quarry Gate", "Quarry"),
    ("Overworld - Swamp Path", "Swamp"),
];

// (location, id offset, region)
const LOCATIONS: &[(&str, i64, &str)] = &[
    ("Overworld - Stick Chest", 0, "Overworld"),
    ("Overworld - Shield Chest", 1, "Overworld"),
    ("Overworld - Shop - Potion", 2, "Overworld"),
    ("Overworld - Shop - Coins", 3, "Overworld"),
    ("East Forest - Sword Chest", 4, "East Forest"),
    ("East Forest - Lantern Chest", 5, "East Forest"),
    ("Beneath the Well - Laurels Chest", 6, "Beneath the Well"),
    ("Beneath the Well - Ladder Ledge Chest", 7, "Beneath the Well"),
    ("West Garden - Wand Chest", 8, "West Garden"),
    ("West Garden - Laurels Zip Chest", 9, "West Garden"),
    ("Quarry - Sword Upgrade Chest", 10, "Quarry"),
    ("Quarry - Ice Ledge Chest", 11, "Quarry"),
    ("Swamp - Defense Offering Chest", 12, "Swamp"),
    ("Swamp - HP Offering Chest", 13, "Swamp"),
    ("Cathedral - Attack Offering Chest", 14, "Cathedral"),
    ("Cathedral - HP Offering Chest", 15, "Cathedral"),
];

const SHOP_ITEMS: [(&str, &str); 2] = [
    ("Overworld - Shop - Potion", "Potion Flask"),
    ("Overworld - Shop - Coins", "Money"),
];

// (event, region)
const BOSSES: [(&str, &str); 3] = [
    ("Garden Knight Defeated", "West Garden"),
    ("Siege Engine Defeated", "East Forest"),
    ("Scavenger Boss Defeated", "Quarry"),
];

#[derive(
    Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrickDifficulty {
    #[default]
    Off,
    Easy,
    Medium,
    Hard,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct PlandoConnection {
    pub entrance: String,
    pub exit: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct TunicSettings {
    pub combat_logic: bool,
    pub laurels_zips: bool,
    pub ice_grappling: TrickDifficulty,
    pub ladder_storage: TrickDifficulty,
    pub ladder_storage_without_items: bool,
    pub fixed_shop: bool,
    pub entrance_rando: bool,
    pub plando_connections: Vec<PlandoConnection>,
    pub seed_group: Option<String>,
    /// Seeds the portal shuffle. Drawn for each player; a seed group keeps its first member's.
    #[serde(skip)]
    pub layout_seed: u64,
}

impl Default for TunicSettings {
    fn default() -> Self {
        TunicSettings {
            combat_logic: true,
            laurels_zips: true,
            ice_grappling: TrickDifficulty::Off,
            ladder_storage: TrickDifficulty::Off,
            ladder_storage_without_items: false,
            fixed_shop: false,
            entrance_rando: false,
            plando_connections: vec![],
            seed_group: None,
            layout_seed: 0,
        }
    }
}

impl MergeSettings for TunicSettings {
    // Players in a group share one layout, so the group takes the most restrictive tricks.
    fn merge(&mut self, other: &Self, group: &str, player_name: &str) -> Result<()> {
        self.laurels_zips &= other.laurels_zips;
        self.ice_grappling = self.ice_grappling.min(other.ice_grappling);
        self.ladder_storage = self.ladder_storage.min(other.ladder_storage);
        self.ladder_storage_without_items &= other.ladder_storage_without_items;
        self.fixed_shop |= other.fixed_shop;
        self.entrance_rando |= other.entrance_rando;
        for conn in &other.plando_connections {
            match self
                .plando_connections
                .iter()
                .find(|c| c.entrance == conn.entrance || c.exit == conn.exit)
            {
                Some(c) if c == conn => {}
                Some(c) => bail!(
                    "seed group '{group}': {player_name}'s plando connection {} -> {} conflicts with {} -> {}",
                    conn.entrance,
                    conn.exit,
                    c.entrance,
                    c.exit
                ),
                None => self.plando_connections.push(conn.clone()),
            }
        }
        Ok(())
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct TunicCombat {
    pub offense: u32,
    pub defense: u32,
}

impl TunicCombat {
    pub fn compute(state: &CollectionState, player: PlayerId) -> Self {
        let mut combat = TunicCombat::default();
        // Offense items do nothing without a weapon.
        let armed = state.has_any(&[STICK, SWORD_UPGRADE], player);
        for (name, offense, defense) in COMBAT_ITEMS {
            let n = state.count(name, player);
            if armed {
                combat.offense += n * offense;
            }
            combat.defense += n * defense;
        }
        combat
    }
}

/// Keeps the per-player combat cache in sync with the combat items held.
pub struct TunicCombatHook;

impl TunicCombatHook {
    fn refresh(state: &mut CollectionState, player: PlayerId) {
        let combat = TunicCombat::compute(state, player);
        state.aux.insert(player, COMBAT_KIND, combat);
    }

    fn is_combat_item(item: &Item) -> bool {
        COMBAT_ITEMS.iter().any(|(name, _, _)| *name == item.name)
    }
}

impl StateHook for TunicCombatHook {
    fn init(&self, state: &mut CollectionState, player: PlayerId) {
        TunicCombatHook::refresh(state, player);
    }

    fn collected(&self, state: &mut CollectionState, player: PlayerId, item: &Item) {
        if TunicCombatHook::is_combat_item(item) {
            TunicCombatHook::refresh(state, player);
        }
    }

    fn removed(&self, state: &mut CollectionState, player: PlayerId, item: &Item) {
        if TunicCombatHook::is_combat_item(item) {
            TunicCombatHook::refresh(state, player);
        }
    }
}

pub fn combat_rule(offense: u32, defense: u32, player: PlayerId) -> Rule {
    Rule::new(move |state: &CollectionState| {
        let combat = state
            .aux
            .get::<TunicCombat>(player, COMBAT_KIND)
            .copied()
            .unwrap_or_else(|| TunicCombat::compute(state, player));
        combat.offense >= offense && combat.defense >= defense
    })
}

pub struct TunicWorld {
    player: PlayerId,
    settings: TunicSettings,
    portal_pairs: Vec<(String, String)>,
}

impl TunicWorld {
    pub fn new(player: PlayerId, settings: &TunicSettings) -> Self {
        TunicWorld {
            player,
            settings: settings.clone(),
            portal_pairs: vec![],
        }
    }

    pub fn settings(&self) -> &TunicSettings {
        &self.settings
    }

    /// Plando connections are honored first. Remaining portals keep their vanilla order, or are
    /// shuffled from `layout_seed` when entrance randomization is on, so every member of a seed
    /// group gets the same layout.
    fn pair_portals(&self) -> Result<Vec<(String, String)>> {
        let mut pairs: HashMap<&str, &str> = HashMap::new();
        let mut used_exits: HashSet<&str> = HashSet::new();
        for conn in &self.settings.plando_connections {
            if !PORTALS.iter().any(|p| p.0 == conn.entrance) {
                bail!(
                    "{GAME} player {}: unknown plando entrance '{}'",
                    self.player,
                    conn.entrance
                );
            }
            if !PORTALS.iter().any(|p| p.1 == conn.exit) {
                bail!(
                    "{GAME} player {}: unknown plando exit '{}'",
                    self.player,
                    conn.exit
                );
            }
            if pairs.contains_key(conn.entrance.as_str()) || !used_exits.insert(&conn.exit) {
                bail!(
                    "{GAME} player {}: plando connection {} -> {} reuses a portal",
                    self.player,
                    conn.entrance,
                    conn.exit
                );
            }
            pairs.insert(&conn.entrance, &conn.exit);
        }
        let mut free_exits: Vec<&str> = PORTALS
            .iter()
            .map(|p| p.1)
            .filter(|x| !used_exits.contains(x))
            .collect();
        if self.settings.entrance_rando {
            let mut rng = StdRng::seed_from_u64(self.settings.layout_seed);
            free_exits.shuffle(&mut rng);
        }
        let mut free_exits = free_exits.into_iter();
        let mut out = vec![];
        for (entrance, _) in PORTALS {
            let exit = match pairs.get(entrance) {
                Some(&x) => x,
                None => match free_exits.next() {
                    Some(x) => x,
                    None => bail!("{GAME} player {}: ran out of portal exits", self.player),
                },
            };
            out.push((entrance.to_string(), exit.to_string()));
        }
        Ok(out)
    }

    fn ladder_storage_rule(&self) -> Rule {
        let p = self.player;
        if self.settings.ladder_storage == TrickDifficulty::Off {
            return has(LAURELS, p);
        }
        if self.settings.ladder_storage_without_items {
            Rule::always()
        } else {
            has_any(&[LAURELS, SHIELD], p)
        }
    }

    fn ice_grapple_rule(&self) -> Rule {
        let p = self.player;
        match self.settings.ice_grappling {
            TrickDifficulty::Off => has(LAURELS, p),
            TrickDifficulty::Easy => has(LAURELS, p).or(has_all(&[STICK, MAGIC_WAND], p)),
            _ => has(LAURELS, p).or(has(STICK, p)),
        }
    }
}

impl World for TunicWorld {
    fn game(&self) -> &str {
        GAME
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn generate_early(&mut self, rng: &mut StdRng) -> Result<()> {
        self.settings.layout_seed = rng.next_u64();
        Ok(())
    }

    fn merge(&self, ctx: &mut MergeContext, player_name: &str) -> Result<()> {
        if let Some(group) = &self.settings.seed_group {
            let groups = ctx.get_or_default::<SeedGroups<TunicSettings>>(GAME)?;
            groups.join(group, self.player, player_name, &self.settings)?;
        }
        Ok(())
    }

    fn apply_merge(&mut self, ctx: &MergeContext) -> Result<()> {
        let Some(group) = &self.settings.seed_group else {
            return Ok(());
        };
        let Some(merged) = ctx
            .get::<SeedGroups<TunicSettings>>(GAME)
            .and_then(|g| g.get(group))
        else {
            bail!(
                "{GAME} player {}: seed group '{group}' was never formed",
                self.player
            );
        };
        debug!(
            "{GAME} player {} uses seed group '{group}' ({} members)",
            self.player,
            merged.members.len()
        );
        let seed_group = self.settings.seed_group.clone();
        self.settings = TunicSettings {
            combat_logic: self.settings.combat_logic,
            seed_group,
            ..merged.settings.clone()
        };
        Ok(())
    }

    fn create_regions(&mut self, mw: &mut MultiWorld, _rng: &mut StdRng) -> Result<()> {
        let p = self.player;
        for r in ["Menu", "Overworld"] {
            mw.create_region(p, r)?;
        }
        for (area, _, _) in AREA_COMBAT {
            mw.create_region(p, area)?;
        }
        mw.connect(p, "Menu", "Overworld", None, None)?;

        self.portal_pairs = self.pair_portals()?;
        for (entrance, exit) in &self.portal_pairs {
            let e = mw.create_exit(p, "Overworld", entrance)?;
            mw.connect_entrance(e, exit)?;
            mw.connect(p, exit, "Overworld", Some(format!("{exit} - Return").as_str()), None)?;
        }
        mw.connect(p, "Swamp", "Cathedral", None, None)?;
        let arena_gate = has_all(&BOSSES.map(|b| b.0), p);
        mw.connect(p, "Overworld", "Heir Arena", None, Some(arena_gate))?;

        for &(name, offset, region) in LOCATIONS {
            mw.create_location(p, name, Some(LOCATION_BASE_ID + offset), region)?;
        }
        for (name, region) in BOSSES {
            mw.create_event(p, name, name, region, None)?;
        }
        mw.create_event(p, "The Heir Defeated", VICTORY_ITEM, "Heir Arena", None)?;

        if self.settings.fixed_shop {
            for (loc, item) in SHOP_ITEMS {
                let idx = mw.get_location(loc, p)?;
                mw.place_locked_item(idx, self.create_item(item)?)?;
            }
        }
        Ok(())
    }

    fn create_items(&mut self, _mw: &MultiWorld) -> Result<Vec<Item>> {
        let mut items = vec![];
        for &(name, _, _, quantity) in ITEM_TABLE {
            for _ in 0..quantity {
                items.push(self.create_item(name)?);
            }
        }
        Ok(items)
    }

    fn create_item(&self, name: &str) -> Result<Item> {
        match ITEM_TABLE.iter().find(|x| x.0 == name) {
            Some(&(_, offset, classification, _)) => Ok(Item::new(
                name,
                classification,
                Some(ITEM_BASE_ID + offset),
                self.player,
            )),
            None => bail!("{GAME}: unknown item '{name}'"),
        }
    }

    fn set_rules(&mut self, mw: &mut MultiWorld) -> Result<()> {
        let p = self.player;
        let location_rules = [
            ("Beneath the Well - Laurels Chest", has(LANTERN, p)),
            ("Beneath the Well - Ladder Ledge Chest", self.ladder_storage_rule()),
            ("West Garden - Wand Chest", has_any(&[STICK, SWORD_UPGRADE], p)),
            (
                "West Garden - Laurels Zip Chest",
                if self.settings.laurels_zips {
                    has_any(&[LAURELS, MAGIC_WAND], p)
                } else {
                    has(MAGIC_WAND, p)
                },
            ),
            ("Quarry - Ice Ledge Chest", self.ice_grapple_rule()),
            ("Cathedral - Attack Offering Chest", has(LANTERN, p)),
        ];
        for (name, rule) in location_rules {
            let idx = mw.get_location(name, p)?;
            add_rule(mw, Spot::Location(idx), rule, Combine::And);
        }

        if self.settings.combat_logic {
            for (area, offense, defense) in AREA_COMBAT {
                let region = mw.get_region(area, p)?;
                for e in mw.regions[region].entrances.clone() {
                    add_rule(mw, Spot::Entrance(e), combat_rule(offense, defense, p), Combine::And);
                }
            }
        }

        mw.set_completion_condition(p, has(VICTORY_ITEM, p));
        Ok(())
    }

    fn get_filler_item_name(&self, rng: &mut StdRng) -> Result<String> {
        let filler = ["Money", "Potion Flask"];
        Ok(filler.choose(rng).unwrap_or(&filler[0]).to_string())
    }

    fn state_hook(&self) -> Option<Arc<dyn StateHook>> {
        if self.settings.combat_logic {
            Some(Arc::new(TunicCombatHook))
        } else {
            None
        }
    }

    fn spoiler_notes(&self) -> Vec<String> {
        let mut notes: Vec<String> = self
            .portal_pairs
            .iter()
            .map(|(entrance, exit)| format!("{entrance} -> {exit}"))
            .collect();
        notes.push(format!(
            "tricks: laurels_zips={}, ice_grappling={}, ladder_storage={}",
            self.settings.laurels_zips, self.settings.ice_grappling, self.settings.ladder_storage
        ));
        notes
    }
}
