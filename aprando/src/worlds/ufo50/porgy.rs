use anyhow::Result;
use aprando_game::{ItemClassification, PlayerId};
use aprando_logic::helpers::{has, has_all, has_any, has_count};
use aprando_logic::{CollectionState, Rule};
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use super::{completed_item, game_base_id, ItemRow, Ufo50Game};
use crate::multiworld::MultiWorld;
use crate::rules::{add_rule, Combine, Spot};

pub const NAME: &str = "Porgy";
const GAME_ID: i64 = 22;

const FUEL: &str = "Porgy - Fuel Tank";
const FISH_GRATITUDE: &str = "Porgy - Fish Gratitude";
const TORPEDO: &str = "Porgy - Torpedo Upgrade";
const MCGUFFIN: &str = "Porgy - Strange Light";
const BUSTER: &str = "Porgy - Buster Torpedoes Module";
const MISSILE: &str = "Porgy - Missile System Module";
const DEPTH_CHARGE: &str = "Porgy - Depth Charge Module";
const SPOTLIGHT: &str = "Porgy - Spotlight Module";
const DRILL: &str = "Porgy - Drill Module";
const RADAR: &str = "Porgy - Radar System Module";
const HOMING: &str = "Porgy - Targeting System Module";

// The sub starts with this many tanks and can carry at most 21 worth of trips.
const STARTING_FUEL: u32 = 4;
const MAX_FUEL: u32 = 21;

const ITEM_TABLE: &[ItemRow] = &[
    ("Fuel Tank", 0, ItemClassification::Progression, 20),
    ("Torpedo Upgrade", 1, ItemClassification::Progression, 20),
    ("Fish Gratitude", 2, ItemClassification::Progression, 15),
    ("Strange Light", 3, ItemClassification::Progression, 5),
    ("Buster Torpedoes Module", 10, ItemClassification::Progression, 1),
    ("Missile System Module", 11, ItemClassification::Progression, 1),
    ("Depth Charge Module", 12, ItemClassification::Progression, 1),
    ("Spotlight Module", 13, ItemClassification::Progression, 1),
    ("Drill Module", 14, ItemClassification::Progression, 1),
    ("Radar System Module", 15, ItemClassification::Progression, 1),
    ("Targeting System Module", 16, ItemClassification::Progression, 1),
    ("Super Booster Module", 17, ItemClassification::Useful, 1),
    ("Efficient Fuel Module", 18, ItemClassification::Useful, 1),
    ("Armor Plating Module", 19, ItemClassification::Useful, 1),
    ("Scrap", 20, ItemClassification::Filler, 0),
];

const REGIONS: [&str; 9] = [
    "Menu",
    "Shallows",
    "Shallows - Buster",
    "Shallows - Missile",
    "Shallows - Depth",
    "Sunken Ship",
    "Sunken Ship - Buster",
    "Deeper",
    "Abyss",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Hidden {
    No,
    HasTell,
    NoTell,
}

struct LocationInfo {
    name: &'static str,
    offset: i64,
    region: &'static str,
    hidden: Hidden,
    // Tanks for the round trip when the check fires on touch, and when it fires back at base.
    // Zero means the location has its own fuel rule.
    fuel_touch: u32,
    fuel_get: u32,
}

const fn loc(
    name: &'static str,
    offset: i64,
    region: &'static str,
    hidden: Hidden,
    fuel_touch: u32,
    fuel_get: u32,
) -> LocationInfo {
    LocationInfo {
        name,
        offset,
        region,
        hidden,
        fuel_touch,
        fuel_get,
    }
}

use Hidden::{HasTell, No, NoTell};

#[rustfmt::skip]
const LOCATIONS: &[LocationInfo] = &[
    loc("Shallows Upper Left - Ceiling Torpedo Upgrade", 0, "Shallows", No, 2, 3),
    loc("Shallows Lower Left - Fuel Tank between some Coral", 1, "Shallows", No, 2, 4),
    loc("Shallows Upper Left - Fuel Tank next to Coral", 2, "Shallows", No, 2, 3),
    loc("Shallows Lower Left - Fuel Tank above Breakable Rocks", 3, "Shallows - Missile", No, 3, 4),
    loc("Shallows Upper Mid - Torpedo Upgrade at Surface", 4, "Shallows", No, 1, 2),
    loc("Shallows Upper Mid - Fuel Tank on Coral", 5, "Shallows", No, 2, 3),
    loc("Shallows Upper Mid - Fuel Tank behind ! Blocks", 6, "Shallows - Buster", No, 2, 3),
    loc("Shallows Upper Mid - Egg on Coral", 7, "Shallows", HasTell, 2, 3),
    loc("Shallows Upper Mid - Fuel Tank in Floor at Surface", 8, "Shallows", NoTell, 1, 2),
    loc("Shallows Mid - Torpedo Upgrade above Breakable Rocks", 9, "Shallows - Missile", No, 3, 4),
    loc("Shallows Sunken Ship - Cargo Hold Egg", 10, "Sunken Ship", No, 3, 5),
    loc("Shallows Sunken Ship - Bow Egg", 11, "Sunken Ship", No, 3, 5),
    loc("Shallows Sunken Ship - Bow Hidden Torpedo Upgrade", 12, "Sunken Ship - Buster", NoTell, 3, 5),
    loc("Shallows Sunken Ship - Depth Charge Module", 13, "Sunken Ship", No, 3, 5),
    loc("Shallows Lower Mid - Super Booster Module", 14, "Shallows", No, 3, 5),
    loc("Shallows Lower Mid - Fuel Tank on Coral", 15, "Shallows", No, 3, 5),
    loc("Shallows Lower Mid - Egg on Coral", 16, "Shallows", No, 3, 5),
    loc("Shallows Lower Mid - Lower Ceiling Torpedo Upgrade", 17, "Shallows", HasTell, 3, 5),
    loc("Shallows Lower Mid - Upper Ceiling Torpedo Upgrade", 18, "Shallows", HasTell, 3, 5),
    loc("Shallows Lower Mid - Fuel Tank in Floor", 19, "Shallows - Depth", NoTell, 3, 5),
    loc("Shallows Lower Mid - Torpedo Upgrade on Coral", 20, "Shallows", No, 3, 5),
    loc("Shallows Upper Right - Fuel Tank under Breakable Rocks", 21, "Shallows - Missile", No, 4, 6),
    loc("Shallows Upper Right - Fuel Tank in Coral Maze", 22, "Shallows", No, 0, 0),
    loc("Shallows Upper Right - Torpedo Upgrade in Coral Maze", 23, "Shallows", No, 0, 0),
    loc("Shallows Upper Right - Egg in Coral Maze", 24, "Shallows", No, 0, 0),
    loc("Shallows Lower Right - Fuel Tank under Breakable Rocks", 25, "Shallows - Missile", No, 4, 7),
    loc("Shallows Lower Right - Buster Torpedoes Module", 26, "Shallows", No, 4, 7),
    loc("Shallows Lower Right - Egg behind ! Blocks", 27, "Shallows - Buster", No, 4, 7),
    loc("Shallows Lower Right - Egg in Coral", 28, "Shallows", HasTell, 4, 7),
    loc("Shallows Lower Right - Drill Module", 29, "Shallows", No, 5, 8),
    loc("Deeper Upper Left - Torpedo Upgrade in Wall", 30, "Deeper", No, 0, 0),
    loc("Deeper Upper Left - Egg by Urchins", 31, "Deeper", No, 5, 8),
    loc("Deeper Upper Left - Fuel Tank on Coral", 32, "Deeper", No, 5, 8),
    loc("Deeper Upper Left - Fuel Tank behind ! Blocks", 33, "Deeper", HasTell, 5, 9),
    loc("Deeper Upper Mid - Torpedo Upgrade on Coral", 34, "Deeper", No, 5, 9),
    loc("Deeper Upper Mid - Torpedo Upgrade in Ceiling", 35, "Deeper", NoTell, 6, 9),
    loc("Deeper Upper Mid - Egg in Dirt", 36, "Deeper", No, 6, 9),
    loc("Deeper Upper Mid - Spotlight Module", 37, "Deeper", No, 6, 10),
    loc("Deeper Upper Mid - Fuel Tank in Collapsed Structure", 38, "Deeper", No, 6, 10),
    loc("Deeper Upper Right - Fuel Tank in Collapsed Structure", 39, "Deeper", No, 6, 10),
    loc("Deeper Upper Right - Egg on Coral", 40, "Deeper", No, 6, 10),
    loc("Deeper Upper Right - Torpedo Upgrade in Wall", 41, "Deeper", HasTell, 7, 11),
    loc("Deeper Right - Torpedo Upgrade on Coral", 42, "Deeper", No, 7, 11),
    loc("Deeper Upper Right - Targeting System Module", 43, "Deeper", No, 7, 11),
    loc("Deeper Lower Right - Egg behind Urchins", 44, "Deeper", No, 7, 12),
    loc("Deeper Lower Right - Fuel Tank in Ceiling", 45, "Deeper", NoTell, 7, 12),
    loc("Deeper Lower Right - Egg on Coral", 46, "Deeper", No, 7, 12),
    loc("Deeper Lower Mid - Missile System Module", 47, "Deeper", No, 6, 10),
    loc("Deeper Lower Mid - Torpedo Upgrade on Coral", 48, "Deeper", No, 6, 10),
    loc("Deeper Lower Mid - Fuel Tank in Floor", 49, "Deeper", NoTell, 6, 10),
    loc("Deeper Lower Left - Egg in Wall", 50, "Deeper", HasTell, 6, 10),
    loc("Abyss Upper Left - Egg on Seaweed near Urchins", 60, "Abyss", No, 0, 0),
    loc("Abyss Upper Left - Fuel Tank on Seaweed", 61, "Abyss", No, 8, 12),
    loc("Abyss Upper Left - Egg on Seaweed above Torpedo Upgrade", 62, "Abyss", No, 0, 0),
    loc("Abyss Upper Left - Torpedo Upgrade in Seaweed", 63, "Abyss", No, 0, 0),
    loc("Abyss Lower Left - Egg in Facility", 64, "Abyss", No, 0, 0),
    loc("Abyss Lower Left - Torpedo Upgrade in Facility", 65, "Abyss", No, 0, 0),
    loc("Abyss Lower Left - Fuel Tank in Facility Floor", 66, "Abyss", NoTell, 0, 0),
    loc("Abyss Upper Mid - Torpedo Upgrade in Wall", 67, "Abyss", HasTell, 8, 13),
    loc("Abyss Upper Mid - Torpedo Upgrade in Cave", 68, "Abyss", No, 9, 13),
    loc("Abyss Upper Mid - Egg on Seaweed", 69, "Abyss", No, 9, 13),
    loc("Abyss Upper Mid - Efficient Fuel Module", 70, "Abyss", No, 9, 14),
    loc("Abyss Upper Mid - Egg in Seaweed", 71, "Abyss", HasTell, 9, 14),
    loc("Abyss Upper Mid - Torpedo Upgrade behind Seaweed", 72, "Abyss", No, 9, 14),
    loc("Abyss Upper Right - Egg by Seaweed", 73, "Abyss", No, 10, 15),
    loc("Abyss Upper Right - Torpedo Upgrade in Wall", 74, "Abyss", NoTell, 10, 15),
    loc("Abyss Lower Right - Fuel Tank in Floor", 75, "Abyss", NoTell, 10, 16),
    loc("Abyss Lower Right - Egg", 76, "Abyss", No, 10, 16),
    loc("Abyss Lower Right - Radar System Module", 77, "Abyss", No, 10, 16),
    loc("Abyss Lower Right - Armor Plating Module", 78, "Abyss", No, 11, 16),
    loc("Garden", 997, "Menu", No, 0, 0),
    loc("Cherry", 999, "Abyss", No, 0, 0),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FuelDifficulty {
    Easy,
    Medium,
    Hard,
}

/// When hidden items need the radar module. Told items give a visual hint in the room.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RadarLogic {
    Off,
    Required,
    UntoldOnly,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct PorgySettings {
    pub fuel_difficulty: FuelDifficulty,
    /// Checks fire on touching the item rather than on returning it to base.
    pub check_on_touch: bool,
    pub radar: RadarLogic,
    /// The Abyss is in logic without the spotlight.
    pub lanternless: bool,
}

impl Default for PorgySettings {
    fn default() -> Self {
        PorgySettings {
            fuel_difficulty: FuelDifficulty::Easy,
            check_on_touch: false,
            radar: RadarLogic::Off,
            lanternless: false,
        }
    }
}

/// Fuel tanks to collect for a trip that costs `amount`, after difficulty padding.
pub fn fuel_tanks_needed(amount: u32, difficulty: FuelDifficulty) -> u32 {
    let amount = match difficulty {
        FuelDifficulty::Easy => amount * 3 / 2,
        FuelDifficulty::Medium => amount * 5 / 4,
        FuelDifficulty::Hard => amount,
    };
    if amount <= STARTING_FUEL {
        return 0;
    }
    amount.min(MAX_FUEL) - STARTING_FUEL
}

pub fn has_fuel(amount: u32, difficulty: FuelDifficulty, player: PlayerId) -> Rule {
    has_count(FUEL, player, fuel_tanks_needed(amount, difficulty))
}

/// Combat score: torpedo upgrades, two per five fish helpers, and two per extra weapon module
/// that fits next to the base torpedoes.
pub fn combat_score(state: &CollectionState, player: PlayerId) -> u32 {
    let mut score = state.count(TORPEDO, player);
    score += state.count(FISH_GRATITUDE, player) / 5 * 2;
    let extra_power = [BUSTER, MISSILE, HOMING]
        .iter()
        .filter(|x| state.has(x, player))
        .count() as u32;
    let slots = 2 + state.count(MCGUFFIN, player) / 2;
    score + extra_power.min(slots - 1) * 2
}

pub fn can_combat(target_score: u32, player: PlayerId) -> Rule {
    Rule::new(move |state| combat_score(state, player) >= target_score)
}

/// Two module slots come free; each further slot costs two strange lights, up to five lights.
pub fn has_enough_slots(mods_needed: u32, player: PlayerId) -> Rule {
    let lights = 2 * (mods_needed as i64 - 2);
    if lights <= 0 {
        Rule::always()
    } else if lights > 5 {
        Rule::never()
    } else {
        has_count(MCGUFFIN, player, lights as u32)
    }
}

fn prefixed(name: &str) -> String {
    format!("{NAME} - {name}")
}

pub struct Porgy {
    settings: PorgySettings,
}

impl Porgy {
    pub fn new(settings: &PorgySettings) -> Self {
        Porgy {
            settings: settings.clone(),
        }
    }

    fn fuel(&self, amount: u32, player: PlayerId) -> Rule {
        has_fuel(amount, self.settings.fuel_difficulty, player)
    }

    fn needs_radar(&self, hidden: Hidden) -> bool {
        match hidden {
            Hidden::No => false,
            Hidden::HasTell => self.settings.radar == RadarLogic::Required,
            Hidden::NoTell => self.settings.radar >= RadarLogic::Required,
        }
    }

    fn light(&self, player: PlayerId) -> Rule {
        if self.settings.lanternless {
            Rule::always()
        } else {
            has(SPOTLIGHT, player)
        }
    }

    /// Slots for `extra_mods` at a location, counting the spotlight in the Abyss and the radar
    /// where the item is hidden.
    fn slots(&self, name: &str, extra_mods: u32, player: PlayerId) -> Rule {
        let mut mods = extra_mods;
        if let Some(info) = LOCATIONS.iter().find(|x| x.name == name) {
            if info.region == "Abyss" && !self.settings.lanternless {
                mods += 1;
            }
            if self.needs_radar(info.hidden) {
                mods += 1;
            }
        }
        has_enough_slots(mods, player)
    }

    fn add(&self, mw: &mut MultiWorld, player: PlayerId, name: &str, rule: Rule) -> Result<()> {
        let loc = mw.get_location(&prefixed(name), player)?;
        add_rule(mw, Spot::Location(loc), rule, Combine::And);
        Ok(())
    }

    // Fuel, with a shortcut that a module opens up for less.
    fn fuel_or_shortcut(&self, p: PlayerId, fuel: u32, module: &str, shortcut: u32) -> Rule {
        self.fuel(fuel, p)
            .or(self.fuel(shortcut, p).and(has(module, p)))
    }

    fn set_route_rules(&self, mw: &mut MultiWorld, p: PlayerId) -> Result<()> {
        let on_touch = self.settings.check_on_touch;
        let f = |amount: u32| self.fuel(amount, p);
        let (maze_fuel, maze_torpedo, maze_egg) = if on_touch {
            ((7, 3), (9, 5), (11, 7))
        } else {
            ((13, 6), (15, 8), (16, 9))
        };
        for (name, (fuel, with_drill)) in [
            ("Shallows Upper Right - Fuel Tank in Coral Maze", maze_fuel),
            ("Shallows Upper Right - Torpedo Upgrade in Coral Maze", maze_torpedo),
            ("Shallows Upper Right - Egg in Coral Maze", maze_egg),
        ] {
            self.add(mw, p, name, self.fuel_or_shortcut(p, fuel, DRILL, with_drill))?;
        }
        let (wall, wall_depth) = if on_touch { (4, 3) } else { (8, 5) };
        self.add(
            mw,
            p,
            "Deeper Upper Left - Torpedo Upgrade in Wall",
            self.fuel_or_shortcut(p, wall, DEPTH_CHARGE, wall_depth),
        )?;

        let urchins = if on_touch {
            has(DEPTH_CHARGE, p).and(f(4)).or(has(DRILL, p).and(f(5)))
        } else {
            f(9).and(has_any(&[DEPTH_CHARGE, DRILL], p))
        };
        self.add(mw, p, "Abyss Upper Left - Egg on Seaweed near Urchins", urchins)?;

        let above = "Abyss Upper Left - Egg on Seaweed above Torpedo Upgrade";
        let seaweed = "Abyss Upper Left - Torpedo Upgrade in Seaweed";
        // (fuel, modules, extra slots) routes into the upper left seaweed.
        let routes: Vec<(u32, Vec<&str>, u32)> = if on_touch {
            vec![
                (4, vec![DEPTH_CHARGE], 0),
                (5, vec![DRILL, BUSTER], 2),
                (6, vec![BUSTER], 1),
                (7, vec![DRILL, MISSILE], 1),
                (8, vec![DRILL], 1),
            ]
        } else {
            vec![
                (8, vec![DEPTH_CHARGE], 0),
                (8, vec![DRILL, MISSILE, BUSTER], 2),
                (9, vec![BUSTER, MISSILE], 1),
                (10, vec![BUSTER], 1),
                (14, vec![DRILL, MISSILE], 1),
                (15, vec![DRILL], 1),
            ]
        };
        for name in [above, seaweed] {
            let rule = Rule::any(routes.iter().map(|(fuel, modules, extra)| {
                f(*fuel)
                    .and(has_all(modules, p))
                    .and(self.slots(name, *extra, p))
            }));
            self.add(mw, p, name, rule)?;
        }

        let facility = [
            ("Abyss Lower Left - Egg in Facility", (7, 6), (9, 8), (10, 14, 12)),
            ("Abyss Lower Left - Torpedo Upgrade in Facility", (7, 6), (9, 9), (10, 15, 13)),
        ];
        for (name, (depth, depth_assisted), (touch_bd, touch_bdm), (get_depth, get_bd, get_bdm)) in
            facility
        {
            let (depth_route, bd, bdm) = if on_touch {
                let depth_route = has(DEPTH_CHARGE, p).and(
                    f(depth).or(has_any(&[BUSTER, DRILL], p).and(f(depth_assisted))),
                );
                (depth_route, touch_bd, touch_bdm)
            } else {
                (has(DEPTH_CHARGE, p).and(f(get_depth)), get_bd, get_bdm)
            };
            let rule = depth_route
                .or(has_all(&[BUSTER, DRILL], p)
                    .and(f(bd))
                    .and(self.slots(name, 2, p)))
                .or(has_all(&[BUSTER, DRILL, MISSILE], p)
                    .and(f(bdm))
                    .and(self.slots(name, 3, p)));
            self.add(mw, p, name, rule)?;
        }

        let floor = "Abyss Lower Left - Fuel Tank in Facility Floor";
        let floor_fuel = if on_touch { 7 } else { 9 };
        let rule = has_all(&[BUSTER, DEPTH_CHARGE], p)
            .and(f(floor_fuel))
            .and(self.slots(floor, 2, p));
        self.add(mw, p, floor, rule)?;
        Ok(())
    }
}

impl Ufo50Game for Porgy {
    fn name(&self) -> &'static str {
        NAME
    }

    fn game_id(&self) -> i64 {
        GAME_ID
    }

    fn item_table(&self) -> &'static [ItemRow] {
        ITEM_TABLE
    }

    fn filler_item(&self) -> &'static str {
        "Scrap"
    }

    fn create_regions(&self, mw: &mut MultiWorld, player: PlayerId) -> Result<()> {
        for r in REGIONS {
            mw.create_region(player, &prefixed(r))?;
        }
        let base_id = game_base_id(GAME_ID);
        for info in LOCATIONS {
            mw.create_location(
                player,
                &prefixed(info.name),
                Some(base_id + info.offset),
                &prefixed(info.region),
            )?;
        }
        mw.create_event(
            player,
            &prefixed("Lamia"),
            &prefixed("Lamia Defeated"),
            &prefixed("Abyss"),
            Some(can_combat(20, player)),
        )?;
        let gold = can_combat(26, player).and(self.fuel(16, player));
        mw.create_event(
            player,
            &prefixed("Gold"),
            &completed_item(NAME),
            &prefixed("Abyss"),
            Some(gold),
        )?;
        Ok(())
    }

    fn set_rules(&self, mw: &mut MultiWorld, p: PlayerId) -> Result<()> {
        let connections: [(&str, &str, Option<Rule>); 8] = [
            ("Menu", "Shallows", None),
            ("Shallows", "Deeper", None),
            ("Shallows", "Shallows - Buster", Some(has(BUSTER, p))),
            ("Shallows", "Shallows - Missile", Some(has_any(&[DEPTH_CHARGE, MISSILE], p))),
            ("Shallows", "Shallows - Depth", Some(has(DEPTH_CHARGE, p))),
            (
                "Shallows",
                "Sunken Ship",
                Some(has(DEPTH_CHARGE, p).or(has(MISSILE, p).and(self.fuel(6, p)))),
            ),
            ("Sunken Ship", "Sunken Ship - Buster", Some(has(BUSTER, p))),
            // Roughly the loadout a vanilla run has on arrival.
            ("Deeper", "Abyss", Some(self.light(p).and(can_combat(16, p)))),
        ];
        for (from, to, rule) in connections {
            mw.connect(p, &prefixed(from), &prefixed(to), None, rule)?;
        }

        for info in LOCATIONS {
            if self.needs_radar(info.hidden) {
                self.add(mw, p, info.name, has(RADAR, p))?;
            }
            let fuel = if self.settings.check_on_touch {
                info.fuel_touch
            } else {
                info.fuel_get
            };
            if fuel > 0 {
                self.add(mw, p, info.name, self.fuel(fuel, p))?;
            }
        }

        self.add(mw, p, "Deeper Upper Mid - Egg in Dirt", has(DRILL, p))?;
        for name in [
            "Shallows Upper Mid - Fuel Tank in Floor at Surface",
            "Deeper Upper Mid - Spotlight Module",
            "Deeper Lower Mid - Fuel Tank in Floor",
        ] {
            self.add(mw, p, name, has(DEPTH_CHARGE, p))?;
        }
        self.set_route_rules(mw, p)?;

        self.add(mw, p, "Garden", has(&prefixed("Lamia Defeated"), p))?;
        let cherry = can_combat(26, p)
            .and(self.fuel(16, p))
            .and(has_all(&[DEPTH_CHARGE, DRILL], p))
            .and(self.light(p));
        self.add(mw, p, "Cherry", cherry)?;
        Ok(())
    }
}
