use anyhow::{bail, ensure, Result};
use aprando_game::{Item, ItemClassification, ItemCode, LocationCode, PlayerId, VICTORY_ITEM};
use aprando_logic::helpers::{has, has_any, has_count, has_from_list_unique};
use aprando_logic::Rule;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use strum_macros::Display;

use crate::multiworld::MultiWorld;
use crate::rules::{add_rule, set_rule, Combine, Spot};
use crate::world::World;

pub const GAME: &str = "Mario Kart 64";

const ID_BASE: i64 = 4660000;

pub const COURSES: [&str; 16] = [
    "Luigi Raceway",
    "Moo Moo Farm",
    "Koopa Troopa Beach",
    "Kalimari Desert",
    "Toad's Turnpike",
    "Frappe Snowland",
    "Choco Mountain",
    "Mario Raceway",
    "Wario Stadium",
    "Sherbet Land",
    "Royal Raceway",
    "Bowser's Castle",
    "D.K.'s Jungle Parkway",
    "Yoshi Valley",
    "Banshee Boardwalk",
    "Rainbow Road",
];

const CUPS: [&str; 4] = ["Mushroom", "Flower", "Star", "Special"];

const DRIVERS: [&str; 8] = [
    "Mario", "Luigi", "Peach", "Toad", "Yoshi", "D.K.", "Wario", "Bowser",
];

const FILLER_ITEMS: [&str; 4] = ["Banana", "Green Shell", "Red Shell", "Mushroom"];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Group {
    Hazard,
    Secret,
}

// (course index, location name, code offset, group)
const COURSE_EXTRAS: &[(usize, &str, i64, Group)] = &[
    (1, "Defeat Chubby", 97, Group::Hazard),
    (2, "Koopa Troopa Beach Secret", 574, Group::Secret),
    (3, "Destroy Cactus", 98, Group::Hazard),
    (3, "Kalimari Desert Secret", 575, Group::Secret),
    (4, "Toads Turnpike Secret", 576, Group::Secret),
    (5, "Defeat Snowman Bomb", 99, Group::Hazard),
    (5, "Snow Yoshi's Secret", 577, Group::Secret),
    (7, "Destroy Mario Sign", 102, Group::Hazard),
    (9, "Spin Baby Penguin", 103, Group::Hazard),
    (9, "Spin Adult Penguin", 104, Group::Hazard),
    (10, "Peach's Castle Secret", 578, Group::Secret),
    (10, "Peach's Castle Trail Secret", 579, Group::Secret),
    (10, "Peach's Castle Moat Ramp Secret", 580, Group::Secret),
    (11, "Destroy Bush", 105, Group::Hazard),
    (11, "Destroy Thwomp", 106, Group::Hazard),
    (11, "Marty's Secret", 581, Group::Secret),
    (12, "D.K.'s Jungle Parkway Secret", 582, Group::Secret),
    (13, "Defeat Giant Yoshi Egg", 107, Group::Hazard),
    (14, "Banshee Boardwalk Secret", 583, Group::Secret),
];

// Hazards reachable from several courses, each modeled as its own region.
const SHARED_HAZARDS: &[(&str, i64, &[usize])] = &[
    ("Destroy Tree", 96, &[0, 2, 5, 7, 10, 12, 13]),
    ("Destroy Piranha Plant", 101, &[7, 10]),
];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GameMode {
    Cups,
    Courses,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CourseOrder {
    Vanilla,
    Shuffle,
    ShortToLong,
    LongToShort,
    Alphabetical,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CupTrophyLocations {
    Three,
    Five,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DriftAbilities {
    Off,
    On,
    Plentiful,
    FreeDrift,
    FreeMiniTurbo,
}

impl DriftAbilities {
    fn per_driver(self) -> usize {
        match self {
            DriftAbilities::Off => 0,
            DriftAbilities::On => 2,
            DriftAbilities::Plentiful => 3,
            DriftAbilities::FreeDrift | DriftAbilities::FreeMiniTurbo => 1,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Mk64Settings {
    pub two_player: bool,
    pub game_mode: GameMode,
    pub locked_courses: usize,
    pub course_order: CourseOrder,
    pub final_course_pool: Vec<String>,
    pub hazard_locations: bool,
    pub secret_locations: bool,
    pub cup_trophy_locations: CupTrophyLocations,
    pub shuffle_drift_abilities: DriftAbilities,
    pub minimum_filler_items: usize,
    // 0 picks a random class.
    pub low_engine_class: u32,
    pub middle_engine_class: u32,
    pub high_engine_class: u32,
}

impl Default for Mk64Settings {
    fn default() -> Self {
        Mk64Settings {
            two_player: false,
            game_mode: GameMode::Cups,
            locked_courses: 4,
            course_order: CourseOrder::Shuffle,
            final_course_pool: vec![],
            hazard_locations: true,
            secret_locations: true,
            cup_trophy_locations: CupTrophyLocations::Three,
            shuffle_drift_abilities: DriftAbilities::On,
            minimum_filler_items: 0,
            low_engine_class: 0,
            middle_engine_class: 100,
            high_engine_class: 0,
        }
    }
}

pub struct Mk64World {
    player: PlayerId,
    settings: Mk64Settings,
    course_order: Vec<usize>,
    starting_drivers: Vec<String>,
    num_filler_items: usize,
    victory_location: Option<usize>,
}

fn trophy_names(cup: &str, trophies: CupTrophyLocations) -> Vec<(String, i64)> {
    let cup_idx = CUPS.iter().position(|&c| c == cup).unwrap_or(0) as i64;
    let base = 48 + 12 * cup_idx;
    let mut out = vec![
        (format!("{cup} Cup Bronze"), base),
        (format!("{cup} Cup Silver"), base + 1),
        (format!("{cup} Cup Gold"), base + 2),
    ];
    if trophies == CupTrophyLocations::Five {
        out.push((format!("{cup} Cup 100cc Gold"), base + 8));
        out.push((format!("{cup} Cup 150cc Gold"), base + 11));
    }
    out
}

impl Mk64World {
    pub fn new(player: PlayerId, settings: &Mk64Settings) -> Self {
        Mk64World {
            player,
            settings: settings.clone(),
            course_order: (0..16).collect(),
            starting_drivers: vec![],
            num_filler_items: 0,
            victory_location: None,
        }
    }

    pub fn course_order(&self) -> &[usize] {
        &self.course_order
    }

    fn num_starting_drivers(&self) -> usize {
        if self.settings.two_player { 2 } else { 1 }
    }

    fn num_unlocks(&self) -> usize {
        match self.settings.game_mode {
            GameMode::Cups => 3,
            GameMode::Courses => self.settings.locked_courses,
        }
    }

    /// Pool items the options call for, before filler padding.
    pub fn num_unpaired_items(&self) -> usize {
        let s = &self.settings;
        (DRIVERS.len() - self.num_starting_drivers())
            + if s.two_player { 2 } else { 1 }
            + self.num_unlocks()
            + DRIVERS.len() * s.shuffle_drift_abilities.per_driver()
            + s.minimum_filler_items
    }

    /// Non-event locations the options create.
    pub fn num_unpaired_locations(&self) -> usize {
        let s = &self.settings;
        let mut n = COURSES.len() * 3;
        for &(_, _, _, group) in COURSE_EXTRAS {
            if (group == Group::Hazard && s.hazard_locations)
                || (group == Group::Secret && s.secret_locations)
            {
                n += 1;
            }
        }
        if s.hazard_locations {
            n += SHARED_HAZARDS.len();
        }
        if s.game_mode == GameMode::Cups {
            n += CUPS.len()
                * match s.cup_trophy_locations {
                    CupTrophyLocations::Three => 3,
                    CupTrophyLocations::Five => 5,
                };
        }
        // The victory location is an event.
        n - 1
    }

    fn item_code(name: &str) -> Option<ItemCode> {
        if let Some(i) = DRIVERS
            .iter()
            .position(|d| name == format!("Driver Unlock {d}"))
        {
            return Some(ID_BASE + i as i64);
        }
        if let Some(i) = DRIVERS
            .iter()
            .position(|d| name == format!("Progressive Drift {d}"))
        {
            return Some(ID_BASE + 12 + i as i64);
        }
        if let Some(i) = FILLER_ITEMS.iter().position(|&f| f == name) {
            return Some(ID_BASE + 30 + i as i64);
        }
        match name {
            "P1 Star Power" => Some(ID_BASE + 8),
            "P2 Star Power" => Some(ID_BASE + 9),
            "Progressive Cup Unlock" => Some(ID_BASE + 10),
            "Progressive Course Unlock" => Some(ID_BASE + 11),
            _ => None,
        }
    }

    fn star_rule(&self) -> Rule {
        let player = self.player;
        if self.settings.two_player {
            has_any(&["P1 Star Power", "P2 Star Power"], player)
        } else {
            has("P1 Star Power", player)
        }
    }

    fn add_location(
        &self,
        mw: &mut MultiWorld,
        name: &str,
        code: LocationCode,
        region: &str,
    ) -> Result<usize> {
        if self.victory_location.is_none() && self.is_victory_location(name) {
            return mw.create_event(self.player, name, VICTORY_ITEM, region, None);
        }
        mw.create_location(self.player, name, Some(ID_BASE + code), region)
    }

    fn is_victory_location(&self, name: &str) -> bool {
        match self.settings.game_mode {
            GameMode::Cups => {
                let last = trophy_names(CUPS[3], self.settings.cup_trophy_locations);
                last.last().map(|x| x.0.as_str()) == Some(name)
            }
            GameMode::Courses => name == format!("Win {}", COURSES[self.course_order[15]]),
        }
    }

    fn choose_course_order(&mut self, rng: &mut StdRng) -> Result<()> {
        self.course_order = match self.settings.course_order {
            CourseOrder::Vanilla => (0..16).collect(),
            CourseOrder::ShortToLong => vec![1, 7, 6, 2, 0, 5, 14, 3, 9, 13, 11, 12, 10, 4, 8, 15],
            CourseOrder::LongToShort => vec![15, 8, 4, 10, 12, 11, 13, 9, 3, 14, 5, 0, 2, 6, 7, 1],
            CourseOrder::Alphabetical => vec![14, 11, 6, 12, 5, 3, 2, 0, 7, 1, 15, 10, 9, 4, 8, 13],
            CourseOrder::Shuffle => {
                let mut order: Vec<usize> = (0..16).collect();
                order.shuffle(rng);
                if let Some(name) = self.settings.final_course_pool.choose(rng) {
                    let course = COURSES
                        .iter()
                        .position(|c| c.eq_ignore_ascii_case(name))
                        .unwrap_or(15);
                    order.retain(|&c| c != course);
                    order.push(course);
                }
                order
            }
        };
        Ok(())
    }

    fn choose_engine_classes(&mut self, rng: &mut StdRng) -> Result<()> {
        let s = &mut self.settings;
        let middle = s.middle_engine_class;
        ensure!(
            (60..=175).contains(&middle),
            "{GAME} player {}: middle_engine_class must be in 60..=175, got {}",
            self.player,
            middle
        );
        if s.low_engine_class == 0 {
            s.low_engine_class = rng.gen_range(35..middle - 24);
        } else if s.low_engine_class > middle - 25 {
            s.low_engine_class = middle - 25;
        }
        if s.high_engine_class == 0 {
            s.high_engine_class = rng.gen_range(middle + 25..201);
        } else if s.high_engine_class < middle + 25 {
            s.high_engine_class = middle + 25;
        }
        Ok(())
    }
}

impl World for Mk64World {
    fn game(&self) -> &str {
        GAME
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn generate_early(&mut self, rng: &mut StdRng) -> Result<()> {
        ensure!(
            self.settings.locked_courses <= 15,
            "{GAME} player {}: locked_courses must be at most 15, got {}",
            self.player,
            self.settings.locked_courses
        );
        for name in &self.settings.final_course_pool {
            if !COURSES.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                bail!(
                    "{GAME} player {}: unknown course '{}' in final_course_pool",
                    self.player,
                    name
                );
            }
        }

        let num_items = self.num_unpaired_items();
        let num_locations = self.num_unpaired_locations();
        if num_items > num_locations {
            bail!(
                "{GAME} player {}: options call for {} items but only {} locations \
                 (game_mode={}, shuffle_drift_abilities={}, minimum_filler_items={})",
                self.player,
                num_items,
                num_locations,
                self.settings.game_mode,
                self.settings.shuffle_drift_abilities,
                self.settings.minimum_filler_items
            );
        }
        self.num_filler_items = self.settings.minimum_filler_items + (num_locations - num_items);

        let mut drivers: Vec<&str> = DRIVERS.to_vec();
        drivers.shuffle(rng);
        self.starting_drivers = drivers[..self.num_starting_drivers()]
            .iter()
            .map(|d| format!("Driver Unlock {d}"))
            .collect();

        self.choose_course_order(rng)?;
        self.choose_engine_classes(rng)?;
        info!(
            "{GAME} player {}: {} items, {} locations, {} filler",
            self.player, num_items, num_locations, self.num_filler_items
        );
        Ok(())
    }

    fn create_regions(&mut self, mw: &mut MultiWorld, _rng: &mut StdRng) -> Result<()> {
        let player = self.player;
        let s = self.settings.clone();
        mw.create_region(player, "Menu")?;
        for (i, course) in COURSES.iter().enumerate() {
            mw.create_region(player, course)?;
            for (k, kind) in ["Lead", "Qualify", "Win"].iter().enumerate() {
                let name = format!("{kind} {course}");
                let loc = self.add_location(mw, &name, (3 * i + k) as i64, course)?;
                if mw.locations[loc].is_event() {
                    self.victory_location = Some(loc);
                }
            }
            for &(c, name, code, group) in COURSE_EXTRAS {
                let enabled = match group {
                    Group::Hazard => s.hazard_locations,
                    Group::Secret => s.secret_locations,
                };
                if c == i && enabled {
                    self.add_location(mw, name, code, course)?;
                }
            }
        }
        if s.hazard_locations {
            for &(name, code, courses) in SHARED_HAZARDS {
                mw.create_region(player, name)?;
                self.add_location(mw, name, code, name)?;
                for &c in courses {
                    mw.connect(player, COURSES[c], name, None, None)?;
                }
            }
        }

        let order = self.course_order.clone();
        match s.game_mode {
            GameMode::Cups => {
                for (cup_idx, cup) in CUPS.iter().enumerate() {
                    let ceremony = format!("{cup} Cup Trophy Ceremony");
                    mw.create_region(player, &ceremony)?;
                    for (name, code) in trophy_names(cup, s.cup_trophy_locations) {
                        let loc = self.add_location(mw, &name, code, &ceremony)?;
                        if mw.locations[loc].is_event() {
                            self.victory_location = Some(loc);
                        }
                    }
                    let courses = &order[4 * cup_idx..4 * cup_idx + 4];
                    let rule = (cup_idx > 0)
                        .then(|| has_count("Progressive Cup Unlock", player, cup_idx as u32));
                    mw.connect(
                        player,
                        "Menu",
                        COURSES[courses[0]],
                        Some(format!("{cup} Cup 1").as_str()),
                        rule,
                    )?;
                    for r in 1..4 {
                        mw.connect(
                            player,
                            COURSES[courses[r - 1]],
                            COURSES[courses[r]],
                            Some(format!("{cup} Cup {}", r + 1).as_str()),
                            None,
                        )?;
                    }
                    mw.connect(
                        player,
                        COURSES[courses[3]],
                        &ceremony,
                        Some(format!("{cup} Cup Finish").as_str()),
                        None,
                    )?;
                }
            }
            GameMode::Courses => {
                for i in 0..16 {
                    let locks = (i + s.locked_courses).saturating_sub(15) as u32;
                    let rule =
                        (locks > 0).then(|| has_count("Progressive Course Unlock", player, locks));
                    mw.connect(
                        player,
                        "Menu",
                        COURSES[order[i]],
                        Some(format!("Course {}", i + 1).as_str()),
                        rule,
                    )?;
                }
            }
        }
        if self.victory_location.is_none() {
            bail!("{GAME} player {}: victory location was not created", player);
        }
        Ok(())
    }

    fn create_items(&mut self, _mw: &MultiWorld) -> Result<Vec<Item>> {
        let s = &self.settings;
        let mut names: Vec<String> = vec![];
        for d in DRIVERS {
            let name = format!("Driver Unlock {d}");
            if !self.starting_drivers.contains(&name) {
                names.push(name);
            }
        }
        names.push("P1 Star Power".to_string());
        if s.two_player {
            names.push("P2 Star Power".to_string());
        }
        let unlock = match s.game_mode {
            GameMode::Cups => "Progressive Cup Unlock",
            GameMode::Courses => "Progressive Course Unlock",
        };
        for _ in 0..self.num_unlocks() {
            names.push(unlock.to_string());
        }
        for d in DRIVERS {
            for _ in 0..s.shuffle_drift_abilities.per_driver() {
                names.push(format!("Progressive Drift {d}"));
            }
        }
        for i in 0..self.num_filler_items {
            names.push(FILLER_ITEMS[i % FILLER_ITEMS.len()].to_string());
        }
        names.iter().map(|n| self.create_item(n)).collect()
    }

    fn create_item(&self, name: &str) -> Result<Item> {
        let Some(code) = Mk64World::item_code(name) else {
            bail!("{GAME}: unknown item '{name}'");
        };
        let classification = if name.starts_with("Progressive Drift") {
            ItemClassification::Useful
        } else if FILLER_ITEMS.contains(&name) {
            ItemClassification::Filler
        } else {
            ItemClassification::Progression
        };
        Ok(Item::new(name, classification, Some(code), self.player))
    }

    fn set_rules(&mut self, mw: &mut MultiWorld) -> Result<()> {
        let player = self.player;
        if self.settings.hazard_locations {
            let hazards = COURSE_EXTRAS
                .iter()
                .filter(|x| x.3 == Group::Hazard)
                .map(|x| x.1)
                .chain(SHARED_HAZARDS.iter().map(|x| x.0));
            for name in hazards {
                let loc = mw.get_location(name, player)?;
                set_rule(mw, Spot::Location(loc), self.star_rule());
            }
        }

        mw.set_completion_condition(player, has(VICTORY_ITEM, player));

        // Starting drivers are needed to get past driver select; gating the victory event on
        // them puts them in sphere 0 of the playthrough.
        let driver_names: Vec<String> = DRIVERS
            .iter()
            .map(|d| format!("Driver Unlock {d}"))
            .collect();
        let min_drivers = self.num_starting_drivers() as u32;
        if let Some(victory) = self.victory_location {
            add_rule(
                mw,
                Spot::Location(victory),
                has_from_list_unique(&driver_names, player, min_drivers),
                Combine::And,
            );
        }
        Ok(())
    }

    fn get_filler_item_name(&self, rng: &mut StdRng) -> Result<String> {
        Ok(FILLER_ITEMS.choose(rng).unwrap_or(&FILLER_ITEMS[0]).to_string())
    }

    fn precollected_items(&self) -> Result<Vec<Item>> {
        self.starting_drivers
            .iter()
            .map(|n| self.create_item(n))
            .collect()
    }

    fn spoiler_notes(&self) -> Vec<String> {
        let mut notes: Vec<String> = self
            .course_order
            .iter()
            .enumerate()
            .map(|(i, &c)| format!("Course {}: {}", i + 1, COURSES[c]))
            .collect();
        notes.push(format!(
            "Engine classes: {}cc / {}cc / {}cc",
            self.settings.low_engine_class,
            self.settings.middle_engine_class,
            self.settings.high_engine_class
        ));
        notes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_default_counts() {
        let world = Mk64World::new(0, &Mk64Settings::default());
        // 7 drivers, 1 star, 3 cup unlocks, 16 drift.
        assert_eq!(world.num_unpaired_items(), 27);
        // 48 race + 9 hazards + 10 secrets + 2 shared hazards + 12 trophies - victory.
        assert_eq!(world.num_unpaired_locations(), 80);
    }

    #[test]
    fn test_engine_classes() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(7);
        let mut world = Mk64World::new(0, &Mk64Settings::default());
        world.generate_early(&mut rng)?;
        let s = &world.settings;
        assert!(s.low_engine_class >= 35 && s.low_engine_class <= s.middle_engine_class - 25);
        assert!(s.high_engine_class >= s.middle_engine_class + 25 && s.high_engine_class <= 200);

        let mut bad = Mk64World::new(
            0,
            &Mk64Settings {
                middle_engine_class: 190,
                ..Mk64Settings::default()
            },
        );
        assert!(bad.generate_early(&mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_final_course_pool() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(1);
        let mut world = Mk64World::new(
            0,
            &Mk64Settings {
                final_course_pool: vec!["rainbow road".to_string()],
                ..Mk64Settings::default()
            },
        );
        world.generate_early(&mut rng)?;
        assert_eq!(world.course_order().len(), 16);
        assert_eq!(world.course_order()[15], 15);
        Ok(())
    }
}
