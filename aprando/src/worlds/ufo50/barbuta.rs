use anyhow::Result;
use aprando_game::{ItemClassification, PlayerId};
use aprando_logic::helpers::{has, has_any};
use aprando_logic::{CollectionState, Rule};

use super::{completed_item, game_base_id, ItemRow, Ufo50Game};
use crate::multiworld::MultiWorld;
use crate::rules::{set_rule, Spot};

pub const NAME: &str = "Barbuta";
const GAME_ID: i64 = 1;

const PIN: &str = "Barbuta - Pin";
const UMBRELLA: &str = "Barbuta - Umbrella";
const NECKLACE: &str = "Barbuta - Necklace";
const CANDY: &str = "Barbuta - Candy";
const KEY: &str = "Barbuta - Key";
const BLOOD_SWORD: &str = "Barbuta - Blood Sword";
const BROKEN_WALL: &str = "Barbuta - A Broken Wall";
const WAND: &str = "Barbuta - Wand";
const BAT_ORB: &str = "Barbuta - Bat Orb";

const ITEM_TABLE: &[ItemRow] = &[
    ("$50", 0, ItemClassification::Progression, 5),
    ("$100", 1, ItemClassification::Progression, 5),
    ("Umbrella", 2, ItemClassification::Progression, 1),
    ("Necklace", 3, ItemClassification::Progression, 1),
    ("Pin", 4, ItemClassification::Progression, 1),
    ("Candy", 5, ItemClassification::Progression, 1),
    ("Wand", 6, ItemClassification::Progression, 1),
    ("Blood Sword", 7, ItemClassification::Progression, 1),
    ("Key", 8, ItemClassification::Progression, 1),
    ("Bat Orb", 9, ItemClassification::Progression, 1),
    ("Trash", 10, ItemClassification::Filler, 1),
    ("Egg", 11, ItemClassification::Filler, 4),
    ("A Broken Wall", 12, ItemClassification::Progression, 1),
];

const REGIONS: [&str; 14] = [
    "Menu",
    "Starting Area",
    "Key Room",
    "Platforms above D4",
    "Blood Sword Room",
    "G3 and Nearby",
    "F7 and Nearby",
    "Bat Altar",
    "Above Entrance",
    "Wand Trade Room",
    "G7 and Nearby",
    "Mimic Room",
    "Boss Area",
    "C7 above Ladders",
];

// Rooms are row letter then column number.
const LOCATIONS: [(&str, i64, &str); 24] = [
    ("Green Skull - A1", 0, "Platforms above D4"),
    ("Egg Shop - B6", 1, "Boss Area"),
    ("Upper Shop Candy - C1", 2, "Platforms above D4"),
    ("Upper Shop Umbrella - C1", 3, "Platforms above D4"),
    ("Chest - C2", 4, "Platforms above D4"),
    ("Bat Altar - D1", 5, "Bat Altar"),
    ("Coin - D4", 6, "Starting Area"),
    ("Little Guy Breaks a Wall - D7", 7, "C7 above Ladders"),
    ("Chest - E3", 8, "Blood Sword Room"),
    ("Chest - E5", 9, "Key Room"),
    ("Chest - E8", 10, "F7 and Nearby"),
    ("Green Skull - F2", 11, "Starting Area"),
    ("Lower Shop Umbrella - F2", 12, "Starting Area"),
    ("Lower Shop Trash - F2", 13, "Starting Area"),
    ("Lower Shop Pin - F2", 14, "Starting Area"),
    ("Chest - F3 Door", 15, "G3 and Nearby"),
    ("Chest - F4", 16, "Starting Area"),
    ("Chest - F5", 17, "Starting Area"),
    ("Chest - F6", 18, "F7 and Nearby"),
    ("Chest - G2", 19, "Starting Area"),
    ("Chest - G5", 20, "Starting Area"),
    ("Chest - H5", 21, "Starting Area"),
    ("Chest - H7", 22, "G7 and Nearby"),
    ("Wand Trade - H7", 23, "Wand Trade Room"),
];

// Shop prices.
const PRICES: [(&str, u32); 7] = [
    ("Egg Shop - B6", 100),
    ("Upper Shop Candy - C1", 100),
    ("Upper Shop Umbrella - C1", 50),
    ("Lower Shop Umbrella - F2", 100),
    ("Lower Shop Trash - F2", 50),
    ("Lower Shop Pin - F2", 200),
    ("Little Guy Breaks a Wall - D7", 500),
];

fn prefixed(name: &str) -> String {
    format!("{NAME} - {name}")
}

pub fn money(state: &CollectionState, player: PlayerId) -> u32 {
    state.count("Barbuta - $100", player) * 100 + state.count("Barbuta - $50", player) * 50
}

pub fn has_money(amount: u32, player: PlayerId) -> Rule {
    Rule::new(move |state| money(state, player) >= amount)
}

pub struct Barbuta;

impl Ufo50Game for Barbuta {
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
        "Egg"
    }

    fn create_regions(&self, mw: &mut MultiWorld, player: PlayerId) -> Result<()> {
        for r in REGIONS {
            mw.create_region(player, &prefixed(r))?;
        }
        let base_id = game_base_id(GAME_ID);
        for (name, offset, region) in LOCATIONS {
            mw.create_location(player, &prefixed(name), Some(base_id + offset), &prefixed(region))?;
        }
        mw.create_event(
            player,
            &prefixed("Beat the Boss"),
            &completed_item(NAME),
            &prefixed("Boss Area"),
            Some(has_any(&[BLOOD_SWORD, WAND, BAT_ORB], player)),
        )?;
        Ok(())
    }

    fn set_rules(&self, mw: &mut MultiWorld, p: PlayerId) -> Result<()> {
        let connections: [(&str, &str, Option<Rule>); 16] = [
            ("Menu", "Starting Area", None),
            ("Starting Area", "Key Room", None),
            ("Starting Area", "Platforms above D4", Some(has(NECKLACE, p))),
            ("Starting Area", "Blood Sword Room", None),
            // Pin through G2 or umbrella through H3.
            ("Starting Area", "G3 and Nearby", Some(has_any(&[PIN, UMBRELLA], p))),
            ("Starting Area", "F7 and Nearby", Some(has(PIN, p))),
            ("Starting Area", "Mimic Room", Some(has(WAND, p))),
            ("Starting Area", "C7 above Ladders", Some(has(CANDY, p))),
            ("Platforms above D4", "Bat Altar", None),
            ("Platforms above D4", "Above Entrance", None),
            ("Platforms above D4", "Boss Area", Some(has(KEY, p))),
            ("Above Entrance", "Wand Trade Room", None),
            ("G7 and Nearby", "Wand Trade Room", Some(has(PIN, p))),
            ("Wand Trade Room", "G7 and Nearby", Some(has(PIN, p))),
            ("C7 above Ladders", "Boss Area", Some(has(BROKEN_WALL, p))),
            ("Mimic Room", "Boss Area", None),
        ];
        for (from, to, rule) in connections {
            mw.connect(p, &prefixed(from), &prefixed(to), None, rule)?;
        }

        let g2 = mw.get_location(&prefixed("Chest - G2"), p)?;
        set_rule(mw, Spot::Location(g2), has(PIN, p));
        for (name, price) in PRICES {
            let loc = mw.get_location(&prefixed(name), p)?;
            set_rule(mw, Spot::Location(loc), has_money(price, p));
        }
        Ok(())
    }
}
