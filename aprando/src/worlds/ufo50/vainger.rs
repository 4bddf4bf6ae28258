use anyhow::{ensure, Result};
use aprando_game::{ItemClassification, PlayerId};
use aprando_logic::helpers::{count_at_least, has, has_all, has_any, has_count};
use aprando_logic::{CollectionState, Rule};
use serde::{Deserialize, Serialize};

use super::{completed_item, game_base_id, ItemRow, Ufo50Game};
use crate::multiworld::MultiWorld;

pub const NAME: &str = "Vainger";
const GAME_ID: i64 = 29;

const HEAT_MOD: &str = "Vainger - Heat Mod";
const MULTI_MOD: &str = "Vainger - Multi Mod";
const PULSE_MOD: &str = "Vainger - Pulse Mod";
const FORCE_MOD: &str = "Vainger - Force Mod";
const STABILIZER: &str = "Vainger - Stabilizer";
const SHIELD_UPGRADE: &str = "Vainger - Shield Upgrade";
const SECURITY_CLEARANCE: &str = "Vainger - Progressive Security Clearance";
const KEY_CODES: [&str; 4] = [
    "Vainger - Key Code A",
    "Vainger - Key Code B",
    "Vainger - Key Code C",
    "Vainger - Key Code D",
];
const MODS: [&str; 4] = [HEAT_MOD, MULTI_MOD, PULSE_MOD, FORCE_MOD];

const ITEM_TABLE: &[ItemRow] = &[
    ("Heat Mod", 0, ItemClassification::Progression, 1),
    ("Multi Mod", 1, ItemClassification::Progression, 1),
    ("Pulse Mod", 2, ItemClassification::Progression, 1),
    ("Force Mod", 3, ItemClassification::Progression, 1),
    ("Stabilizer", 10, ItemClassification::Progression, 2),
    ("Clone Material", 11, ItemClassification::Useful, 3),
    ("Shield Upgrade", 12, ItemClassification::Progression, 25),
    ("Key Code A", 20, ItemClassification::Progression, 1),
    ("Key Code B", 21, ItemClassification::Progression, 1),
    ("Key Code C", 22, ItemClassification::Progression, 1),
    ("Key Code D", 23, ItemClassification::Progression, 1),
    ("Progressive Security Clearance", 24, ItemClassification::Progression, 3),
    ("Garden Gift", 30, ItemClassification::Filler, 1),
    ("Gold Disk", 31, ItemClassification::Filler, 1),
    ("Cherry Disk", 32, ItemClassification::Filler, 1),
];

// Genepods are the logical hubs: the player can recharge and swap mods between legs.
const REGIONS: [&str; 25] = [
    "Menu",
    "LatomC6 Genepod",
    "LatomC9 Genepod",
    "LatomD3 Genepod",
    "LatomD5 Genepod",
    "LatomF5 Genepod",
    "LatomF7 Genepod",
    "LatomI4 Genepod",
    "ThetaA4 Genepod",
    "ThetaE9 Genepod",
    "ThetaF5 Genepod",
    "ThetaF6 Genepod",
    "ThetaI7 Genepod",
    "ThetaI9 Genepod",
    "VerdeA1 Genepod",
    "VerdeE1 Genepod",
    "VerdeE6 Genepod",
    "VerdeI7 Genepod",
    "VerdeI9 Genepod",
    "Control Genepod",
    "LatomD6 Area",
    "VerdeSW Area",
    "VerdeH7 Location",
    "ThetaC8 Location",
    "ThetaC10 Location",
];

const LOCATIONS: &[(&str, i64, &str)] = &[
    ("LatomA4 - Shield Upgrade", 0, "LatomD3 Genepod"),
    ("LatomA7 - Shield Upgrade", 1, "LatomD3 Genepod"),
    ("LatomA9 - Shield Upgrade", 2, "LatomC9 Genepod"),
    ("LatomB9 - Shield Upgrade", 3, "LatomC9 Genepod"),
    ("LatomC4 - Shield Upgrade", 4, "LatomC6 Genepod"),
    ("LatomC6 - Clone Material", 5, "LatomC6 Genepod"),
    ("LatomD5 - Key Code", 6, "LatomD5 Genepod"),
    ("LatomD6 - Security Clearance", 7, "LatomD6 Area"),
    ("LatomE4 - Shield Upgrade", 8, "LatomF5 Genepod"),
    ("LatomG8 - Multi Mod", 9, "LatomF7 Genepod"),
    ("LatomI4 - Pulse Mod", 10, "LatomI4 Genepod"),
    ("LatomJ1 - Stabilizer", 11, "LatomF5 Genepod"),
    ("LatomJ3 - Shield Upgrade", 12, "LatomF5 Genepod"),
    ("LatomJ10 - Shield Upgrade", 13, "LatomC9 Genepod"),
    ("ThetaA2 - Clone Material", 100, "ThetaA4 Genepod"),
    ("ThetaA3 - Shield Upgrade", 101, "ThetaA4 Genepod"),
    ("ThetaA9 - Shield Upgrade", 102, "VerdeA1 Genepod"),
    ("ThetaC5 - Clone Material", 103, "ThetaA4 Genepod"),
    ("ThetaC8 - Shield Upgrade", 104, "ThetaC8 Location"),
    ("ThetaC10 - Shield Upgrade", 105, "ThetaC10 Location"),
    ("ThetaD7 - Shield Upgrade", 106, "ThetaA4 Genepod"),
    ("ThetaE9 - Key Code", 107, "ThetaE9 Genepod"),
    ("ThetaH1 - Shield Upgrade", 108, "ThetaI7 Genepod"),
    ("ThetaH4 - Heat Mod", 109, "ThetaI7 Genepod"),
    ("ThetaI4 - Shield Upgrade", 110, "ThetaI7 Genepod"),
    ("ThetaJ7 - Shield Upgrade", 111, "ThetaI7 Genepod"),
    ("VerdeA1 - Shield Upgrade", 200, "VerdeA1 Genepod"),
    ("VerdeB5 - Force Mod", 201, "VerdeSW Area"),
    ("VerdeC4 - Shield Upgrade", 202, "VerdeA1 Genepod"),
    ("VerdeC5 - Shield Upgrade", 203, "VerdeSW Area"),
    ("VerdeE1 - Key Code", 204, "VerdeE1 Genepod"),
    ("VerdeE5 - Security Clearance", 205, "VerdeSW Area"),
    ("VerdeF8 - Shield Upgrade", 206, "VerdeSW Area"),
    ("VerdeG5 - Shield Upgrade", 207, "VerdeI7 Genepod"),
    ("VerdeG10 - Security Clearance", 208, "VerdeI7 Genepod"),
    ("VerdeH7 - Shield Upgrade", 209, "VerdeH7 Location"),
    ("VerdeI4 - Shield Upgrade", 210, "VerdeI7 Genepod"),
    ("VerdeI9 - Key Code", 211, "VerdeI9 Genepod"),
    ("VerdeJ2 - Stabilizer", 212, "VerdeI7 Genepod"),
    ("VerdeJ9 - Shield Upgrade", 213, "VerdeI7 Genepod"),
    ("Control - Shield Upgrade", 300, "Control Genepod"),
    ("Garden", 400, "ThetaI7 Genepod"),
    ("Gold", 401, "Menu"),
    ("Cherry", 402, "Menu"),
];

// (event name, region, boss difficulty)
const BOSSES: &[(&str, &str, usize)] = &[
    ("ThetaB2 - Miniboss Defeated", "ThetaA4 Genepod", 1),
    ("ThetaE9 - Boss Defeated", "ThetaF6 Genepod", 2),
    ("VerdeE1 - Ramses Defeated", "VerdeA1 Genepod", 2),
    ("VerdeI9 - Sura Defeated", "VerdeSW Area", 3),
    ("LatomD5 - Boss Defeated", "LatomC6 Genepod", 3),
    ("Control - Hooper Defeated", "Control Genepod", 4),
];

fn prefixed(name: &str) -> String {
    format!("{NAME} - {name}")
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct VaingerSettings {
    /// Shield upgrades needed for a boss fight, indexed by boss difficulty 0-4.
    pub boss_shield_table: [u32; 5],
    /// Shield upgrades needed to cross the Theta heat zone without the heat mod.
    pub itemless_hell_run: u32,
    /// Shield upgrades needed for the long Latom hell run.
    pub long_hell_run: u32,
    pub spike_tank_shields: u32,
}

impl Default for VaingerSettings {
    fn default() -> Self {
        VaingerSettings {
            boss_shield_table: [0, 0, 5, 10, 15],
            itemless_hell_run: 0,
            long_hell_run: 10,
            spike_tank_shields: 6,
        }
    }
}

/// Can the player survive a hell run that needs this many shield upgrades?
pub fn hell_run(shield_upgrades: u32, player: PlayerId) -> Rule {
    has_count(SHIELD_UPGRADE, player, shield_upgrades)
}

/// Mods collected (distinct), a stabilizer for the hardest fights, and a shield threshold.
pub fn boss_logic(difficulty: usize, shield_table: &[u32; 5], player: PlayerId) -> Rule {
    let shields = shield_table[difficulty];
    Rule::new(move |state: &CollectionState| {
        if !state.has_from_list_unique(&MODS, player, difficulty as u32) {
            return false;
        }
        if difficulty == 4 && !state.has(STABILIZER, player) {
            return false;
        }
        state.count(SHIELD_UPGRADE, player) >= shields
    })
}

/// Taking two spike hits without the force mod needs the heat mod's armor plus shields.
pub fn spike_tank(shields: u32, player: PlayerId) -> Rule {
    has(HEAT_MOD, player).and(count_at_least(
        move |s| s.count(SHIELD_UPGRADE, player),
        shields,
    ))
}

pub struct Vainger {
    settings: VaingerSettings,
}

impl Vainger {
    pub fn new(settings: &VaingerSettings) -> Self {
        Vainger {
            settings: settings.clone(),
        }
    }

    fn connect(
        &self,
        mw: &mut MultiWorld,
        player: PlayerId,
        from: &str,
        to: &str,
        rule: Option<Rule>,
    ) -> Result<()> {
        mw.connect(player, &prefixed(from), &prefixed(to), None, rule)?;
        Ok(())
    }
}

impl Ufo50Game for Vainger {
    fn name(&self) -> &'static str {
        NAME
    }

    fn game_id(&self) -> i64 {
        GAME_ID
    }

    fn validate(&self) -> Result<()> {
        let t = &self.settings.boss_shield_table;
        ensure!(
            t.windows(2).all(|w| w[0] <= w[1]),
            "{NAME}: boss_shield_table must be non-decreasing, got {:?}",
            t
        );
        let total = ITEM_TABLE
            .iter()
            .find(|x| x.0 == "Shield Upgrade")
            .map(|x| x.3 as u32)
            .unwrap_or(0);
        let needed = t[4]
            .max(self.settings.long_hell_run)
            .max(self.settings.itemless_hell_run)
            .max(self.settings.spike_tank_shields);
        ensure!(
            needed <= total,
            "{NAME}: logic needs {} shield upgrades but only {} exist",
            needed,
            total
        );
        Ok(())
    }

    fn item_table(&self) -> &'static [ItemRow] {
        ITEM_TABLE
    }

    fn filler_item(&self) -> &'static str {
        "Shield Upgrade"
    }

    fn create_regions(&self, mw: &mut MultiWorld, player: PlayerId) -> Result<()> {
        for r in REGIONS {
            mw.create_region(player, &prefixed(r))?;
        }
        let base_id = game_base_id(GAME_ID);
        for &(name, offset, region) in LOCATIONS {
            mw.create_location(player, &prefixed(name), Some(base_id + offset), &prefixed(region))?;
        }
        for &(name, region, difficulty) in BOSSES {
            let rule = boss_logic(difficulty, &self.settings.boss_shield_table, player);
            let item_name = if name == "Control - Hooper Defeated" {
                completed_item(NAME)
            } else {
                prefixed(name)
            };
            mw.create_event(player, &prefixed(name), &item_name, &prefixed(region), Some(rule))?;
        }
        Ok(())
    }

    fn set_rules(&self, mw: &mut MultiWorld, p: PlayerId) -> Result<()> {
        let s = &self.settings;
        let heat_or_hell_run = || has(HEAT_MOD, p).or(hell_run(s.itemless_hell_run, p));
        let clearance = |n: u32| has_count(SECURITY_CLEARANCE, p, n);
        let event = |name: &str| has(&prefixed(name), p);

        self.connect(mw, p, "Menu", "ThetaF5 Genepod", None)?;
        self.connect(mw, p, "ThetaF5 Genepod", "ThetaI7 Genepod", None)?;
        self.connect(mw, p, "ThetaF5 Genepod", "ThetaA4 Genepod", Some(heat_or_hell_run()))?;
        self.connect(
            mw,
            p,
            "ThetaF5 Genepod",
            "Control Genepod",
            Some(heat_or_hell_run().and(has_all(&KEY_CODES, p))),
        )?;
        self.connect(mw, p, "ThetaI7 Genepod", "ThetaI9 Genepod", None)?;
        self.connect(
            mw,
            p,
            "ThetaA4 Genepod",
            "LatomC9 Genepod",
            Some(event("ThetaB2 - Miniboss Defeated")),
        )?;
        self.connect(mw, p, "ThetaA4 Genepod", "VerdeA1 Genepod", None)?;
        self.connect(mw, p, "ThetaA4 Genepod", "ThetaF6 Genepod", Some(has(MULTI_MOD, p)))?;
        // Genepods behind bosses only exist once the boss is down.
        self.connect(
            mw,
            p,
            "ThetaF6 Genepod",
            "ThetaE9 Genepod",
            Some(event("ThetaE9 - Boss Defeated")),
        )?;
        self.connect(
            mw,
            p,
            "ThetaI9 Genepod",
            "ThetaA4 Genepod",
            Some(has_all(&[MULTI_MOD, HEAT_MOD], p)),
        )?;
        self.connect(mw, p, "ThetaI9 Genepod", "VerdeI7 Genepod", Some(has(HEAT_MOD, p)))?;
        self.connect(
            mw,
            p,
            "ThetaI9 Genepod",
            "ThetaC10 Location",
            Some(has_all(&[MULTI_MOD, HEAT_MOD, FORCE_MOD], p)),
        )?;
        self.connect(
            mw,
            p,
            "ThetaI9 Genepod",
            "ThetaC8 Location",
            Some(has_all(&[MULTI_MOD, HEAT_MOD], p)),
        )?;
        self.connect(mw, p, "VerdeA1 Genepod", "ThetaC10 Location", Some(has(HEAT_MOD, p)))?;
        self.connect(mw, p, "VerdeA1 Genepod", "ThetaC8 Location", Some(has(HEAT_MOD, p)))?;
        self.connect(
            mw,
            p,
            "VerdeA1 Genepod",
            "VerdeE1 Genepod",
            Some(event("VerdeE1 - Ramses Defeated")),
        )?;
        self.connect(mw, p, "VerdeE1 Genepod", "VerdeE6 Genepod", None)?;
        self.connect(mw, p, "VerdeE1 Genepod", "VerdeI7 Genepod", None)?;
        self.connect(
            mw,
            p,
            "VerdeE6 Genepod",
            "VerdeSW Area",
            Some(clearance(2).or(has(HEAT_MOD, p))),
        )?;
        self.connect(mw, p, "VerdeI7 Genepod", "VerdeSW Area", Some(clearance(1)))?;
        self.connect(
            mw,
            p,
            "VerdeSW Area",
            "VerdeI9 Genepod",
            Some(clearance(2).and(event("VerdeI9 - Sura Defeated"))),
        )?;
        self.connect(mw, p, "VerdeSW Area", "VerdeH7 Location", Some(has(FORCE_MOD, p)))?;
        self.connect(
            mw,
            p,
            "VerdeI7 Genepod",
            "VerdeH7 Location",
            Some(has(FORCE_MOD, p).or(spike_tank(s.spike_tank_shields, p))),
        )?;

        self.connect(
            mw,
            p,
            "LatomC9 Genepod",
            "LatomF7 Genepod",
            Some(has(HEAT_MOD, p).or(hell_run(s.long_hell_run, p))),
        )?;
        self.connect(
            mw,
            p,
            "LatomC9 Genepod",
            "LatomF5 Genepod",
            Some(has_all(&[HEAT_MOD, PULSE_MOD], p)),
        )?;
        self.connect(
            mw,
            p,
            "LatomF7 Genepod",
            "LatomC6 Genepod",
            Some(clearance(3).and(has_any(&[PULSE_MOD, MULTI_MOD], p))),
        )?;
        self.connect(
            mw,
            p,
            "LatomF7 Genepod",
            "LatomD3 Genepod",
            Some(has_any(&[PULSE_MOD, MULTI_MOD], p)),
        )?;
        self.connect(mw, p, "LatomD3 Genepod", "LatomF5 Genepod", None)?;
        self.connect(
            mw,
            p,
            "LatomF5 Genepod",
            "LatomC6 Genepod",
            Some(clearance(2).and(has(HEAT_MOD, p))),
        )?;
        self.connect(
            mw,
            p,
            "LatomC6 Genepod",
            "LatomD5 Genepod",
            Some(clearance(3).and(event("LatomD5 - Boss Defeated"))),
        )?;
        // Thunder is required here to avoid a softlock.
        self.connect(mw, p, "LatomF5 Genepod", "LatomI4 Genepod", Some(has(PULSE_MOD, p)))?;
        self.connect(mw, p, "LatomC6 Genepod", "LatomD6 Area", Some(has(HEAT_MOD, p)))?;
        self.connect(mw, p, "LatomF5 Genepod", "LatomD6 Area", Some(clearance(2)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aprando_game::Item;

    fn state_with(items: &[(&str, usize)]) -> CollectionState {
        let mut state = CollectionState::new(1);
        for &(name, n) in items {
            for _ in 0..n {
                state.collect(&Item::new(name, ItemClassification::Progression, Some(1), 0));
            }
        }
        state
    }

    #[test]
    fn test_boss_logic() {
        let table = VaingerSettings::default().boss_shield_table;
        assert!(boss_logic(0, &table, 0).eval(&state_with(&[])));
        assert!(!boss_logic(1, &table, 0).eval(&state_with(&[])));
        assert!(boss_logic(1, &table, 0).eval(&state_with(&[(FORCE_MOD, 1)])));
        let strong = [(HEAT_MOD, 1), (MULTI_MOD, 1), (PULSE_MOD, 1), (FORCE_MOD, 1)];
        assert!(!boss_logic(2, &table, 0).eval(&state_with(&strong)));
        let mut with_shields = strong.to_vec();
        with_shields.push((SHIELD_UPGRADE, 15));
        assert!(!boss_logic(4, &table, 0).eval(&state_with(&with_shields)));
        with_shields.push((STABILIZER, 1));
        assert!(boss_logic(4, &table, 0).eval(&state_with(&with_shields)));
    }

    #[test]
    fn test_spike_tank_and_hell_run() {
        assert!(hell_run(0, 0).is_always());
        assert!(!spike_tank(6, 0).eval(&state_with(&[(SHIELD_UPGRADE, 10)])));
        assert!(!spike_tank(6, 0).eval(&state_with(&[(HEAT_MOD, 1), (SHIELD_UPGRADE, 5)])));
        assert!(spike_tank(6, 0).eval(&state_with(&[(HEAT_MOD, 1), (SHIELD_UPGRADE, 6)])));
    }

    #[test]
    fn test_settings_validation() {
        let too_many = Vainger::new(&VaingerSettings {
            boss_shield_table: [0, 0, 5, 10, 30],
            ..VaingerSettings::default()
        });
        assert!(too_many.validate().is_err());
        let decreasing = Vainger::new(&VaingerSettings {
            boss_shield_table: [0, 5, 4, 10, 12],
            ..VaingerSettings::default()
        });
        assert!(decreasing.validate().is_err());
        assert!(Vainger::new(&VaingerSettings::default()).validate().is_ok());
    }
}
