pub mod barbuta;
pub mod porgy;
pub mod vainger;

use anyhow::{bail, ensure, Context, Result};
use aprando_game::{Item, ItemClassification, PlayerId, MENU_REGION, VICTORY_ITEM};
use aprando_logic::helpers::{has, has_all};
use hashbrown::HashSet;
use log::info;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::multiworld::MultiWorld;
use crate::world::World;
use porgy::PorgySettings;
use vainger::VaingerSettings;

pub const GAME: &str = "UFO 50";
pub const GOAL_LOCATION: &str = "Completed All Games";

const BASE_ID: i64 = 0x55464F3530;

/// Games of the collection this world can host, in collection order.
pub const UFO50_GAMES: [&str; 3] = [barbuta::NAME, porgy::NAME, vainger::NAME];

// (name without prefix, id offset, classification, quantity)
pub type ItemRow = (&'static str, i64, ItemClassification, usize);

/// Item and location IDs of a game start at its own block of a thousand.
pub fn game_base_id(game_id: i64) -> i64 {
    BASE_ID + game_id * 1000
}

/// Event item a game grants once it is beaten.
pub fn completed_item(game: &str) -> String {
    format!("{game} - Completed")
}

/// One game of the collection. Every name it creates carries the `"<name> - "` prefix and its
/// entry region is `"<name> - Menu"`.
pub trait Ufo50Game {
    fn name(&self) -> &'static str;

    fn game_id(&self) -> i64;

    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn item_table(&self) -> &'static [ItemRow];

    fn filler_item(&self) -> &'static str;

    /// Regions, locations and the completion event.
    fn create_regions(&self, mw: &mut MultiWorld, player: PlayerId) -> Result<()>;

    fn set_rules(&self, mw: &mut MultiWorld, player: PlayerId) -> Result<()>;
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct Ufo50Settings {
    pub always_on_games: Vec<String>,
    /// Pool that `random_choice_game_count` games are drawn from, on top of the always-on ones.
    pub random_choice_games: Vec<String>,
    pub random_choice_game_count: usize,
    pub vainger: VaingerSettings,
    pub porgy: PorgySettings,
}

impl Default for Ufo50Settings {
    fn default() -> Self {
        Ufo50Settings {
            always_on_games: UFO50_GAMES.iter().map(|g| g.to_string()).collect(),
            random_choice_games: vec![],
            random_choice_game_count: 0,
            vainger: VaingerSettings::default(),
            porgy: PorgySettings::default(),
        }
    }
}

fn make_game(name: &str, settings: &Ufo50Settings) -> Option<Box<dyn Ufo50Game>> {
    match name {
        barbuta::NAME => Some(Box::new(barbuta::Barbuta)),
        porgy::NAME => Some(Box::new(porgy::Porgy::new(&settings.porgy))),
        vainger::NAME => Some(Box::new(vainger::Vainger::new(&settings.vainger))),
        _ => None,
    }
}

pub struct Ufo50World {
    player: PlayerId,
    settings: Ufo50Settings,
    games: Vec<Box<dyn Ufo50Game>>,
}

impl Ufo50World {
    pub fn new(player: PlayerId, settings: &Ufo50Settings) -> Self {
        Ufo50World {
            player,
            settings: settings.clone(),
            games: vec![],
        }
    }

    pub fn included_games(&self) -> Vec<&'static str> {
        self.games.iter().map(|g| g.name()).collect()
    }

    /// Always-on games plus a random draw from the remaining choices. Asking for at least as
    /// many as there are choices takes all of them.
    fn select_games(&self, rng: &mut StdRng) -> Result<Vec<String>> {
        let s = &self.settings;
        for name in s.always_on_games.iter().chain(&s.random_choice_games) {
            ensure!(
                UFO50_GAMES.contains(&name.as_str()),
                "{GAME} player {}: unknown game '{name}'",
                self.player
            );
        }
        ensure!(
            s.random_choice_game_count <= 50,
            "{GAME} player {}: random_choice_game_count must be at most 50, got {}",
            self.player,
            s.random_choice_game_count
        );
        let always_on: HashSet<&str> = s.always_on_games.iter().map(|x| x.as_str()).collect();
        let mut maybe: Vec<&str> = s
            .random_choice_games
            .iter()
            .map(|x| x.as_str())
            .filter(|x| !always_on.contains(x))
            .collect();
        maybe.sort();
        maybe.dedup();

        let mut included: HashSet<&str> = always_on.clone();
        if s.random_choice_game_count >= maybe.len() {
            included.extend(maybe);
        } else {
            included.extend(maybe.choose_multiple(rng, s.random_choice_game_count).copied());
        }
        if included.is_empty() {
            bail!("{GAME}: player {} has not selected any games", self.player);
        }
        Ok(UFO50_GAMES
            .iter()
            .filter(|g| included.contains(*g))
            .map(|g| g.to_string())
            .collect())
    }

    fn game_for_item<'a>(&'a self, name: &'a str) -> Option<(&'a dyn Ufo50Game, &'a str)> {
        self.games.iter().find_map(|g| {
            let short = name.strip_prefix(g.name())?.strip_prefix(" - ")?;
            Some((g.as_ref(), short))
        })
    }
}

impl World for Ufo50World {
    fn game(&self) -> &str {
        GAME
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn generate_early(&mut self, rng: &mut StdRng) -> Result<()> {
        let names = self.select_games(rng)?;
        let mut games = vec![];
        for name in &names {
            let game = make_game(name, &self.settings)
                .with_context(|| format!("{GAME}: unknown game '{name}'"))?;
            game.validate()?;
            games.push(game);
        }
        self.games = games;
        info!(
            "{GAME} player {}: playing {}",
            self.player,
            names.join(", ")
        );
        Ok(())
    }

    fn create_regions(&mut self, mw: &mut MultiWorld, _rng: &mut StdRng) -> Result<()> {
        let player = self.player;
        mw.create_region(player, MENU_REGION)?;
        for game in &self.games {
            game.create_regions(mw, player)?;
            let boot = format!("Boot {}", game.name());
            let game_menu = format!("{} - Menu", game.name());
            mw.connect(player, MENU_REGION, &game_menu, Some(boot.as_str()), None)?;
        }
        let goals: Vec<String> = self.games.iter().map(|g| completed_item(g.name())).collect();
        mw.create_event(
            player,
            GOAL_LOCATION,
            VICTORY_ITEM,
            MENU_REGION,
            Some(has_all(&goals, player)),
        )?;
        Ok(())
    }

    fn create_items(&mut self, _mw: &MultiWorld) -> Result<Vec<Item>> {
        let mut items = vec![];
        for game in &self.games {
            for &(name, _, _, quantity) in game.item_table() {
                let full_name = format!("{} - {}", game.name(), name);
                for _ in 0..quantity {
                    items.push(self.create_item(&full_name)?);
                }
            }
        }
        Ok(items)
    }

    fn create_item(&self, name: &str) -> Result<Item> {
        let Some((game, short)) = self.game_for_item(name) else {
            bail!("{GAME}: unknown item '{name}'");
        };
        match game.item_table().iter().find(|x| x.0 == short) {
            Some(&(_, offset, classification, _)) => Ok(Item::new(
                name,
                classification,
                Some(game_base_id(game.game_id()) + offset),
                self.player,
            )),
            None => bail!("{GAME}: unknown item '{name}'"),
        }
    }

    fn set_rules(&mut self, mw: &mut MultiWorld) -> Result<()> {
        for game in &self.games {
            game.set_rules(mw, self.player)?;
        }
        mw.set_completion_condition(self.player, has(VICTORY_ITEM, self.player));
        Ok(())
    }

    fn get_filler_item_name(&self, rng: &mut StdRng) -> Result<String> {
        let game = self
            .games
            .choose(rng)
            .with_context(|| format!("{GAME}: no games selected"))?;
        Ok(format!("{} - {}", game.name(), game.filler_item()))
    }

    fn spoiler_notes(&self) -> Vec<String> {
        vec![format!("games: {}", self.included_games().join(", "))]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn world(settings: Ufo50Settings) -> Ufo50World {
        Ufo50World::new(0, &settings)
    }

    #[test]
    fn test_select_games() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let w = world(Ufo50Settings {
            always_on_games: vec!["Vainger".to_string()],
            random_choice_games: vec!["Porgy".to_string(), "Vainger".to_string()],
            random_choice_game_count: 5,
            ..Ufo50Settings::default()
        });
        assert_eq!(w.select_games(&mut rng)?, vec!["Porgy", "Vainger"]);

        let w = world(Ufo50Settings {
            always_on_games: vec![],
            random_choice_games: vec!["Barbuta".to_string(), "Porgy".to_string()],
            random_choice_game_count: 1,
            ..Ufo50Settings::default()
        });
        let picked = w.select_games(&mut rng)?;
        assert_eq!(picked.len(), 1);
        assert!(picked[0] == "Barbuta" || picked[0] == "Porgy");
        Ok(())
    }

    #[test]
    fn test_selection_errors() {
        let mut rng = StdRng::seed_from_u64(0);
        let none = world(Ufo50Settings {
            always_on_games: vec![],
            random_choice_games: vec!["Porgy".to_string()],
            random_choice_game_count: 0,
            ..Ufo50Settings::default()
        });
        let err = none.select_games(&mut rng).unwrap_err();
        assert!(err.to_string().contains("has not selected any games"));
        let unknown = world(Ufo50Settings {
            always_on_games: vec!["Pilot Quest".to_string()],
            ..Ufo50Settings::default()
        });
        assert!(unknown.select_games(&mut rng).is_err());
    }

    #[test]
    fn test_item_ids_per_game() -> Result<()> {
        let mut rng = StdRng::seed_from_u64(0);
        let mut w = world(Ufo50Settings::default());
        w.generate_early(&mut rng)?;
        let key = w.create_item("Barbuta - Key")?;
        assert_eq!(key.code, Some(game_base_id(1) + 8));
        let fuel = w.create_item("Porgy - Fuel Tank")?;
        assert_eq!(fuel.code, Some(game_base_id(22)));
        assert!(w.create_item("Barbuta - Fuel Tank").is_err());
        assert!(w.create_item("Fuel Tank").is_err());
        Ok(())
    }
}
