use anyhow::{ensure, Result};
use aprando_game::{Item, PlayerId, WorldData};
use hashbrown::HashMap;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::data_world::DataWorld;
use crate::multiworld::MultiWorld;
use crate::world::World;

pub const GAME: &str = "Skeleton";

const WORLD_DATA: &str = include_str!("../../../data/worlds/skeleton.json");

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestChoice {
    Off,
    First,
    Second,
    Third,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SkeletonSettings {
    pub test_option: bool,
    pub test_option_2: TestChoice,
    pub test_option_3: u32,
}

impl Default for SkeletonSettings {
    fn default() -> Self {
        SkeletonSettings {
            test_option: true,
            test_option_2: TestChoice::First,
            test_option_3: 20,
        }
    }
}

pub struct SkeletonWorld {
    inner: DataWorld,
    settings: SkeletonSettings,
}

impl SkeletonWorld {
    pub fn new(player: PlayerId, settings: &SkeletonSettings) -> Result<Self> {
        Ok(SkeletonWorld {
            inner: DataWorld::new(player, WorldData::parse(WORLD_DATA)?),
            settings: settings.clone(),
        })
    }
}

impl World for SkeletonWorld {
    fn game(&self) -> &str {
        GAME
    }

    fn player(&self) -> PlayerId {
        self.inner.player
    }

    fn generate_early(&mut self, _rng: &mut StdRng) -> Result<()> {
        ensure!(
            (15..=50).contains(&self.settings.test_option_3),
            "{GAME} player {}: test_option_3 must be in 15..=50, got {}",
            self.inner.player,
            self.settings.test_option_3
        );
        Ok(())
    }

    fn create_regions(&mut self, mw: &mut MultiWorld, rng: &mut StdRng) -> Result<()> {
        self.inner.create_regions(mw, rng)
    }

    fn create_items(&mut self, mw: &MultiWorld) -> Result<Vec<Item>> {
        self.inner.create_items(mw)
    }

    fn create_item(&self, name: &str) -> Result<Item> {
        self.inner.create_item(name)
    }

    fn set_rules(&mut self, mw: &mut MultiWorld) -> Result<()> {
        self.inner.set_rules(mw)
    }

    fn get_filler_item_name(&self, rng: &mut StdRng) -> Result<String> {
        self.inner.get_filler_item_name(rng)
    }

    fn item_name_groups(&self) -> HashMap<String, Vec<String>> {
        self.inner.item_name_groups()
    }

    fn spoiler_notes(&self) -> Vec<String> {
        if self.settings.test_option {
            vec![format!("test option 2: {:?}", self.settings.test_option_2)]
        } else {
            vec![]
        }
    }
}
