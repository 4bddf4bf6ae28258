use anyhow::{bail, ensure, Context, Result};
use hashbrown::HashSet;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::worlds::{
    mk64::Mk64Settings, skeleton::SkeletonSettings, tunic::TunicSettings, ufo50::Ufo50Settings,
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "game")]
pub enum WorldSettings {
    Skeleton(SkeletonSettings),
    #[serde(rename = "Mario Kart 64")]
    Mk64(Mk64Settings),
    #[serde(rename = "UFO 50")]
    Ufo50(Ufo50Settings),
    #[serde(rename = "TUNIC")]
    Tunic(TunicSettings),
}

impl WorldSettings {
    pub fn game(&self) -> &'static str {
        match self {
            WorldSettings::Skeleton(_) => crate::worlds::skeleton::GAME,
            WorldSettings::Mk64(_) => crate::worlds::mk64::GAME,
            WorldSettings::Ufo50(_) => crate::worlds::ufo50::GAME,
            WorldSettings::Tunic(_) => crate::worlds::tunic::GAME,
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct PlayerSettings {
    pub name: String,
    #[serde(flatten)]
    pub world: WorldSettings,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ItemLinkSettings {
    pub name: String,
    pub players: Vec<String>,
    /// Item names or item group names to share. Empty shares every progression item.
    #[serde(default)]
    pub item_pool: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct GenerationSettings {
    #[serde(default)]
    pub seed: Option<usize>,
    pub players: Vec<PlayerSettings>,
    #[serde(default)]
    pub item_links: Vec<ItemLinkSettings>,
}

impl GenerationSettings {
    pub fn validate(&self) -> Result<()> {
        ensure!(!self.players.is_empty(), "no players configured");
        let mut names: HashSet<&str> = HashSet::new();
        for p in &self.players {
            ensure!(!p.name.is_empty(), "player names must be non-empty");
            if !names.insert(&p.name) {
                bail!("duplicate player name '{}'", p.name);
            }
        }
        for link in &self.item_links {
            if names.contains(link.name.as_str()) {
                bail!("item link '{}' has the same name as a player", link.name);
            }
            for member in &link.players {
                if !names.contains(member.as_str()) {
                    bail!("item link '{}': unknown player '{}'", link.name, member);
                }
            }
        }
        Ok(())
    }

    pub fn player_index(&self, name: &str) -> Option<usize> {
        self.players.iter().position(|p| p.name == name)
    }
}

pub fn parse_generation_settings(settings_json: &str) -> Result<GenerationSettings> {
    let mut des = serde_json::Deserializer::from_str(settings_json);
    let settings: GenerationSettings = serde_path_to_error::deserialize(&mut des)?;
    settings.validate()?;
    Ok(settings)
}

pub fn load_generation_settings(path: &Path) -> Result<GenerationSettings> {
    info!("Loading settings from {}", path.display());
    let settings_str = std::fs::read_to_string(path)
        .with_context(|| format!("Unable to read settings at {}", path.display()))?;
    parse_generation_settings(&settings_str)
        .with_context(|| format!("Unable to parse settings at {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::worlds::mk64::GameMode;

    #[test]
    fn test_parse_settings() -> Result<()> {
        let settings = parse_generation_settings(
            r#"{
                "seed": 7,
                "players": [
                    {"name": "Alice", "game": "Skeleton"},
                    {"name": "Bob", "game": "Mario Kart 64", "game_mode": "courses"},
                    {"name": "Carol", "game": "Skeleton", "test_option_3": 30}
                ],
                "item_links": [{"name": "Bones", "players": ["Alice", "Carol"]}]
            }"#,
        )?;
        assert_eq!(settings.seed, Some(7));
        assert_eq!(
            settings.players[0].world,
            WorldSettings::Skeleton(SkeletonSettings::default())
        );
        match &settings.players[1].world {
            WorldSettings::Mk64(s) => assert_eq!(s.game_mode, GameMode::Courses),
            other => panic!("unexpected world {other:?}"),
        }
        assert_eq!(settings.player_index("Carol"), Some(2));
        assert_eq!(settings.players[2].world.game(), "Skeleton");
        Ok(())
    }

    #[test]
    fn test_reject_bad_settings() {
        let dup = r#"{"players": [{"name": "A", "game": "UFO 50"}, {"name": "A", "game": "TUNIC"}]}"#;
        assert!(parse_generation_settings(dup).is_err());
        let link = r#"{"players": [{"name": "A", "game": "UFO 50"}],
                       "item_links": [{"name": "L", "players": ["B"]}]}"#;
        assert!(parse_generation_settings(link).is_err());
        let err = parse_generation_settings(
            r#"{"players": [{"name": "A", "game": "Skeleton", "test_option_2": "fourth"}]}"#,
        )
        .unwrap_err();
        let err = format!("{err:#}");
        assert!(err.contains("test_option_2") || err.contains("fourth"));
    }
}
