use anyhow::Result;
use aprando_game::{Item, PlayerId};
use aprando_logic::StateHook;
use hashbrown::HashMap;
use rand::rngs::StdRng;
use std::sync::Arc;

use crate::multiworld::MultiWorld;
use crate::seed_group::MergeContext;

/// A game's builder. The generator drives every player's world through these stages in order,
/// finishing each stage for all players before starting the next.
pub trait World {
    fn game(&self) -> &str;

    fn player(&self) -> PlayerId;

    /// Option validation and derived values. Misconfiguration is reported here.
    fn generate_early(&mut self, _rng: &mut StdRng) -> Result<()> {
        Ok(())
    }

    /// Contributes this world's settings to shared cross-player state.
    fn merge(&self, _ctx: &mut MergeContext, _player_name: &str) -> Result<()> {
        Ok(())
    }

    /// Reads back the merged result.
    fn apply_merge(&mut self, _ctx: &MergeContext) -> Result<()> {
        Ok(())
    }

    fn create_regions(&mut self, mw: &mut MultiWorld, rng: &mut StdRng) -> Result<()>;

    /// Items for the pool. The generator pads with filler up to the number of open locations.
    fn create_items(&mut self, mw: &MultiWorld) -> Result<Vec<Item>>;

    fn create_item(&self, name: &str) -> Result<Item>;

    fn set_rules(&mut self, mw: &mut MultiWorld) -> Result<()>;

    fn get_filler_item_name(&self, rng: &mut StdRng) -> Result<String>;

    /// Named sets of item names, usable wherever an item name is accepted in settings.
    fn item_name_groups(&self) -> HashMap<String, Vec<String>> {
        HashMap::new()
    }

    fn precollected_items(&self) -> Result<Vec<Item>> {
        Ok(vec![])
    }

    fn state_hook(&self) -> Option<Arc<dyn StateHook>> {
        None
    }

    /// Extra lines for the spoiler log, e.g. a chosen course order.
    fn spoiler_notes(&self) -> Vec<String> {
        vec![]
    }
}
