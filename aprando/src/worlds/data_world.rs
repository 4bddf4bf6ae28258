use anyhow::{bail, Context, Result};
use aprando_game::{Item, PlayerId, Requirement, WorldData, VICTORY_ITEM};
use aprando_logic::{helpers::has, Rule};
use hashbrown::HashMap;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::multiworld::MultiWorld;
use crate::rules::{set_rule, Spot};
use crate::world::World;

/// A world whose regions, entities and logic come entirely from a `WorldData` table.
pub struct DataWorld {
    pub player: PlayerId,
    pub data: WorldData,
}

impl DataWorld {
    pub fn new(player: PlayerId, data: WorldData) -> Self {
        DataWorld { player, data }
    }

    fn exit_name(from: &str, to: &str, name: &Option<String>) -> String {
        match name {
            Some(n) => n.clone(),
            None => format!("{from} -> {to}"),
        }
    }

    fn set_requirement(&self, mw: &mut MultiWorld, spot: Spot, req: &Requirement) {
        if *req != Requirement::Free {
            set_rule(mw, spot, Rule::from_requirement(req, self.player));
        }
    }
}

impl World for DataWorld {
    fn game(&self) -> &str {
        &self.data.game
    }

    fn player(&self) -> PlayerId {
        self.player
    }

    fn create_regions(&mut self, mw: &mut MultiWorld, _rng: &mut StdRng) -> Result<()> {
        let player = self.player;
        for region in &self.data.regions {
            mw.create_region(player, &region.name)?;
        }
        for region in &self.data.regions {
            for exit in &region.exits {
                let name = DataWorld::exit_name(&region.name, &exit.to, &exit.name);
                mw.connect(player, &region.name, &exit.to, Some(name.as_str()), None)?;
            }
        }
        for loc in &self.data.locations {
            mw.create_location(player, &loc.name, loc.code, &loc.region)?;
        }
        for event in &self.data.events {
            let item_name = event.item.as_deref().unwrap_or(&event.name);
            mw.create_event(player, &event.name, item_name, &event.region, None)?;
        }
        Ok(())
    }

    fn create_items(&mut self, _mw: &MultiWorld) -> Result<Vec<Item>> {
        let mut items = vec![];
        for item_data in &self.data.items {
            for _ in 0..item_data.quantity {
                items.push(self.create_item(&item_data.name)?);
            }
        }
        Ok(items)
    }

    fn create_item(&self, name: &str) -> Result<Item> {
        match self.data.items.iter().find(|x| x.name == name) {
            Some(x) => Ok(Item::new(name, x.classification, x.code, self.player)),
            None => bail!("{}: unknown item '{}'", self.data.game, name),
        }
    }

    fn set_rules(&mut self, mw: &mut MultiWorld) -> Result<()> {
        let player = self.player;
        for region in &self.data.regions {
            for exit in &region.exits {
                let name = DataWorld::exit_name(&region.name, &exit.to, &exit.name);
                let entrance = mw.get_entrance(&name, player)?;
                self.set_requirement(mw, Spot::Entrance(entrance), &exit.requirement);
            }
        }
        for loc in &self.data.locations {
            let idx = mw.get_location(&loc.name, player)?;
            self.set_requirement(mw, Spot::Location(idx), &loc.requirement);
        }
        for event in &self.data.events {
            let idx = mw.get_location(&event.name, player)?;
            self.set_requirement(mw, Spot::Location(idx), &event.requirement);
        }
        let completion = match &self.data.completion {
            Some(req) => Rule::from_requirement(req, player),
            None => has(VICTORY_ITEM, player),
        };
        mw.set_completion_condition(player, completion);
        Ok(())
    }

    fn get_filler_item_name(&self, rng: &mut StdRng) -> Result<String> {
        self.data
            .filler_items()
            .choose(rng)
            .cloned()
            .with_context(|| format!("{}: no filler items defined", self.data.game))
    }

    fn item_name_groups(&self) -> HashMap<String, Vec<String>> {
        self.data.item_name_groups()
    }
}
