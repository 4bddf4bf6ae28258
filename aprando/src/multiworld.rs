use anyhow::{bail, ensure, Result};
use aprando_game::{EntranceIdx, Item, LocationCode, LocationIdx, PlayerId, RegionIdx, MENU_REGION};
use aprando_logic::{CollectionState, ItemLinkGroup, Rule, StateHook};
use hashbrown::HashMap;
use log::debug;
use std::sync::Arc;

use crate::rules::Spot;
use crate::traverse;

#[derive(Clone, Debug)]
pub struct PlayerInfo {
    pub name: String,
    pub game: String,
    // Item-link group slots own items but have no regions of their own.
    pub is_group: bool,
}

#[derive(Clone, Debug)]
pub struct Region {
    pub name: String,
    pub player: PlayerId,
    pub locations: Vec<LocationIdx>,
    pub exits: Vec<EntranceIdx>,
    pub entrances: Vec<EntranceIdx>,
}

#[derive(Clone, Debug)]
pub struct Entrance {
    pub name: String,
    pub player: PlayerId,
    pub parent_region: RegionIdx,
    pub connected_region: Option<RegionIdx>,
    pub access_rule: Rule,
}

#[derive(Clone, Debug)]
pub struct Location {
    pub name: String,
    pub player: PlayerId,
    pub code: Option<LocationCode>,
    pub parent_region: RegionIdx,
    pub item: Option<Item>,
    pub locked: bool,
    pub access_rule: Rule,
}

impl Location {
    pub fn is_event(&self) -> bool {
        self.code.is_none()
    }
}

#[derive(Default)]
pub struct MultiWorld {
    pub players: Vec<PlayerInfo>,
    pub regions: Vec<Region>,
    pub entrances: Vec<Entrance>,
    pub locations: Vec<Location>,
    pub completion_conditions: Vec<Rule>,
    pub itempool: Vec<Item>,
    pub precollected: Vec<Item>,
    pub link_groups: Vec<ItemLinkGroup>,
    pub hooks: Vec<Option<Arc<dyn StateHook>>>,
    region_by_name: HashMap<(PlayerId, String), RegionIdx>,
    entrance_by_name: HashMap<(PlayerId, String), EntranceIdx>,
    location_by_name: HashMap<(PlayerId, String), LocationIdx>,
}

impl MultiWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_players(&self) -> usize {
        self.players.len()
    }

    pub fn real_players(&self) -> impl Iterator<Item = PlayerId> + '_ {
        (0..self.players.len()).filter(|&p| !self.players[p].is_group)
    }

    pub fn player_name(&self, player: PlayerId) -> &str {
        &self.players[player].name
    }

    pub fn add_player(&mut self, name: &str, game: &str) -> PlayerId {
        self.players.push(PlayerInfo {
            name: name.to_string(),
            game: game.to_string(),
            is_group: false,
        });
        self.completion_conditions.push(Rule::never());
        self.hooks.push(None);
        self.players.len() - 1
    }

    pub fn add_item_link_group(&mut self, name: &str, members: &[PlayerId]) -> Result<PlayerId> {
        ensure!(!members.is_empty(), "item link '{name}' has no members");
        for &m in members {
            ensure!(
                m < self.players.len() && !self.players[m].is_group,
                "item link '{name}': invalid member {m}"
            );
        }
        let game = self.players[members[0]].game.clone();
        for &m in members {
            ensure!(
                self.players[m].game == game,
                "item link '{name}': member '{}' plays {}, expected {}",
                self.players[m].name,
                self.players[m].game,
                game
            );
        }
        self.players.push(PlayerInfo {
            name: name.to_string(),
            game,
            is_group: true,
        });
        self.completion_conditions.push(Rule::always());
        self.hooks.push(None);
        let group = self.players.len() - 1;
        self.link_groups.push(ItemLinkGroup {
            group,
            members: members.to_vec(),
        });
        Ok(group)
    }

    /// Fresh state for this multiworld: hooks installed, link groups registered and
    /// precollected items already collected.
    pub fn new_state(&self) -> CollectionState {
        let mut state = CollectionState::with_hooks(self.hooks.clone());
        for link in &self.link_groups {
            state.add_link_group(link);
        }
        for item in &self.precollected {
            state.collect(item);
        }
        state
    }

    pub fn create_region(&mut self, player: PlayerId, name: &str) -> Result<RegionIdx> {
        let key = (player, name.to_string());
        if self.region_by_name.contains_key(&key) {
            bail!("duplicate region '{}' for player {}", name, player);
        }
        let idx = self.regions.len();
        self.regions.push(Region {
            name: name.to_string(),
            player,
            locations: vec![],
            exits: vec![],
            entrances: vec![],
        });
        self.region_by_name.insert(key, idx);
        Ok(idx)
    }

    pub fn create_location(
        &mut self,
        player: PlayerId,
        name: &str,
        code: Option<LocationCode>,
        region_name: &str,
    ) -> Result<LocationIdx> {
        let region = self.get_region(region_name, player)?;
        let key = (player, name.to_string());
        if self.location_by_name.contains_key(&key) {
            bail!("duplicate location '{}' for player {}", name, player);
        }
        let idx = self.locations.len();
        self.locations.push(Location {
            name: name.to_string(),
            player,
            code,
            parent_region: region,
            item: None,
            locked: false,
            access_rule: Rule::always(),
        });
        self.regions[region].locations.push(idx);
        self.location_by_name.insert(key, idx);
        Ok(idx)
    }

    /// Adds an exit to `region_name` that leads nowhere until `connect_entrance` is called.
    pub fn create_exit(
        &mut self,
        player: PlayerId,
        region_name: &str,
        entrance_name: &str,
    ) -> Result<EntranceIdx> {
        let region = self.get_region(region_name, player)?;
        let key = (player, entrance_name.to_string());
        if self.entrance_by_name.contains_key(&key) {
            bail!(
                "duplicate entrance '{}' for player {}",
                entrance_name,
                player
            );
        }
        let idx = self.entrances.len();
        self.entrances.push(Entrance {
            name: entrance_name.to_string(),
            player,
            parent_region: region,
            connected_region: None,
            access_rule: Rule::always(),
        });
        self.regions[region].exits.push(idx);
        self.entrance_by_name.insert(key, idx);
        Ok(idx)
    }

    pub fn connect_entrance(
        &mut self,
        entrance: EntranceIdx,
        target_region_name: &str,
    ) -> Result<()> {
        let player = self.entrances[entrance].player;
        let target = self.get_region(target_region_name, player)?;
        if let Some(old) = self.entrances[entrance].connected_region {
            bail!(
                "entrance '{}' already connected to '{}'",
                self.entrances[entrance].name,
                self.regions[old].name
            );
        }
        self.entrances[entrance].connected_region = Some(target);
        self.regions[target].entrances.push(entrance);
        Ok(())
    }

    pub fn connect(
        &mut self,
        player: PlayerId,
        from: &str,
        to: &str,
        name: Option<&str>,
        rule: Option<Rule>,
    ) -> Result<EntranceIdx> {
        let default_name = format!("{from} -> {to}");
        let entrance = self.create_exit(player, from, name.unwrap_or(&default_name))?;
        self.connect_entrance(entrance, to)?;
        if let Some(rule) = rule {
            self.entrances[entrance].access_rule = rule;
        }
        Ok(entrance)
    }

    pub fn add_exits(&mut self, player: PlayerId, from: &str, to: &[&str]) -> Result<()> {
        for t in to {
            self.connect(player, from, t, None, None)?;
        }
        Ok(())
    }

    pub fn place_locked_item(&mut self, location: LocationIdx, item: Item) -> Result<()> {
        let loc = &mut self.locations[location];
        if let Some(existing) = &loc.item {
            bail!(
                "cannot place '{}' at '{}': already holds '{}'",
                item.name,
                loc.name,
                existing.name
            );
        }
        if loc.is_event() && !item.is_event() {
            bail!(
                "event location '{}' can only hold an event item, got '{}'",
                loc.name,
                item.name
            );
        }
        if !loc.is_event() && item.is_event() {
            bail!(
                "event item '{}' cannot be placed at non-event location '{}'",
                item.name,
                loc.name
            );
        }
        debug!("locked '{}' at '{}'", item.name, loc.name);
        loc.item = Some(item);
        loc.locked = true;
        Ok(())
    }

    /// Creates an event location in `region_name` holding a locked event item.
    pub fn create_event(
        &mut self,
        player: PlayerId,
        location_name: &str,
        item_name: &str,
        region_name: &str,
        rule: Option<Rule>,
    ) -> Result<LocationIdx> {
        let loc = self.create_location(player, location_name, None, region_name)?;
        self.place_locked_item(loc, Item::event(item_name, player))?;
        if let Some(rule) = rule {
            self.locations[loc].access_rule = rule;
        }
        Ok(loc)
    }

    pub fn get_region(&self, name: &str, player: PlayerId) -> Result<RegionIdx> {
        match self.region_by_name.get(&(player, name.to_string())) {
            Some(&idx) => Ok(idx),
            None => bail!("unknown region '{}' for player {}", name, player),
        }
    }

    pub fn get_location(&self, name: &str, player: PlayerId) -> Result<LocationIdx> {
        match self.location_by_name.get(&(player, name.to_string())) {
            Some(&idx) => Ok(idx),
            None => bail!("unknown location '{}' for player {}", name, player),
        }
    }

    pub fn get_entrance(&self, name: &str, player: PlayerId) -> Result<EntranceIdx> {
        match self.entrance_by_name.get(&(player, name.to_string())) {
            Some(&idx) => Ok(idx),
            None => bail!("unknown entrance '{}' for player {}", name, player),
        }
    }

    pub fn menu_region(&self, player: PlayerId) -> Option<RegionIdx> {
        self.region_by_name
            .get(&(player, MENU_REGION.to_string()))
            .copied()
    }

    pub fn set_completion_condition(&mut self, player: PlayerId, rule: Rule) {
        self.completion_conditions[player] = rule;
    }

    pub fn push_precollected(&mut self, item: Item) {
        self.precollected.push(item);
    }

    pub fn player_locations(&self, player: PlayerId) -> impl Iterator<Item = LocationIdx> + '_ {
        (0..self.locations.len()).filter(move |&i| self.locations[i].player == player)
    }

    pub fn can_reach(&self, state: &mut CollectionState, spot: Spot) -> bool {
        match spot {
            Spot::Location(idx) => traverse::can_reach_location(self, state, idx),
            Spot::Entrance(idx) => traverse::can_reach_entrance(self, state, idx),
        }
    }

    pub fn validate(&self) -> Result<()> {
        for player in self.real_players() {
            ensure!(
                self.menu_region(player).is_some(),
                "player {} ({}) has no '{}' region",
                player,
                self.players[player].name,
                MENU_REGION
            );
        }
        for e in &self.entrances {
            if e.connected_region.is_none() {
                bail!(
                    "entrance '{}' of player {} is not connected",
                    e.name,
                    e.player
                );
            }
        }
        for loc in &self.locations {
            if loc.is_event() {
                match &loc.item {
                    Some(item) if item.is_event() && loc.locked => {}
                    _ => bail!(
                        "event location '{}' of player {} must hold a locked event item",
                        loc.name,
                        loc.player
                    ),
                }
            } else if let Some(item) = &loc.item {
                ensure!(
                    !item.is_event(),
                    "location '{}' holds event item '{}'",
                    loc.name,
                    item.name
                );
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aprando_game::ItemClassification;

    fn small_world() -> Result<(MultiWorld, PlayerId)> {
        let mut mw = MultiWorld::new();
        let p = mw.add_player("Alice", "Test");
        mw.create_region(p, "Menu")?;
        mw.create_region(p, "Cave")?;
        Ok((mw, p))
    }

    #[test]
    fn test_construction_errors() -> Result<()> {
        let (mut mw, p) = small_world()?;
        assert!(mw.create_region(p, "Cave").is_err());
        assert!(mw.create_location(p, "Chest", Some(1), "Nowhere").is_err());
        mw.create_location(p, "Chest", Some(1), "Cave")?;
        let err = mw.create_location(p, "Chest", Some(2), "Menu").unwrap_err();
        assert!(err.to_string().contains("Chest"));
        assert!(mw.connect(p, "Menu", "Attic", None, None).is_err());
        Ok(())
    }

    #[test]
    fn test_default_entrance_name() -> Result<()> {
        let (mut mw, p) = small_world()?;
        let e = mw.connect(p, "Menu", "Cave", None, None)?;
        assert_eq!(mw.entrances[e].name, "Menu -> Cave");
        assert_eq!(mw.get_entrance("Menu -> Cave", p)?, e);
        let cave = mw.get_region("Cave", p)?;
        assert_eq!(mw.regions[cave].entrances, vec![e]);
        Ok(())
    }

    #[test]
    fn test_unconnected_exit_fails_validation() -> Result<()> {
        let (mut mw, p) = small_world()?;
        let e = mw.create_exit(p, "Menu", "Dark Door")?;
        assert!(mw.validate().is_err());
        mw.connect_entrance(e, "Cave")?;
        mw.validate()?;
        assert!(mw.connect_entrance(e, "Menu").is_err());
        Ok(())
    }

    #[test]
    fn test_event_placement() -> Result<()> {
        let (mut mw, p) = small_world()?;
        let chest = mw.create_location(p, "Chest", Some(1), "Cave")?;
        assert!(mw.place_locked_item(chest, Item::event("Victory", p)).is_err());
        let key = Item::new("Key", ItemClassification::Progression, Some(7), p);
        mw.place_locked_item(chest, key.clone())?;
        assert!(mw.place_locked_item(chest, key).is_err());

        let boss = mw.create_location(p, "Boss", None, "Cave")?;
        assert!(mw.validate().is_err());
        mw.place_locked_item(boss, Item::event("Victory", p))?;
        mw.validate()?;
        Ok(())
    }

    #[test]
    fn test_item_link_group() -> Result<()> {
        let mut mw = MultiWorld::new();
        let a = mw.add_player("A", "Test");
        let b = mw.add_player("B", "Test");
        let c = mw.add_player("C", "Other");
        assert!(mw.add_item_link_group("Mixed", &[a, c]).is_err());
        let g = mw.add_item_link_group("Link", &[a, b])?;
        assert_eq!(g, 3);
        assert_eq!(mw.real_players().collect::<Vec<_>>(), vec![a, b, c]);
        let mut state = mw.new_state();
        state.collect(&Item::new("Bow", ItemClassification::Progression, Some(1), g));
        assert!(state.has("Bow", a));
        assert!(state.has("Bow", b));
        assert!(!state.has("Bow", c));
        Ok(())
    }
}
