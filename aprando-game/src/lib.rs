// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]

use anyhow::{bail, ensure, Context, Result};
use hashbrown::{HashMap, HashSet};
use log::info;
use serde::{Deserialize, Serialize};
use std::borrow::ToOwned;
use std::fmt::{self, Display, Formatter};
use std::hash::Hash;
use std::path::Path;
use strum_macros::{Display as StrumDisplay, EnumString, VariantNames};

pub const MENU_REGION: &str = "Menu";
pub const VICTORY_ITEM: &str = "Victory";

// Index into MultiWorld players, real players first and then item-link group slots.
pub type PlayerId = usize;
pub type ItemCode = i64; // Stable item ID used on the wire and in save data
pub type LocationCode = i64; // Stable location ID used on the wire and in save data
pub type RegionIdx = usize; // Index into MultiWorld.regions (all players)
pub type EntranceIdx = usize; // Index into MultiWorld.entrances (all players)
pub type LocationIdx = usize; // Index into MultiWorld.locations (all players)
pub type StepTrailId = i32;

#[derive(Default, Clone, Debug)]
pub struct IndexedVec<T: Hash + Eq> {
    pub keys: Vec<T>,
    pub index_by_key: HashMap<T, usize>,
}

impl<T: Hash + Eq> IndexedVec<T> {
    pub fn add<U: ToOwned<Owned = T> + ?Sized>(&mut self, name: &U) -> usize {
        if !self.index_by_key.contains_key(&name.to_owned()) {
            let idx = self.keys.len();
            self.index_by_key.insert(name.to_owned(), self.keys.len());
            self.keys.push(name.to_owned());
            idx
        } else {
            self.index_by_key[&name.to_owned()]
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    EnumString,
    VariantNames,
    StrumDisplay,
    Serialize,
    Deserialize,
    PartialOrd,
    Ord,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ItemClassification {
    Filler,
    Progression,
    Useful,
    Trap,
}

impl ItemClassification {
    // Only progression items can gate logic:
    pub fn is_progression(self) -> bool {
        self == ItemClassification::Progression
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub classification: ItemClassification,
    pub player: PlayerId,
    pub code: Option<ItemCode>,
}

impl Item {
    pub fn new(
        name: &str,
        classification: ItemClassification,
        code: Option<ItemCode>,
        player: PlayerId,
    ) -> Self {
        Item {
            name: name.to_string(),
            classification,
            player,
            code,
        }
    }

    /// Synthetic item that only exists to gate logic. It never has a code and is never sent over
    /// the network.
    pub fn event(name: &str, player: PlayerId) -> Self {
        Item::new(name, ItemClassification::Progression, None, player)
    }

    pub fn is_event(&self) -> bool {
        self.code.is_none()
    }

    pub fn is_progression(&self) -> bool {
        self.classification.is_progression()
    }
}

impl Display for Item {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} (player {})", self.name, self.player)
    }
}

fn default_quantity() -> usize {
    1
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemData {
    pub name: String,
    pub code: Option<ItemCode>,
    pub classification: ItemClassification,
    #[serde(default = "default_quantity")]
    pub quantity: usize,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LocationData {
    pub name: String,
    pub code: Option<LocationCode>,
    pub region: String,
    #[serde(default)]
    pub requirement: Requirement,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExitData {
    pub to: String,
    pub name: Option<String>,
    #[serde(default)]
    pub requirement: Requirement,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionData {
    pub name: String,
    #[serde(default)]
    pub exits: Vec<ExitData>,
}

// An event location holding a locked event item of the same name unless `item` says otherwise.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventData {
    pub name: String,
    pub region: String,
    pub item: Option<String>,
    #[serde(default)]
    pub requirement: Requirement,
}

/// Entity tables and region graph of one game, in the form a data-driven world builder consumes.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WorldData {
    pub game: String,
    #[serde(default)]
    pub items: Vec<ItemData>,
    #[serde(default)]
    pub locations: Vec<LocationData>,
    pub regions: Vec<RegionData>,
    #[serde(default)]
    pub events: Vec<EventData>,
    #[serde(default)]
    pub completion: Option<Requirement>,
}

impl WorldData {
    pub fn load(path: &Path) -> Result<Self> {
        let data_str = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        let data = WorldData::parse(&data_str)
            .with_context(|| format!("unable to parse {}", path.display()))?;
        info!(
            "{}: loaded {} items, {} locations, {} regions from {}",
            data.game,
            data.items.len(),
            data.locations.len(),
            data.regions.len(),
            path.display()
        );
        Ok(data)
    }

    pub fn parse(data_str: &str) -> Result<Self> {
        let data: WorldData = serde_json::from_str(data_str)?;
        data.validate()?;
        Ok(data)
    }

    pub fn validate(&self) -> Result<()> {
        let mut item_names: IndexedVec<String> = IndexedVec::default();
        let mut item_codes: HashSet<ItemCode> = HashSet::new();
        for item in &self.items {
            ensure!(
                item_names.add(&item.name) == item_names.len() - 1,
                "{}: duplicate item name '{}'",
                self.game,
                item.name
            );
            if let Some(code) = item.code {
                if !item_codes.insert(code) {
                    bail!(
                        "{}: duplicate item code {} ('{}')",
                        self.game,
                        code,
                        item.name
                    );
                }
            }
        }

        let mut region_names: IndexedVec<String> = IndexedVec::default();
        for region in &self.regions {
            ensure!(
                region_names.add(&region.name) == region_names.len() - 1,
                "{}: duplicate region name '{}'",
                self.game,
                region.name
            );
        }
        ensure!(
            region_names.index_by_key.contains_key(MENU_REGION),
            "{}: missing '{}' region",
            self.game,
            MENU_REGION
        );
        for region in &self.regions {
            for exit in &region.exits {
                if !region_names.index_by_key.contains_key(&exit.to) {
                    bail!(
                        "{}: exit from '{}' to unknown region '{}'",
                        self.game,
                        region.name,
                        exit.to
                    );
                }
            }
        }

        let mut location_names: IndexedVec<String> = IndexedVec::default();
        let mut location_codes: HashSet<LocationCode> = HashSet::new();
        for loc in &self.locations {
            ensure!(
                location_names.add(&loc.name) == location_names.len() - 1,
                "{}: duplicate location name '{}'",
                self.game,
                loc.name
            );
            if let Some(code) = loc.code {
                if !location_codes.insert(code) {
                    bail!(
                        "{}: duplicate location code {} ('{}')",
                        self.game,
                        code,
                        loc.name
                    );
                }
            }
            if !region_names.index_by_key.contains_key(&loc.region) {
                bail!(
                    "{}: location '{}' references unknown region '{}'",
                    self.game,
                    loc.name,
                    loc.region
                );
            }
        }
        for event in &self.events {
            ensure!(
                location_names.add(&event.name) == location_names.len() - 1,
                "{}: event '{}' collides with another location",
                self.game,
                event.name
            );
            if !region_names.index_by_key.contains_key(&event.region) {
                bail!(
                    "{}: event '{}' references unknown region '{}'",
                    self.game,
                    event.name,
                    event.region
                );
            }
        }
        Ok(())
    }

    pub fn item_name_groups(&self) -> HashMap<String, Vec<String>> {
        let mut out: HashMap<String, Vec<String>> = HashMap::new();
        for item in &self.items {
            if let Some(group) = &item.group {
                out.entry(group.clone()).or_default().push(item.name.clone());
            }
        }
        out
    }

    pub fn filler_items(&self) -> Vec<String> {
        self.items
            .iter()
            .filter(|x| x.classification == ItemClassification::Filler)
            .map(|x| x.name.clone())
            .collect()
    }
}

fn default_count() -> u32 {
    1
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum Requirement {
    #[default]
    Free,
    Never,
    Item {
        name: String,
        #[serde(default = "default_count")]
        count: u32,
    },
    Any(Vec<String>),
    All(Vec<String>),
    // Summed count over the listed items:
    Total {
        items: Vec<String>,
        count: u32,
    },
    // Number of distinct listed items held:
    Unique {
        items: Vec<String>,
        count: u32,
    },
    Not(Box<Requirement>),
    And(Vec<Requirement>),
    Or(Vec<Requirement>),
}

impl Requirement {
    pub fn item(name: &str) -> Requirement {
        Requirement::Item {
            name: name.to_string(),
            count: 1,
        }
    }

    pub fn item_count(name: &str, count: u32) -> Requirement {
        if count == 0 {
            Requirement::Free
        } else {
            Requirement::Item {
                name: name.to_string(),
                count,
            }
        }
    }

    pub fn make_and(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                return Requirement::Never;
            } else if let Requirement::Free = req {
                continue;
            } else if let Requirement::And(and_reqs) = req {
                out_reqs.extend(and_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        if out_reqs.len() > 1 {
            Requirement::And(out_reqs)
        } else {
            out_reqs.pop().unwrap_or(Requirement::Free)
        }
    }

    pub fn make_or(reqs: Vec<Requirement>) -> Requirement {
        let mut out_reqs: Vec<Requirement> = vec![];
        for req in reqs {
            if let Requirement::Never = req {
                continue;
            } else if let Requirement::Free = req {
                return Requirement::Free;
            } else if let Requirement::Or(or_reqs) = req {
                out_reqs.extend(or_reqs);
            } else {
                out_reqs.push(req);
            }
        }
        if out_reqs.len() > 1 {
            Requirement::Or(out_reqs)
        } else {
            out_reqs.pop().unwrap_or(Requirement::Never)
        }
    }

    /// Names of every item the requirement mentions, in first-mention order.
    pub fn item_names(&self) -> Vec<String> {
        let mut out: IndexedVec<String> = IndexedVec::default();
        self.collect_item_names(&mut out);
        out.keys
    }

    fn collect_item_names(&self, out: &mut IndexedVec<String>) {
        match self {
            Requirement::Free | Requirement::Never => {}
            Requirement::Item { name, .. } => {
                out.add(name);
            }
            Requirement::Any(items)
            | Requirement::All(items)
            | Requirement::Total { items, .. }
            | Requirement::Unique { items, .. } => {
                for name in items {
                    out.add(name);
                }
            }
            Requirement::Not(req) => req.collect_item_names(out),
            Requirement::And(reqs) | Requirement::Or(reqs) => {
                for r in reqs {
                    r.collect_item_names(out);
                }
            }
        }
    }
}

impl Display for Requirement {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Requirement::Free => write!(f, "Free"),
            Requirement::Never => write!(f, "Never"),
            Requirement::Item { name, count: 1 } => write!(f, "{name}"),
            Requirement::Item { name, count } => write!(f, "{name} x{count}"),
            Requirement::Any(items) => write!(f, "Any({})", items.join(", ")),
            Requirement::All(items) => write!(f, "All({})", items.join(", ")),
            Requirement::Total { items, count } => {
                write!(f, "Total({}) >= {count}", items.join(", "))
            }
            Requirement::Unique { items, count } => {
                write!(f, "Unique({}) >= {count}", items.join(", "))
            }
            Requirement::Not(req) => write!(f, "Not({req})"),
            Requirement::And(reqs) | Requirement::Or(reqs) => {
                let op = if let Requirement::And(_) = self {
                    "And"
                } else {
                    "Or"
                };
                write!(f, "{op}(")?;
                for (i, r) in reqs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{r}")?;
                }
                write!(f, ")")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_make_and_or() {
        let a = Requirement::item("A");
        let b = Requirement::item("B");
        assert_eq!(
            Requirement::make_and(vec![Requirement::Free, a.clone()]),
            a.clone()
        );
        assert_eq!(
            Requirement::make_and(vec![a.clone(), Requirement::Never]),
            Requirement::Never
        );
        assert_eq!(Requirement::make_and(vec![]), Requirement::Free);
        assert_eq!(
            Requirement::make_and(vec![
                Requirement::And(vec![a.clone(), b.clone()]),
                Requirement::item("C")
            ]),
            Requirement::And(vec![a.clone(), b.clone(), Requirement::item("C")])
        );
        assert_eq!(
            Requirement::make_or(vec![a.clone(), Requirement::Free]),
            Requirement::Free
        );
        assert_eq!(Requirement::make_or(vec![]), Requirement::Never);
        assert_eq!(
            Requirement::make_or(vec![Requirement::Never, b.clone()]),
            b.clone()
        );
    }

    #[test]
    fn test_requirement_json() -> Result<()> {
        let req: Requirement = serde_json::from_str(
            r#"{"and": [{"item": {"name": "Key"}}, {"any": ["Umbrella", "Pin"]}, {"item": {"name": "Coin", "count": 3}}]}"#,
        )?;
        assert_eq!(
            req,
            Requirement::And(vec![
                Requirement::item("Key"),
                Requirement::Any(vec!["Umbrella".to_string(), "Pin".to_string()]),
                Requirement::item_count("Coin", 3),
            ])
        );
        assert_eq!(req.item_names(), vec!["Key", "Umbrella", "Pin", "Coin"]);
        let free: Requirement = serde_json::from_str(r#""free""#)?;
        assert_eq!(free, Requirement::Free);
        Ok(())
    }

    #[test]
    fn test_classification_names() -> Result<()> {
        assert_eq!(
            ItemClassification::from_str("progression")?,
            ItemClassification::Progression
        );
        assert_eq!(ItemClassification::Trap.to_string(), "trap");
        assert!(!ItemClassification::Useful.is_progression());
        Ok(())
    }

    #[test]
    fn test_world_data_validation() {
        let good = r#"{
            "game": "Test",
            "items": [{"name": "Key", "code": 1, "classification": "progression"}],
            "locations": [{"name": "Chest", "code": 10, "region": "Menu"}],
            "regions": [{"name": "Menu", "exits": []}]
        }"#;
        assert!(WorldData::parse(good).is_ok());

        let bad_region = r#"{
            "game": "Test",
            "locations": [{"name": "Chest", "code": 10, "region": "Nowhere"}],
            "regions": [{"name": "Menu"}]
        }"#;
        let err = WorldData::parse(bad_region).unwrap_err();
        assert!(err.to_string().contains("Nowhere"));

        let no_menu = r#"{"game": "Test", "regions": [{"name": "Start"}]}"#;
        assert!(WorldData::parse(no_menu).is_err());

        let dup_code = r#"{
            "game": "Test",
            "items": [
                {"name": "A", "code": 1, "classification": "filler"},
                {"name": "B", "code": 1, "classification": "filler"}
            ],
            "regions": [{"name": "Menu"}]
        }"#;
        assert!(WorldData::parse(dup_code).is_err());
    }
}
