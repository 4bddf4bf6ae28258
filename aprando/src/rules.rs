use aprando_game::{EntranceIdx, LocationIdx};
use aprando_logic::Rule;

use crate::multiworld::MultiWorld;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Spot {
    Location(LocationIdx),
    Entrance(EntranceIdx),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum Combine {
    #[default]
    And,
    Or,
}

fn rule_slot(world: &mut MultiWorld, spot: Spot) -> &mut Rule {
    match spot {
        Spot::Location(idx) => &mut world.locations[idx].access_rule,
        Spot::Entrance(idx) => &mut world.entrances[idx].access_rule,
    }
}

pub fn set_rule(world: &mut MultiWorld, spot: Spot, rule: Rule) {
    *rule_slot(world, spot) = rule;
}

/// Combines `rule` with whatever rule the spot already has. An always-true old rule is simply
/// replaced under `And` and kept under `Or`.
pub fn add_rule(world: &mut MultiWorld, spot: Spot, rule: Rule, combine: Combine) {
    let slot = rule_slot(world, spot);
    let old = std::mem::take(slot);
    *slot = match combine {
        Combine::And => old.and(rule),
        Combine::Or => old.or(rule),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use aprando_game::{Item, ItemClassification};
    use aprando_logic::helpers::has;

    #[test]
    fn test_set_and_add_rule() -> Result<()> {
        let mut mw = MultiWorld::new();
        let p = mw.add_player("P", "Test");
        mw.create_region(p, "Menu")?;
        let loc = mw.create_location(p, "Chest", Some(1), "Menu")?;
        let spot = Spot::Location(loc);

        add_rule(&mut mw, spot, Rule::always(), Combine::And);
        assert!(mw.locations[loc].access_rule.is_always());
        add_rule(&mut mw, spot, has("A", p), Combine::Or);
        assert!(mw.locations[loc].access_rule.is_always());

        set_rule(&mut mw, spot, has("A", p));
        add_rule(&mut mw, spot, has("B", p), Combine::And);
        let mut state = mw.new_state();
        let item = |name: &str| Item::new(name, ItemClassification::Progression, Some(1), p);
        state.collect(&item("B"));
        assert!(!mw.can_reach(&mut state, spot));
        state.collect(&item("A"));
        assert!(mw.can_reach(&mut state, spot));
        Ok(())
    }
}
