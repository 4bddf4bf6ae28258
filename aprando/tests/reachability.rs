use anyhow::Result;
use aprando::multiworld::MultiWorld;
use aprando::rules::{add_rule, set_rule, Combine, Spot};
use aprando::sweep::{can_beat_game, has_beaten_game, sweep_for_events};
use aprando::traverse::{
    can_reach_location, can_reach_region, get_path, get_reachable_locations, reachable_regions,
};
use aprando_game::{Item, ItemClassification, PlayerId, VICTORY_ITEM};
use aprando_logic::helpers::{has, has_any, has_count};
use aprando_logic::{CollectionState, Rule};
use hashbrown::HashSet;
use proptest::prelude::*;

const ITEMS: [&str; 4] = ["Key", "Coin", "Umbrella", "Pin"];

fn item(name: &str, player: PlayerId) -> Item {
    Item::new(name, ItemClassification::Progression, Some(1), player)
}

// Menu -> Start -> {Vault (Key), Shop (3 Coin), Garden (Umbrella or Pin)}, with one location in
// each region and a Victory event on a driver unlock.
fn scenario_world() -> Result<(MultiWorld, PlayerId)> {
    let mut mw = MultiWorld::new();
    let p = mw.add_player("Tester", "Test");
    for r in ["Menu", "Start", "Vault", "Shop", "Garden"] {
        mw.create_region(p, r)?;
    }
    mw.connect(p, "Menu", "Start", None, None)?;
    mw.connect(p, "Start", "Vault", None, Some(has("Key", p)))?;
    mw.connect(p, "Start", "Shop", None, Some(has_count("Coin", p, 3)))?;
    mw.connect(p, "Start", "Garden", None, Some(has_any(&["Umbrella", "Pin"], p)))?;
    mw.create_location(p, "Treasure", Some(1), "Vault")?;
    mw.create_location(p, "Shop Item", Some(2), "Shop")?;
    mw.create_location(p, "Flower", Some(3), "Garden")?;
    let victory_rule = has("Driver Unlock Mario", p).or(has("Driver Unlock Luigi", p));
    mw.create_event(p, "Podium", VICTORY_ITEM, "Start", Some(victory_rule))?;
    mw.set_completion_condition(p, has(VICTORY_ITEM, p));
    mw.validate()?;
    Ok((mw, p))
}

#[test]
fn test_gate_opens_with_key() -> Result<()> {
    let (mw, p) = scenario_world()?;
    let treasure = mw.get_location("Treasure", p)?;
    let mut state = mw.new_state();
    assert!(!can_reach_location(&mw, &mut state, treasure));
    state.collect(&item("Key", p));
    assert!(can_reach_location(&mw, &mut state, treasure));
    Ok(())
}

#[test]
fn test_count_threshold_and_removal() -> Result<()> {
    let (mw, p) = scenario_world()?;
    let shop = mw.get_region("Shop", p)?;
    let mut state = mw.new_state();
    state.collect(&item("Coin", p));
    state.collect(&item("Coin", p));
    assert!(!can_reach_region(&mw, &mut state, shop));
    state.collect(&item("Coin", p));
    assert!(can_reach_region(&mw, &mut state, shop));
    state.remove(&item("Coin", p));
    assert!(!can_reach_region(&mw, &mut state, shop));
    Ok(())
}

#[test]
fn test_or_logic() -> Result<()> {
    let (mw, p) = scenario_world()?;
    let garden = mw.get_region("Garden", p)?;
    let mut state = mw.new_state();
    assert!(!can_reach_region(&mw, &mut state, garden));
    state.collect(&item("Pin", p));
    assert!(can_reach_region(&mw, &mut state, garden));
    state.collect(&item("Umbrella", p));
    assert!(can_reach_region(&mw, &mut state, garden));
    Ok(())
}

#[test]
fn test_victory_needs_sweep() -> Result<()> {
    let (mw, p) = scenario_world()?;
    let podium = mw.get_location("Podium", p)?;
    let mut state = mw.new_state();
    state.collect(&item("Driver Unlock Luigi", p));
    assert!(can_reach_location(&mw, &mut state, podium));
    assert!(!has_beaten_game(&mw, &state, p));
    assert!(can_beat_game(&mw, &state));
    // can_beat_game works on a copy.
    assert!(!state.has(VICTORY_ITEM, p));
    assert_eq!(sweep_for_events(&mw, &mut state), 1);
    assert!(has_beaten_game(&mw, &state, p));
    assert_eq!(sweep_for_events(&mw, &mut state), 0);
    Ok(())
}

#[test]
fn test_empty_state() -> Result<()> {
    let (mw, p) = scenario_world()?;
    let mut state = mw.new_state();
    let menu = mw.get_region("Menu", p)?;
    let start = mw.get_region("Start", p)?;
    assert!(can_reach_region(&mw, &mut state, menu));
    assert!(can_reach_region(&mw, &mut state, start));
    assert!(get_reachable_locations(&mw, &mut state, Some(p)).is_empty());
    assert!(!can_beat_game(&mw, &state));
    assert_eq!(get_path(&mw, &state, start).map(|x| x.len()), Some(1));
    Ok(())
}

#[test]
fn test_add_rule_preserves_old_rule() -> Result<()> {
    let (mut mw, p) = scenario_world()?;
    let vault_entrance = mw.get_entrance("Start -> Vault", p)?;
    add_rule(&mut mw, Spot::Entrance(vault_entrance), has("Pin", p), Combine::And);
    let vault = mw.get_region("Vault", p)?;

    let mut state = mw.new_state();
    state.collect(&item("Pin", p));
    assert!(!can_reach_region(&mw, &mut state, vault));
    state.collect(&item("Key", p));
    assert!(can_reach_region(&mw, &mut state, vault));

    let mut key_only = mw.new_state();
    key_only.collect(&item("Key", p));
    assert!(!can_reach_region(&mw, &mut key_only, vault));

    add_rule(&mut mw, Spot::Entrance(vault_entrance), has("Umbrella", p), Combine::Or);
    let mut umbrella = mw.new_state();
    umbrella.collect(&item("Umbrella", p));
    assert!(can_reach_region(&mw, &mut umbrella, vault));

    set_rule(&mut mw, Spot::Entrance(vault_entrance), Rule::never());
    let mut everything = mw.new_state();
    for name in ["Key", "Pin", "Umbrella"] {
        everything.collect(&item(name, p));
    }
    assert!(!can_reach_region(&mw, &mut everything, vault));
    Ok(())
}

#[test]
fn test_item_link_credits_members() -> Result<()> {
    let mut mw = MultiWorld::new();
    let a = mw.add_player("A", "Test");
    let b = mw.add_player("B", "Test");
    let c = mw.add_player("C", "Test");
    for p in [a, b, c] {
        mw.create_region(p, "Menu")?;
        mw.create_region(p, "Vault")?;
        mw.connect(p, "Menu", "Vault", None, Some(has("Key", p)))?;
    }
    let group = mw.add_item_link_group("Link", &[a, b])?;
    let mut state = mw.new_state();
    state.collect(&item("Key", group));
    for (p, expected) in [(a, true), (b, true), (c, false)] {
        let vault = mw.get_region("Vault", p)?;
        assert_eq!(can_reach_region(&mw, &mut state, vault), expected);
    }
    assert!(mw.add_item_link_group("Bad", &[a, 7]).is_err());
    Ok(())
}

#[test]
fn test_remove_then_reach_again() -> Result<()> {
    let (mw, p) = scenario_world()?;
    let vault = mw.get_region("Vault", p)?;
    let garden = mw.get_region("Garden", p)?;
    let flower = mw.get_location("Flower", p)?;
    let mut state = mw.new_state();
    state.collect(&item("Key", p));
    state.collect(&item("Pin", p));
    assert!(can_reach_region(&mw, &mut state, vault));
    assert!(can_reach_location(&mw, &mut state, flower));

    assert!(state.remove(&item("Key", p)));
    assert!(!can_reach_region(&mw, &mut state, vault));
    assert!(can_reach_region(&mw, &mut state, garden));
    assert!(!state.remove(&item("Key", p)));

    assert!(state.remove(&item("Pin", p)));
    assert!(!can_reach_region(&mw, &mut state, garden));
    assert_eq!(
        state.reachable[p].regions,
        reachable_regions(&mw, &state, p)
    );

    state.collect(&item("Key", p));
    state.collect(&item("Umbrella", p));
    assert!(can_reach_region(&mw, &mut state, vault));
    assert!(can_reach_location(&mw, &mut state, flower));
    assert_eq!(
        state.reachable[p].regions,
        reachable_regions(&mw, &state, p)
    );
    Ok(())
}

#[test]
fn test_negated_gate_against_memo() -> Result<()> {
    let (mut mw, p) = scenario_world()?;
    mw.create_region(p, "Quiet Room")?;
    mw.connect(p, "Start", "Quiet Room", None, Some(!has("Coin", p)))?;
    mw.connect(p, "Quiet Room", "Vault", Some("Back Door"), None)?;
    let quiet = mw.get_region("Quiet Room", p)?;
    let vault = mw.get_region("Vault", p)?;

    let mut state = mw.new_state();
    assert!(can_reach_region(&mw, &mut state, vault));
    state.collect(&item("Coin", p));
    assert!(!can_reach_region(&mw, &mut state, quiet));
    assert!(!can_reach_region(&mw, &mut state, vault));
    assert_eq!(
        state.reachable[p].regions,
        reachable_regions(&mw, &state, p)
    );
    state.collect(&item("Key", p));
    assert!(can_reach_region(&mw, &mut state, vault));
    assert!(!can_reach_region(&mw, &mut state, quiet));
    Ok(())
}

// A random graph over six regions (region 0 is Menu). Edge kinds below 4 are monotone; kind 4
// negates a single item.
#[derive(Clone, Debug)]
struct EdgeSpec {
    from: usize,
    to: usize,
    kind: u8,
    item: usize,
    count: u32,
}

fn edge_strategy(num_kinds: u8) -> impl Strategy<Value = EdgeSpec> {
    (0usize..6, 1usize..6, 0u8..num_kinds, 0usize..4, 1u32..3).prop_map(
        |(from, to, kind, item, count)| EdgeSpec {
            from,
            to,
            kind,
            item,
            count,
        },
    )
}

fn edge_rule(edge: &EdgeSpec, p: PlayerId) -> Option<Rule> {
    let name = ITEMS[edge.item];
    match edge.kind {
        0 => None,
        1 => Some(has(name, p)),
        2 => Some(has_count(name, p, edge.count)),
        3 => Some(has_any(&[name, ITEMS[(edge.item + 1) % ITEMS.len()]], p)),
        _ => Some(!has(name, p)),
    }
}

fn region_name(i: usize) -> String {
    if i == 0 {
        "Menu".to_string()
    } else {
        format!("R{i}")
    }
}

fn random_world(edges: &[EdgeSpec]) -> Result<(MultiWorld, PlayerId)> {
    let mut mw = MultiWorld::new();
    let p = mw.add_player("P", "Random");
    for i in 0..6 {
        mw.create_region(p, &region_name(i))?;
    }
    for (i, e) in edges.iter().enumerate() {
        let name = format!("e{i}");
        mw.connect(
            p,
            &region_name(e.from),
            &region_name(e.to),
            Some(name.as_str()),
            edge_rule(e, p),
        )?;
    }
    Ok((mw, p))
}

fn memo_regions(mw: &MultiWorld, state: &mut CollectionState, p: PlayerId) -> HashSet<usize> {
    (0..mw.regions.len())
        .filter(|&r| can_reach_region(mw, state, r))
        .filter(|&r| mw.regions[r].player == p)
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    #[test]
    fn collecting_only_grows_reachability(
        edges in prop::collection::vec(edge_strategy(4), 0..16),
        items in prop::collection::vec(0usize..4, 0..10),
    ) {
        let (mw, p) = random_world(&edges).unwrap();
        let mut state = mw.new_state();
        let mut prev = memo_regions(&mw, &mut state, p);
        for i in items {
            state.collect(&item(ITEMS[i], p));
            let cur = memo_regions(&mw, &mut state, p);
            prop_assert!(prev.is_subset(&cur), "lost regions after collecting {}", ITEMS[i]);
            prev = cur;
        }
    }

    #[test]
    fn memo_matches_fresh_traversal(
        edges in prop::collection::vec(edge_strategy(5), 0..16),
        items in prop::collection::vec(0usize..4, 0..10),
        removals in prop::collection::vec(any::<bool>(), 0..10),
    ) {
        let (mw, p) = random_world(&edges).unwrap();
        let mut state = mw.new_state();
        for (j, &i) in items.iter().enumerate() {
            state.collect(&item(ITEMS[i], p));
            if removals.get(j).copied().unwrap_or(false) && j > 0 {
                state.remove(&item(ITEMS[items[j - 1]], p));
            }
            let memo = memo_regions(&mw, &mut state, p);
            prop_assert_eq!(&memo, &reachable_regions(&mw, &state, p));
        }
    }

    #[test]
    fn queries_are_idempotent(
        edges in prop::collection::vec(edge_strategy(5), 0..16),
        items in prop::collection::vec(0usize..4, 0..10),
    ) {
        let (mw, p) = random_world(&edges).unwrap();
        let mut state = mw.new_state();
        for i in items {
            state.collect(&item(ITEMS[i], p));
        }
        let first = memo_regions(&mw, &mut state, p);
        let counts = state.prog_items[p].clone();
        let second = memo_regions(&mw, &mut state, p);
        prop_assert_eq!(first, second);
        prop_assert_eq!(counts, state.prog_items[p].clone());
    }

    #[test]
    fn combinators_match_boolean_logic(
        a in 0usize..4,
        b in 0usize..4,
        items in prop::collection::vec(0usize..4, 0..6),
    ) {
        let mut state = CollectionState::new(1);
        for i in items {
            state.collect(&item(ITEMS[i], 0));
        }
        let ra = has(ITEMS[a], 0);
        let rb = has(ITEMS[b], 0);
        let (va, vb) = (ra.eval(&state), rb.eval(&state));
        prop_assert_eq!(ra.clone().and(rb.clone()).eval(&state), va && vb);
        prop_assert_eq!(ra.clone().or(rb.clone()).eval(&state), va || vb);
        prop_assert_eq!((!ra.clone()).eval(&state), !va);
        prop_assert_eq!(Rule::all([ra.clone(), rb.clone()]).eval(&state), va && vb);
        prop_assert_eq!(Rule::any([ra.clone(), rb.clone()]).eval(&state), va || vb);
        prop_assert!(Rule::always().and(ra.clone()).eval(&state) == va);
        prop_assert!(!Rule::never().and(ra).eval(&state));
    }
}
