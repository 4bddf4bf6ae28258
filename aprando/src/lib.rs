// The changes suggested by this lint usually make the code more cluttered and less clear:
#![allow(clippy::needless_range_loop)]
// TODO: consider removing this later. It's not a bad lint but I don't want to deal with it now.
#![allow(clippy::too_many_arguments)]

pub mod generate;
pub mod multiworld;
pub mod rules;
pub mod seed_group;
pub mod settings;
pub mod spoiler_log;
pub mod sweep;
pub mod traverse;
pub mod world;
pub mod worlds;

pub use multiworld::MultiWorld;
pub use rules::{add_rule, set_rule, Combine, Spot};
