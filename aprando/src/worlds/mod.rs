pub mod data_world;
pub mod mk64;
pub mod skeleton;
pub mod tunic;
pub mod ufo50;

use anyhow::Result;
use aprando_game::PlayerId;

use crate::settings::WorldSettings;
use crate::world::World;

pub const GAMES: [&str; 4] = [skeleton::GAME, mk64::GAME, ufo50::GAME, tunic::GAME];

pub fn make_world(player: PlayerId, settings: &WorldSettings) -> Result<Box<dyn World>> {
    Ok(match settings {
        WorldSettings::Skeleton(s) => Box::new(skeleton::SkeletonWorld::new(player, s)?),
        WorldSettings::Mk64(s) => Box::new(mk64::Mk64World::new(player, s)),
        WorldSettings::Ufo50(s) => Box::new(ufo50::Ufo50World::new(player, s)),
        WorldSettings::Tunic(s) => Box::new(tunic::TunicWorld::new(player, s)),
    })
}
