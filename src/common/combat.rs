//! Damage messages shared by every damage source and every damageable entity.

use bevy::prelude::*;

/// `amount` of damage to `target`.
///
/// `source` is the entity credited with a kill (the shooter for bullets). Hazards
/// and contact damage carry no source, so a kill they cause grants no reward.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Damage {
    pub target: Entity,
    pub amount: u32,
    pub source: Option<Entity>,
}
