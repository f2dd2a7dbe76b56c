//! Collision layers.

use avian2d::prelude::*;

#[derive(PhysicsLayer, Default, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layer {
    #[default]
    Default,
    /// Solid level geometry.
    World,
    /// One-way platforms: solid from above only.
    Platform,
    Player,
    Enemy,
    PlayerBullet,
    Pickup,
    Hazard,
}
