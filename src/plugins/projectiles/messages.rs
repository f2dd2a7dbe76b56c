//! Buffered spawn requests.
//!
//! The weapon produces intent; the allocator is the only consumer that touches
//! pool entities. Producer -> queue -> consumer.

use bevy::prelude::*;

#[derive(Message, Clone, Copy, Debug)]
pub struct SpawnBulletRequest {
    pub pos: Vec2,
    pub vel: Vec2,
    pub damage: u32,
    /// Seconds until the bullet returns to the pool if it hits nothing.
    pub lifetime: f32,
    pub owner: Option<Entity>,
}
