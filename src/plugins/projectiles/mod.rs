//! Projectiles: pooled bullets driven by messages.
//!
//! # Overview
//! Bullets are pre-spawned entities that are never structurally toggled. A
//! bullet is "off" when its collision filters are empty and it is hidden.
//!
//! ```text
//! FixedUpdate
//!   reconcile_pool            pool target changed? spawn / retire inactive entries
//!   weapon::fire_weapon       -> SpawnBulletRequest
//!   allocate_bullets_from_pool  free entry -> Active, schedule BulletExpired
//!   expire_bullets            DeferredFired::BulletExpired -> PendingReturn
//!
//! FixedPostUpdate (after CollisionEventSystems)
//!   process_player_bullet_collisions  World / Enemy hits -> PendingReturn (+ Damage)
//!   return_to_pool_commit             PendingReturn -> Inactive (or despawn if retiring)
//! ```
//!
//! # Where do we still branch?
//! - Capacity: the pool can be empty, so the weapon withholds the shot.
//! - Staleness: a lifetime expiry for an earlier shot of a recycled bullet is ignored.

pub mod allocator;
pub mod collision;
pub mod commit;
pub mod components;
pub mod messages;
pub mod pool;

use avian2d::collision::narrow_phase::CollisionEventSystems;
use bevy::prelude::*;

use crate::common::state::GameState;
use crate::plugins::weapon::fire_weapon;

pub struct ProjectilesPlugin;

impl Plugin for ProjectilesPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<pool::BulletPool>()
            .add_message::<messages::SpawnBulletRequest>()
            .add_systems(OnEnter(GameState::InGame), pool::reset_pool);

        app.add_systems(
            FixedUpdate,
            (
                pool::reconcile_pool,
                allocator::allocate_bullets_from_pool.after(fire_weapon),
                allocator::expire_bullets,
            )
                .run_if(in_state(GameState::InGame)),
        );

        app.add_systems(
            FixedPostUpdate,
            (
                collision::process_player_bullet_collisions.after(CollisionEventSystems),
                commit::return_to_pool_commit.after(collision::process_player_bullet_collisions),
            )
                .run_if(in_state(GameState::InGame)),
        );
    }
}

#[cfg(test)]
mod tests;
