//! Return commit: recycle bullets back into the pool.
//!
//! This system owns the *Inactive invariants*: an inactive bullet is hidden,
//! has zero velocity and collides with nothing. Bullets the pool is shrinking
//! away are despawned here instead, after their flight.

use avian2d::prelude::*;
use bevy::prelude::*;

use super::components::{BulletState, PooledBullet};
use super::pool::{BulletPool, Recycle, inactive_bullet_layers};

pub fn return_to_pool_commit(
    mut commands: Commands,
    mut pool: ResMut<BulletPool>,
    mut q: Query<
        (
            Entity,
            &mut BulletState,
            &mut Visibility,
            &mut LinearVelocity,
            &mut CollisionLayers,
        ),
        With<PooledBullet>,
    >,
) {
    for (e, mut state, mut vis, mut vel, mut layers) in &mut q {
        if *state != BulletState::PendingReturn {
            continue;
        }

        match pool.recycle(e) {
            Recycle::Free => {
                *state = BulletState::Inactive;
                *vis = Visibility::Hidden;
                vel.0 = Vec2::ZERO;
                *layers = inactive_bullet_layers();
            }
            Recycle::Retire => {
                commands.entity(e).despawn();
            }
        }
    }
}
