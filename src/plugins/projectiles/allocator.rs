//! Spawn consumer: activate bullets from the pool.
//!
//! The weapon only requests a shot when the pool has a free entry, so an empty
//! pool here is a capacity decision (the request is dropped), not an error.

use avian2d::prelude::*;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;

use crate::plugins::core::{Deferred, DeferredFired, DeferredTask};

use super::components::{Bullet, BulletState, PooledBullet};
use super::messages::SpawnBulletRequest;
use super::pool::{BulletPool, active_bullet_layers};

pub fn allocate_bullets_from_pool(
    time: Res<Time<Fixed>>,
    mut pool: ResMut<BulletPool>,
    mut deferred: ResMut<Deferred>,
    mut reader: MessageReader<SpawnBulletRequest>,
    mut q: Query<
        (
            &mut BulletState,
            &mut Bullet,
            &mut Transform,
            &mut LinearVelocity,
            &mut Visibility,
            &mut CollisionLayers,
        ),
        With<PooledBullet>,
    >,
) {
    let now = time.elapsed_secs_f64();
    for req in reader.read() {
        let Some((e, shot)) = pool.take() else {
            continue;
        };
        let Ok((mut state, mut bullet, mut tf, mut vel, mut vis, mut layers)) = q.get_mut(e) else {
            warn!("Bullet pool handed out {e:?}, which is not a pooled bullet");
            continue;
        };

        *state = BulletState::Active;
        bullet.reset_for_fire(req.damage, req.owner, shot);
        tf.translation = req.pos.extend(2.0);
        vel.0 = req.vel;
        *vis = Visibility::Visible;
        *layers = active_bullet_layers();

        deferred.schedule(now, req.lifetime, DeferredTask::BulletExpired { bullet: e, shot });
    }
}

/// Lifetime over: return the bullet unless it was already recycled and re-fired.
pub fn expire_bullets(
    mut fired: MessageReader<DeferredFired>,
    mut q: Query<(&Bullet, &mut BulletState), With<PooledBullet>>,
) {
    for DeferredFired(task) in fired.read() {
        let DeferredTask::BulletExpired { bullet, shot } = *task else {
            continue;
        };
        let Ok((b, mut state)) = q.get_mut(bullet) else {
            continue;
        };
        if b.shot == shot && *state == BulletState::Active {
            *state = BulletState::PendingReturn;
        }
    }
}
