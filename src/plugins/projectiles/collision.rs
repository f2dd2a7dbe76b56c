use avian2d::prelude::*;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::platform::collections::HashSet;
use bevy::prelude::*;

use crate::common::combat::Damage;
use crate::common::layers::Layer;

use super::components::{Bullet, BulletState, PooledBullet};

#[derive(Clone, Copy, Debug)]
struct CollisionTarget {
    collider: Entity,
    body: Option<Entity>,
}

impl CollisionTarget {
    #[inline]
    fn gameplay_owner(self) -> Entity {
        self.body.unwrap_or(self.collider)
    }
}

#[inline]
fn targets(ev: &CollisionStart) -> (CollisionTarget, CollisionTarget) {
    (
        CollisionTarget { collider: ev.collider1, body: ev.body1 },
        CollisionTarget { collider: ev.collider2, body: ev.body2 },
    )
}

#[inline]
pub(crate) fn is_in_layer(layers: &CollisionLayers, layer: Layer) -> bool {
    layers.memberships.has_all(layer)
}

/// Resolve bullet contacts: level geometry absorbs the bullet, an enemy takes
/// its damage. One outcome per bullet per tick; the owner is never hit.
pub fn process_player_bullet_collisions(
    mut started: MessageReader<CollisionStart>,
    q_is_bullet: Query<(), With<PooledBullet>>,
    mut q_bullets: Query<(&Bullet, &mut BulletState), With<PooledBullet>>,
    q_layers: Query<&CollisionLayers>,
    mut damage: MessageWriter<Damage>,
    mut seen: Local<HashSet<Entity>>,
) {
    seen.clear();

    for ev in started.read() {
        let (t1, t2) = targets(ev);

        let b1 = q_is_bullet.contains(t1.collider);
        let b2 = q_is_bullet.contains(t2.collider);
        if !(b1 ^ b2) {
            continue;
        }
        let (bullet_side, other_side) = if b1 { (t1, t2) } else { (t2, t1) };

        let Ok(other_layers) = q_layers.get(other_side.collider) else {
            continue;
        };
        let Ok((bullet, mut state)) = q_bullets.get_mut(bullet_side.collider) else {
            continue;
        };
        if *state != BulletState::Active {
            continue;
        }

        let target = other_side.gameplay_owner();
        if bullet.owner == Some(target) {
            continue;
        }

        if is_in_layer(other_layers, Layer::World) {
            if seen.insert(bullet_side.collider) {
                *state = BulletState::PendingReturn;
            }
            continue;
        }

        if is_in_layer(other_layers, Layer::Enemy) {
            if seen.insert(bullet_side.collider) {
                damage.write(Damage { target, amount: bullet.damage, source: bullet.owner });
                *state = BulletState::PendingReturn;
            }
            continue;
        }
    }
}
