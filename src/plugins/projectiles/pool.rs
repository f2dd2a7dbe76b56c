//! Bullet pool bookkeeping and resizing.
//!
//! Bullet entities are spawned once and recycled by value writes. The pool only
//! tracks handles; it is sized by a *target* the weapon sets from its stats.
//!
//! Resizing rules:
//! - growing spawns new inactive entries;
//! - shrinking retires free entries first, and any remaining excess is retired
//!   as in-flight bullets come back. An active bullet is never despawned.

use avian2d::prelude::*;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::layers::Layer;
use crate::common::state::GameState;

use super::components::{Bullet, BulletState, PooledBullet};

#[derive(Resource, Debug, Default)]
pub struct BulletPool {
    free: Vec<Entity>,
    /// Entries that exist (free or in flight).
    entries: usize,
    target: usize,
    /// In-flight entries to despawn instead of freeing when they return.
    retire_pending: usize,
    next_shot: u32,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ResizePlan {
    pub spawn: usize,
    pub retire: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recycle {
    Free,
    Retire,
}

impl BulletPool {
    pub fn set_target(&mut self, target: usize) {
        self.target = target;
    }

    pub fn target(&self) -> usize {
        self.target
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn in_flight(&self) -> usize {
        self.entries - self.free.len()
    }

    pub fn retire_pending(&self) -> usize {
        self.retire_pending
    }

    /// Size the pool will settle at once pending retirements complete.
    pub fn effective_size(&self) -> usize {
        self.entries - self.retire_pending
    }

    pub fn needs_resize(&self) -> bool {
        self.effective_size() != self.target
    }

    /// Bring `effective_size` to `target`. Free entries handed back in
    /// `retire` are already forgotten; the caller despawns them and registers
    /// `spawn` new entries.
    pub fn plan_resize(&mut self) -> ResizePlan {
        let effective = self.effective_size();
        let mut plan = ResizePlan::default();

        if effective < self.target {
            let need = self.target - effective;
            let cancelled = need.min(self.retire_pending);
            self.retire_pending -= cancelled;
            plan.spawn = need - cancelled;
        } else if effective > self.target {
            let excess = effective - self.target;
            let now = excess.min(self.free.len());
            let keep = self.free.len() - now;
            plan.retire = self.free.split_off(keep);
            self.entries -= now;
            self.retire_pending += excess - now;
        }
        plan
    }

    /// Add a freshly spawned inactive entry.
    pub fn register(&mut self, bullet: Entity) {
        self.entries += 1;
        self.free.push(bullet);
    }

    /// Take a free entry for firing, with a new shot id.
    pub fn take(&mut self) -> Option<(Entity, u32)> {
        let bullet = self.free.pop()?;
        self.next_shot = self.next_shot.wrapping_add(1);
        Some((bullet, self.next_shot))
    }

    /// Hand back an entry that finished its flight.
    pub fn recycle(&mut self, bullet: Entity) -> Recycle {
        if self.retire_pending > 0 {
            self.retire_pending -= 1;
            self.entries -= 1;
            Recycle::Retire
        } else {
            self.free.push(bullet);
            Recycle::Free
        }
    }

    /// Forget every entry. Used when a run's entities are torn down.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[inline]
pub fn active_bullet_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::PlayerBullet, [Layer::World, Layer::Enemy])
}

/// "Disabled" without structural changes: empty filters collide with nothing.
#[inline]
pub fn inactive_bullet_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::PlayerBullet, LayerMask::NONE)
}

fn spawn_pooled_bullet(commands: &mut Commands) -> Entity {
    commands
        .spawn((
            Name::new("Bullet(Pooled)"),
            PooledBullet,
            BulletState::Inactive,
            Bullet::default(),
            Sprite {
                color: Color::srgb(1.0, 0.85, 0.3),
                custom_size: Some(Vec2::splat(8.0)),
                ..default()
            },
            Transform::from_xyz(0.0, 0.0, 2.0),
            Visibility::Hidden,
            RigidBody::Dynamic,
            GravityScale(0.0),
            Collider::circle(4.0),
            Sensor,
            inactive_bullet_layers(),
            LinearVelocity(Vec2::ZERO),
            CollisionEventsEnabled,
            DespawnOnExit(GameState::InGame),
        ))
        .id()
}

/// Apply a pending resize: spawn or despawn inactive entries.
pub fn reconcile_pool(mut commands: Commands, mut pool: ResMut<BulletPool>) {
    if !pool.needs_resize() {
        return;
    }
    let plan = pool.plan_resize();
    for bullet in &plan.retire {
        commands.entity(*bullet).despawn();
    }
    for _ in 0..plan.spawn {
        let bullet = spawn_pooled_bullet(&mut commands);
        pool.register(bullet);
    }
    debug!(
        "Bullet pool resized: +{} -{} (target {}, {} retiring in flight)",
        plan.spawn,
        plan.retire.len(),
        pool.target(),
        pool.retire_pending()
    );
}

pub fn reset_pool(mut pool: ResMut<BulletPool>) {
    pool.clear();
}
