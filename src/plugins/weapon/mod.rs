//! Weapon plugin: fire-rate gating, magazine and reload.
//!
//! ```text
//! Update:       gather_trigger (mouse/keys -> TriggerInput), update_aim (cursor -> TriggerInput.aim)
//! FixedUpdate:  provision_pool -> fire_weapon -> (projectiles allocator)
//!               complete_reloads (DeferredFired::ReloadComplete)
//! ```
//!
//! The weapon never touches pooled bullets. It decides *whether* a shot happens
//! and writes a `SpawnBulletRequest`; the projectiles plugin owns the entities.
//! A reload is a `Deferred` task, so it stretches across ticks without blocking
//! and pauses with the simulation.

pub mod stats;

use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::common::state::GameState;
use crate::plugins::camera::MainCamera;
use crate::plugins::core::{Deferred, DeferredFired, DeferredTask};
use crate::plugins::player::{Facing, Player};
use crate::plugins::projectiles::messages::SpawnBulletRequest;
use crate::plugins::projectiles::pool::{BulletPool, reconcile_pool};

pub use stats::{POOL_BUFFER, Weapon, WeaponTemplate};

/// Trigger state sampled in `Update`, consumed by the fixed tick.
#[derive(Resource, Default, Debug)]
pub struct TriggerInput {
    pub held: bool,
    /// Latched until a fixed tick consumes it.
    pub reload_requested: bool,
    /// World-space aim direction. `None` fires along the player's facing.
    pub aim: Option<Vec2>,
}

/// Distance from the shooter's center at which bullets appear.
const MUZZLE_OFFSET: f32 = 18.0;

pub fn plugin(app: &mut App) {
    app.init_resource::<TriggerInput>()
        .add_systems(
            Update,
            (gather_trigger, update_aim).run_if(in_state(GameState::InGame)),
        )
        .add_systems(
            FixedUpdate,
            (
                provision_pool.before(reconcile_pool),
                fire_weapon.after(reconcile_pool),
                complete_reloads.after(fire_weapon),
            )
                .run_if(in_state(GameState::InGame)),
        );
}

/// Start a reload on `weapon` if it will accept one, scheduling its completion.
pub fn start_reload(weapon_entity: Entity, weapon: &mut Weapon, deferred: &mut Deferred, now: f64) -> bool {
    if !weapon.begin_reload() {
        return false;
    }
    deferred.schedule(now, weapon.reload_time, DeferredTask::ReloadComplete { weapon: weapon_entity });
    debug!("Reloading ({:.2}s)", weapon.reload_time);
    true
}

fn gather_trigger(
    mouse: Option<Res<ButtonInput<MouseButton>>>,
    keys: Option<Res<ButtonInput<KeyCode>>>,
    mut trigger: ResMut<TriggerInput>,
) {
    // Headless apps have no input resources; tests drive TriggerInput directly.
    let (Some(mouse), Some(keys)) = (mouse, keys) else {
        return;
    };
    trigger.held = mouse.pressed(MouseButton::Left) || keys.pressed(KeyCode::KeyJ);
    if keys.just_pressed(KeyCode::KeyR) {
        trigger.reload_requested = true;
    }
}

fn update_aim(
    windows: Query<&Window>,
    q_camera: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    q_player: Query<&Transform, With<Player>>,
    mut trigger: ResMut<TriggerInput>,
) {
    let (Ok(window), Ok((camera, camera_tf)), Ok(player_tf)) =
        (windows.single(), q_camera.single(), q_player.single())
    else {
        return;
    };

    let aim = window
        .cursor_position()
        .and_then(|cursor| camera.viewport_to_world_2d(camera_tf, cursor).ok())
        .map(|world_cursor| world_cursor - player_tf.translation.truncate())
        .filter(|d| d.length_squared() > 1e-4)
        .map(Vec2::normalize);
    trigger.aim = aim;
}

/// Size the pool for a weapon as soon as it appears.
pub fn provision_pool(q: Query<&Weapon, Added<Weapon>>, mut pool: ResMut<BulletPool>) {
    for weapon in &q {
        pool.set_target(weapon.pool_capacity());
    }
}

pub fn fire_weapon(
    time: Res<Time<Fixed>>,
    pool: Res<BulletPool>,
    mut trigger: ResMut<TriggerInput>,
    mut deferred: ResMut<Deferred>,
    mut q: Query<(Entity, &mut Weapon, &Transform, &Facing), With<Player>>,
    mut requests: MessageWriter<SpawnBulletRequest>,
) {
    let now = time.elapsed_secs_f64();
    let reload_requested = std::mem::take(&mut trigger.reload_requested);

    for (entity, mut weapon, tf, facing) in &mut q {
        if trigger.held && weapon.can_fire(now) && pool.free_count() > 0 {
            let dir = trigger.aim.unwrap_or_else(|| facing.direction());
            weapon.commit_shot(now);
            requests.write(SpawnBulletRequest {
                pos: tf.translation.truncate() + dir * MUZZLE_OFFSET,
                vel: dir * weapon.bullet_speed,
                damage: weapon.bullet_damage,
                lifetime: weapon.bullet_lifetime,
                owner: Some(entity),
            });
        }

        if weapon.needs_auto_reload() || reload_requested {
            start_reload(entity, &mut weapon, &mut deferred, now);
        }
    }
}

/// Refill the magazine and resize the pool once a reload wait is over.
pub fn complete_reloads(
    mut fired: MessageReader<DeferredFired>,
    mut pool: ResMut<BulletPool>,
    mut q: Query<&mut Weapon>,
) {
    for DeferredFired(task) in fired.read() {
        let DeferredTask::ReloadComplete { weapon } = *task else {
            continue;
        };
        // The weapon may have been despawned with its owner.
        let Ok(mut w) = q.get_mut(weapon) else {
            continue;
        };
        w.finish_reload();
        pool.set_target(w.pool_capacity());
        debug!("Reload complete: {} rounds, pool target {}", w.current_ammo, w.pool_capacity());
    }
}

#[cfg(test)]
mod tests;
