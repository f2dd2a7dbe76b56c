//! Enemies plugin: enemy stats, damage intake, the death lifecycle and rewards.
//!
//! ---------------------------
//! HOW THIS IS DESIGNED (ECS)
//! ---------------------------
//! 1) FACTS live in components:
//!    - `EnemyStats` holds health/damage/speed/EXP value.
//!    - `EnemyLifeState` is the lifecycle: Alive -> Dying -> Dead.
//!    - `EnemyBrain` (see `ai`) holds the patrol/pursuit mode.
//!
//! 2) RULES mutate facts in one place each:
//!    - `apply_enemy_damage` is the only writer of health. The hit that crosses
//!      to zero flips the enemy to Dying and emits exactly one `EnemyKilled`.
//!    - `enemy_death_progress` fades Dying enemies and marks `PendingDespawn`.
//!    - `despawn_marked_enemies` does the structural removal in PostUpdate.
//!
//! 3) CONSUMERS react to `EnemyKilled`:
//!    - the player plugin credits EXP to the killer;
//!    - `drops::spawn_drops` rolls one optional pickup.
//!
//! A Dying enemy keeps its components but its collision filters are cleared,
//! so it stops interacting the moment it dies. Physics entities are never
//! despawned inside the fixed step.

pub mod ai;
pub mod drops;

use avian2d::prelude::*;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::combat::Damage;
use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::common::tunables::EnemyTuning;
use crate::plugins::physics::{Grounded, OneWayRider, ground_caster};
use crate::plugins::projectiles::collision::process_player_bullet_collisions;

pub use ai::{AiMode, EnemyBrain};

/// Seconds the death fade lasts.
const DEATH_FADE_SECS: f32 = 0.35;

// -----------------------------------------------------------------------------
// Components
// -----------------------------------------------------------------------------

#[derive(Component)]
pub struct Enemy;

/// Invariant: `current_health <= max_health`. Dead iff `current_health == 0`.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct EnemyStats {
    pub move_speed: f32,
    pub max_health: u32,
    pub current_health: u32,
    pub damage: u32,
    pub exp_value: u32,
}

impl EnemyStats {
    pub fn new(move_speed: f32, max_health: u32, damage: u32, exp_value: u32) -> Self {
        let max_health = max_health.max(1);
        Self { move_speed, max_health, current_health: max_health, damage, exp_value }
    }

    /// Base stats with the round's cumulative multipliers applied.
    /// Health and damage are rounded to whole points.
    pub fn scaled(base: &EnemyTuning, m: &EnemyMultipliers) -> Self {
        Self::new(
            base.move_speed * m.speed,
            (base.max_health as f32 * m.health).round() as u32,
            (base.damage as f32 * m.damage).round() as u32,
            base.exp_value,
        )
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.current_health == 0
    }

    /// Subtract `amount`, saturating at zero. Returns true only for the hit
    /// that takes the enemy from alive to dead.
    pub fn apply_damage(&mut self, amount: u32) -> bool {
        if self.is_dead() {
            return false;
        }
        self.current_health = self.current_health.saturating_sub(amount);
        self.is_dead()
    }
}

/// Cumulative scaling applied to enemies as they spawn. Never retroactive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnemyMultipliers {
    pub speed: f32,
    pub health: f32,
    pub damage: f32,
}

impl Default for EnemyMultipliers {
    fn default() -> Self {
        Self { speed: 1.0, health: 1.0, damage: 1.0 }
    }
}

#[derive(Component, Debug, Clone)]
pub enum EnemyLifeState {
    Alive,
    Dying { timer: Timer },
    Dead,
}

/// Marker: remove in PostUpdate, outside the physics step.
#[derive(Component, Debug, Clone, Copy)]
pub struct PendingDespawn;

/// An enemy died. `killer` is the credited entity, if any.
#[derive(Message, Clone, Copy, Debug)]
pub struct EnemyKilled {
    pub enemy: Entity,
    pub killer: Option<Entity>,
    pub exp_value: u32,
    pub position: Vec2,
}

// -----------------------------------------------------------------------------
// Plugin wiring
// -----------------------------------------------------------------------------

/// Schedules:
/// - FixedUpdate: AI steering.
/// - FixedPostUpdate: damage intake after bullet collisions, then the death fade.
/// - PostUpdate: structural cleanup.
pub fn plugin(app: &mut App) {
    app.add_message::<EnemyKilled>();

    app.add_systems(
        FixedUpdate,
        ai::enemy_ai
            .after(crate::plugins::physics::update_grounded)
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        FixedPostUpdate,
        (
            apply_enemy_damage.after(process_player_bullet_collisions),
            enemy_death_progress.after(apply_enemy_damage),
            drops::spawn_drops.after(apply_enemy_damage),
        )
            .run_if(in_state(GameState::InGame)),
    );

    app.add_systems(
        PostUpdate,
        despawn_marked_enemies.run_if(in_state(GameState::InGame)),
    );
}

// -----------------------------------------------------------------------------
// Spawn
// -----------------------------------------------------------------------------

pub fn enemy_layers() -> CollisionLayers {
    CollisionLayers::new(
        Layer::Enemy,
        [Layer::World, Layer::Platform, Layer::Player, Layer::PlayerBullet, Layer::Hazard],
    )
}

/// Membership stays Enemy, filters are cleared: collides with nothing.
#[inline]
pub fn non_interacting_enemy_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::Enemy, LayerMask::NONE)
}

pub fn spawn_enemy(
    commands: &mut Commands,
    tuning: &EnemyTuning,
    multipliers: &EnemyMultipliers,
    at: Vec2,
    index: usize,
) -> Entity {
    let size = tuning.size;
    commands
        .spawn((
            Name::new(format!("Enemy{index}")),
            Enemy,
            EnemyStats::scaled(tuning, multipliers),
            EnemyLifeState::Alive,
            EnemyBrain::new(at.x, tuning.patrol_half_width),
            Sprite {
                color: Color::srgb(0.9, 0.25, 0.25),
                custom_size: Some(Vec2::splat(size)),
                ..default()
            },
            Transform::from_translation(at.extend(1.0)),
            (
                RigidBody::Dynamic,
                Collider::rectangle(size, size),
                LockedAxes::ROTATION_LOCKED,
                Friction::ZERO,
                GravityScale(1.0),
                LinearVelocity::ZERO,
                enemy_layers(),
                Grounded::default(),
                OneWayRider::default(),
                ground_caster(size, size * 0.5),
            ),
            DespawnOnExit(GameState::InGame),
        ))
        .id()
}

// -----------------------------------------------------------------------------
// Rules: damage and the death lifecycle
// -----------------------------------------------------------------------------

/// Apply incoming damage to enemies. The killing hit transitions Alive -> Dying,
/// stops all interaction, and emits the single `EnemyKilled` for this enemy.
pub fn apply_enemy_damage(
    mut incoming: MessageReader<Damage>,
    mut q: Query<
        (
            &mut EnemyStats,
            &mut EnemyLifeState,
            &mut CollisionLayers,
            &mut LinearVelocity,
            &mut GravityScale,
            &mut Sprite,
            &Transform,
        ),
        (With<Enemy>, Without<PendingDespawn>),
    >,
    mut killed: MessageWriter<EnemyKilled>,
) {
    for hit in incoming.read() {
        let Ok((mut stats, mut life, mut layers, mut vel, mut gravity, mut sprite, tf)) =
            q.get_mut(hit.target)
        else {
            continue;
        };
        if !matches!(*life, EnemyLifeState::Alive) {
            continue;
        }
        if !stats.apply_damage(hit.amount) {
            continue;
        }

        *life = EnemyLifeState::Dying {
            timer: Timer::from_seconds(DEATH_FADE_SECS, TimerMode::Once),
        };
        *layers = non_interacting_enemy_layers();
        // With no filters it would fall through the floor.
        vel.0 = Vec2::ZERO;
        gravity.0 = 0.0;
        sprite.color = Color::srgba(0.8, 0.8, 0.8, 1.0);

        killed.write(EnemyKilled {
            enemy: hit.target,
            killer: hit.source,
            exp_value: stats.exp_value,
            position: tf.translation.truncate(),
        });
        debug!("Enemy {:?} killed (credited to {:?})", hit.target, hit.source);
    }
}

/// Animate Dying enemies and mark them for despawn when the fade completes.
pub fn enemy_death_progress(
    time: Res<Time<Fixed>>,
    mut commands: Commands,
    mut q: Query<
        (Entity, &mut EnemyLifeState, &mut Sprite, &mut Transform),
        (With<Enemy>, Without<PendingDespawn>),
    >,
) {
    for (e, mut life, mut sprite, mut tf) in &mut q {
        let EnemyLifeState::Dying { timer } = &mut *life else {
            continue;
        };

        timer.tick(time.delta());

        let dur = timer.duration().as_secs_f32().max(0.0001);
        let t = (timer.elapsed_secs() / dur).clamp(0.0, 1.0);
        tf.scale = Vec3::splat(1.0 - t);
        let mut c = sprite.color.to_srgba();
        c.alpha = 1.0 - t;
        sprite.color = c.into();

        if timer.is_finished() {
            *life = EnemyLifeState::Dead;
            commands.entity(e).insert(PendingDespawn);
        }
    }
}

fn despawn_marked_enemies(mut commands: Commands, q: Query<Entity, (With<Enemy>, With<PendingDespawn>)>) {
    for e in &q {
        commands.entity(e).despawn();
    }
}
