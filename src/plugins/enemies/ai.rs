//! Enemy AI: a two-mode state machine (Patrol / Pursuit) with hysteresis.
//!
//! The decision logic is pure (`EnemyBrain::update_mode`, `EnemyBrain::steer`);
//! `enemy_ai` only gathers positions and writes velocities.

use avian2d::prelude::*;
use bevy::prelude::*;

use crate::common::tunables::{EnemyTuning, Tunables};
use crate::plugins::physics::Grounded;
use crate::plugins::player::{Player, PlayerEntity};

use super::{Enemy, EnemyLifeState, EnemyStats};

/// Non-negative duration in seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Seconds(f32);

impl Seconds {
    #[inline]
    pub fn new(v: f32) -> Self {
        Self(v.max(0.0))
    }
    #[inline]
    pub fn get(self) -> f32 {
        self.0
    }
    #[inline]
    pub fn tick_down(&mut self, dt: f32) {
        self.0 = (self.0 - dt).max(0.0);
    }
    #[inline]
    pub fn is_positive(self) -> bool {
        self.0 > 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AiMode {
    #[default]
    Patrol,
    Pursuit,
}

/// What the brain wants the body to do this step.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Steering {
    pub vx: f32,
    pub jump: bool,
}

/// Horizontal distance under which pursuit stops pushing toward the player.
const ARRIVE_EPSILON: f32 = 2.0;

#[derive(Component, Debug, Clone)]
pub struct EnemyBrain {
    pub mode: AiMode,
    /// Time the player has continuously been out of range during pursuit.
    out_of_range: f32,
    jump_cooldown: Seconds,
    patrol_left: f32,
    patrol_right: f32,
    /// +1 toward `patrol_right`, -1 toward `patrol_left`.
    patrol_dir: f32,
}

impl EnemyBrain {
    pub fn new(spawn_x: f32, half_width: f32) -> Self {
        let half = half_width.abs();
        Self {
            mode: AiMode::Patrol,
            out_of_range: 0.0,
            jump_cooldown: Seconds::default(),
            patrol_left: spawn_x - half,
            patrol_right: spawn_x + half,
            patrol_dir: 1.0,
        }
    }

    pub fn jump_cooldown(&self) -> Seconds {
        self.jump_cooldown
    }

    /// Advance the mode machine. Returns the new mode on a transition.
    ///
    /// Patrol -> Pursuit as soon as the player is within `detection_range`.
    /// Pursuit -> Patrol only after `lose_interest_after` seconds out of range.
    pub fn update_mode(
        &mut self,
        distance: Option<f32>,
        detection_range: f32,
        lose_interest_after: f32,
        dt: f32,
    ) -> Option<AiMode> {
        let in_range = distance.is_some_and(|d| d <= detection_range);
        match self.mode {
            AiMode::Patrol if in_range => {
                self.mode = AiMode::Pursuit;
                self.out_of_range = 0.0;
                Some(AiMode::Pursuit)
            }
            AiMode::Patrol => None,
            AiMode::Pursuit if in_range => {
                self.out_of_range = 0.0;
                None
            }
            AiMode::Pursuit => {
                self.out_of_range += dt;
                if self.out_of_range >= lose_interest_after {
                    self.mode = AiMode::Patrol;
                    self.out_of_range = 0.0;
                    Some(AiMode::Patrol)
                } else {
                    None
                }
            }
        }
    }

    /// Decide horizontal velocity and whether to jump.
    pub fn steer(
        &mut self,
        pos: Vec2,
        player: Option<Vec2>,
        speed: f32,
        grounded: bool,
        tuning: &EnemyTuning,
        dt: f32,
    ) -> Steering {
        self.jump_cooldown.tick_down(dt);

        match (self.mode, player) {
            (AiMode::Pursuit, Some(target)) => {
                let delta = target - pos;
                let vx = if delta.x.abs() < ARRIVE_EPSILON { 0.0 } else { delta.x.signum() * speed };
                let jump = grounded
                    && !self.jump_cooldown.is_positive()
                    && delta.y >= tuning.jump_height_threshold
                    && delta.x.abs() <= tuning.jump_horizontal_range;
                if jump {
                    self.jump_cooldown = Seconds::new(tuning.jump_cooldown);
                }
                Steering { vx, jump }
            }
            _ => {
                if pos.x >= self.patrol_right {
                    self.patrol_dir = -1.0;
                } else if pos.x <= self.patrol_left {
                    self.patrol_dir = 1.0;
                }
                Steering { vx: self.patrol_dir * speed, jump: false }
            }
        }
    }
}

pub fn enemy_ai(
    time: Res<Time<Fixed>>,
    tunables: Res<Tunables>,
    player_entity: Res<PlayerEntity>,
    q_player: Query<&Transform, With<Player>>,
    mut q: Query<
        (
            Entity,
            &Transform,
            &EnemyStats,
            &EnemyLifeState,
            &Grounded,
            &mut EnemyBrain,
            &mut LinearVelocity,
        ),
        (With<Enemy>, Without<Player>),
    >,
) {
    let dt = time.delta_secs();
    let tuning = &tunables.enemy;
    let player = player_entity
        .0
        .and_then(|e| q_player.get(e).ok())
        .map(|tf| tf.translation.truncate());

    for (e, tf, stats, life, grounded, mut brain, mut vel) in &mut q {
        if !matches!(life, EnemyLifeState::Alive) {
            continue;
        }
        let pos = tf.translation.truncate();
        let distance = player.map(|p| p.distance(pos));

        if let Some(mode) = brain.update_mode(distance, tuning.detection_range, tuning.lose_interest_after, dt) {
            debug!("Enemy {e:?} -> {mode:?}");
        }

        let steering = brain.steer(pos, player, stats.move_speed, grounded.0, tuning, dt);
        vel.x = steering.vx;
        if steering.jump {
            vel.y = tuning.jump_force;
        }
    }
}
