//! Rounds plugin: generation, completion detection and escalation.
//!
//! ```text
//! OnEnter(InGame):  start_run (round 1, multipliers 1.0, phase Generating)
//! FixedPreUpdate:   generate_round          [phase == Generating]
//! FixedPostUpdate:  detect_completion       [phase == Active]
//!                   -> RoundCompleted, reward, panels (RoundReward, EnemyEscalation)
//! Update:           apply_enemy_upgrade     (EnemyUpgradeChosen -> next round)
//! ```
//!
//! Phases: `Generating -> Active -> Completing -> AwaitingUpgrade -> Generating`.
//! The completion guard makes `RoundCompleted` fire exactly once per round even
//! though detection runs every fixed tick.

use avian2d::prelude::*;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;
use rand::Rng;

use crate::common::state::GameState;
use crate::common::tunables::Tunables;
use crate::plugins::core::{Deferred, GameRng};
use crate::plugins::enemies::drops::Pickup;
use crate::plugins::enemies::{self, Enemy, EnemyLifeState, EnemyMultipliers, EnemyStats, spawn_enemy};
use crate::plugins::persistence::Progress;
use crate::plugins::player::{Player, PlayerEntity, PlayerStats};
use crate::plugins::upgrades::panels::{self, EnemyUpgradeChosen, PanelKind, PanelQueue};
use crate::plugins::upgrades::EnemyUpgrade;
use crate::plugins::world::{Level, LevelTemplate, spawn_level};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RoundPhase {
    #[default]
    Generating,
    Active,
    Completing,
    AwaitingUpgrade,
}

#[derive(Resource, Debug, Clone)]
pub struct RoundState {
    /// 1-based.
    pub current_round: u32,
    pub highest_round: u32,
    pub phase: RoundPhase,
    /// Applied to enemies spawned from now on; never to living ones.
    pub multipliers: EnemyMultipliers,
    completed: bool,
    active_enemies: Vec<Entity>,
}

impl Default for RoundState {
    fn default() -> Self {
        Self {
            current_round: 1,
            highest_round: 0,
            phase: RoundPhase::Generating,
            multipliers: EnemyMultipliers::default(),
            completed: false,
            active_enemies: Vec::new(),
        }
    }
}

impl RoundState {
    /// Fresh run. Only the best round reached survives.
    pub fn reset_run(&mut self, highest_round: u32) {
        *self = Self { highest_round, ..Self::default() };
    }

    pub fn begin_round(&mut self, enemies: Vec<Entity>) {
        self.active_enemies = enemies;
        self.completed = false;
        self.phase = RoundPhase::Active;
    }

    pub fn active_enemies(&self) -> &[Entity] {
        &self.active_enemies
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Trip the completion guard. Returns false if this round already completed.
    pub fn try_complete(&mut self) -> bool {
        if self.completed {
            return false;
        }
        self.completed = true;
        self.phase = RoundPhase::Completing;
        self.highest_round = self.highest_round.max(self.current_round);
        true
    }

    /// Compound the chosen enemy multiplier and queue generation of the next round.
    pub fn advance(&mut self, upgrade: EnemyUpgrade, step: f32) {
        upgrade.apply(&mut self.multipliers, step);
        self.current_round += 1;
        self.phase = RoundPhase::Generating;
    }
}

/// A round was cleared. Written once per round.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundCompleted {
    pub round: u32,
    pub reward: u32,
}

/// A round is cleared when it had enemies and none of them is still alive.
pub fn round_cleared(active: &[Entity], is_alive: impl Fn(Entity) -> bool) -> bool {
    !active.is_empty() && active.iter().all(|e| !is_alive(*e))
}

fn phase_is(phase: RoundPhase) -> impl Fn(Res<RoundState>) -> bool + Clone {
    move |state: Res<RoundState>| state.phase == phase
}

pub fn plugin(app: &mut App) {
    app.init_resource::<RoundState>()
        .add_message::<RoundCompleted>()
        .add_systems(OnEnter(GameState::InGame), start_run)
        .add_systems(
            FixedPreUpdate,
            generate_round
                .after(crate::plugins::core::deferred::drive_deferred)
                .run_if(in_state(GameState::InGame).and(phase_is(RoundPhase::Generating))),
        )
        .add_systems(
            FixedPostUpdate,
            detect_completion
                .after(enemies::apply_enemy_damage)
                // Level-up panels from the final kill queue ahead of the round reward.
                .after(crate::plugins::player::contacts::reward_kills)
                .run_if(in_state(GameState::InGame).and(phase_is(RoundPhase::Active))),
        )
        .add_systems(
            Update,
            apply_enemy_upgrade
                .after(panels::resolve_choice)
                .run_if(in_state(GameState::InGame)),
        );
}

pub fn start_run(progress: Res<Progress>, mut state: ResMut<RoundState>, mut deferred: ResMut<Deferred>) {
    state.reset_run(progress.0.highest_round);
    deferred.clear();
    info!("Run started (best round so far: {})", state.highest_round);
}

pub fn generate_round(
    mut commands: Commands,
    tunables: Res<Tunables>,
    mut rng: ResMut<GameRng>,
    mut state: ResMut<RoundState>,
    player_entity: Res<PlayerEntity>,
    q_old: Query<Entity, Or<(With<Level>, With<Pickup>)>>,
    mut q_player: Query<(&mut Transform, &mut LinearVelocity, Option<&mut Position>), With<Player>>,
) {
    for e in &q_old {
        commands.entity(e).despawn();
    }

    let builtin;
    let templates: &[LevelTemplate] = if tunables.levels.is_empty() {
        builtin = LevelTemplate::builtin();
        &builtin
    } else {
        &tunables.levels
    };
    let Some(template) = templates.get(rng.gen_range(0..templates.len().max(1))) else {
        warn!("No level templates available; round {} cannot start", state.current_round);
        return;
    };

    spawn_level(&mut commands, template);

    let wanted = tunables.rounds.enemies_per_round;
    let enemies: Vec<Entity> = template
        .enemy_spawns()
        .take(wanted)
        .enumerate()
        .map(|(i, at)| spawn_enemy(&mut commands, &tunables.enemy, &state.multipliers, at, i))
        .collect();
    if enemies.len() < wanted {
        warn!(
            "Level '{}' has {} enemy spawn markers; spawning {} of {} enemies",
            template.name,
            enemies.len(),
            enemies.len(),
            wanted
        );
    }

    let spawn_at = template.player_spawn();
    if let Some(player) = player_entity.0
        && let Ok((mut tf, mut vel, position)) = q_player.get_mut(player)
    {
        tf.translation.x = spawn_at.x;
        tf.translation.y = spawn_at.y;
        vel.0 = Vec2::ZERO;
        if let Some(mut position) = position {
            position.0 = spawn_at;
        }
    }

    info!(
        "Round {} on '{}': {} enemies (x{:.2} speed, x{:.2} health, x{:.2} damage)",
        state.current_round,
        template.name,
        enemies.len(),
        state.multipliers.speed,
        state.multipliers.health,
        state.multipliers.damage
    );
    state.begin_round(enemies);
}

pub fn detect_completion(
    tunables: Res<Tunables>,
    player_entity: Res<PlayerEntity>,
    mut state: ResMut<RoundState>,
    mut panels: ResMut<PanelQueue>,
    q_enemies: Query<(&EnemyStats, &EnemyLifeState), With<Enemy>>,
    mut q_player: Query<&mut PlayerStats, With<Player>>,
    mut completed: MessageWriter<RoundCompleted>,
) {
    let cleared = round_cleared(state.active_enemies(), |e| {
        q_enemies
            .get(e)
            .is_ok_and(|(stats, life)| matches!(life, EnemyLifeState::Alive) && !stats.is_dead())
    });
    if !cleared || !state.try_complete() {
        return;
    }

    let mut reward = 0;
    if let Some(player) = player_entity.0
        && let Ok(mut stats) = q_player.get_mut(player)
    {
        reward = stats.add_money(tunables.rounds.completion_reward);
    }

    info!(
        "Round {} cleared: +{} money (best round {})",
        state.current_round, reward, state.highest_round
    );
    completed.write(RoundCompleted { round: state.current_round, reward });

    panels.push(PanelKind::RoundReward);
    panels.push(PanelKind::EnemyEscalation);
    state.phase = RoundPhase::AwaitingUpgrade;
}

pub fn apply_enemy_upgrade(
    tunables: Res<Tunables>,
    mut chosen: MessageReader<EnemyUpgradeChosen>,
    mut state: ResMut<RoundState>,
) {
    for c in chosen.read() {
        if state.phase != RoundPhase::AwaitingUpgrade {
            continue;
        }
        state.advance(c.upgrade, tunables.rounds.enemy_upgrade_step);
        info!("{} escalated; round {} next", c.upgrade.label(), state.current_round);
    }
}
