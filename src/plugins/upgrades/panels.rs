//! Upgrade panels: the queue of pending selections and its resolution.
//!
//! ```text
//! producers (level-up, round completion) -> PanelQueue
//! Update: UpgradeChoice (from the UI layer) -> resolve_choice -> apply / EnemyUpgradeChosen
//!         present_next_panel -> PanelRequest (to the UI layer)
//!         sync_play_state: Selecting while anything is queued
//!         hold_clock_for_panels: virtual time stopped while anything is queued
//! FixedPostUpdate: hold_clock_for_panels again, right after kills and round
//!         completion queue panels, so no further tick runs before the pause
//! ```
//!
//! Only the front panel is ever presented. It stays open until a valid choice
//! arrives; out-of-range indices are ignored. A panel whose draw comes back
//! empty is dropped, since nothing could ever resolve it.

use std::collections::VecDeque;

use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::prelude::*;

use crate::common::state::{GameState, PlayState};
use crate::common::tunables::Tunables;
use crate::plugins::core::GameRng;
use crate::plugins::player::{Player, PlayerStats, contacts};
use crate::plugins::projectiles::pool::BulletPool;
use crate::plugins::rounds::{self, RoundState};
use crate::plugins::weapon::Weapon;

use super::{EnemyUpgrade, LEVEL_UP_CATALOG, ROUND_CATALOG, UpgradeKind, apply, describe, draw_options};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PanelKind {
    /// One per level gained.
    PlayerLevelUp,
    /// Stage 1 of a cleared round: a player upgrade.
    RoundReward,
    /// Stage 2 of a cleared round: an enemy upgrade, which also starts the next round.
    EnemyEscalation,
}

impl PanelKind {
    pub fn request_name(self) -> &'static str {
        match self {
            PanelKind::PlayerLevelUp => "PlayerLevelUp",
            PanelKind::RoundReward | PanelKind::EnemyEscalation => "RoundFinished",
        }
    }

    pub fn stage(self) -> u8 {
        match self {
            PanelKind::PlayerLevelUp | PanelKind::RoundReward => 1,
            PanelKind::EnemyEscalation => 2,
        }
    }
}

/// Pending panels, presented front first.
#[derive(Resource, Default, Debug)]
pub struct PanelQueue(VecDeque<PanelKind>);

impl PanelQueue {
    pub fn push(&mut self, kind: PanelKind) {
        self.0.push_back(kind);
    }

    pub fn pop(&mut self) -> Option<PanelKind> {
        self.0.pop_front()
    }

    pub fn front(&self) -> Option<PanelKind> {
        self.0.front().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum PanelOptions {
    Player(Vec<UpgradeKind>),
    Enemy(Vec<EnemyUpgrade>),
}

impl PanelOptions {
    pub fn len(&self) -> usize {
        match self {
            PanelOptions::Player(v) => v.len(),
            PanelOptions::Enemy(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Presented {
    pub kind: PanelKind,
    pub options: PanelOptions,
}

/// The panel currently shown, if any. Always the front of `PanelQueue`.
#[derive(Resource, Default, Debug)]
pub struct ActivePanel(pub Option<Presented>);

/// Outgoing: show a panel with these option labels.
#[derive(Message, Clone, Debug, PartialEq)]
pub struct PanelRequest {
    pub name: &'static str,
    pub stage: u8,
    pub options: Vec<String>,
}

/// Incoming: the option picked on the active panel.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct UpgradeChoice {
    pub index: usize,
}

/// The enemy stage of a round reward was resolved.
#[derive(Message, Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnemyUpgradeChosen {
    pub upgrade: EnemyUpgrade,
}

pub fn plugin(app: &mut App) {
    app.init_resource::<PanelQueue>()
        .init_resource::<ActivePanel>()
        .add_message::<PanelRequest>()
        .add_message::<UpgradeChoice>()
        .add_message::<EnemyUpgradeChosen>()
        .add_systems(OnEnter(GameState::InGame), reset_panels)
        .add_systems(OnEnter(GameState::GameOver), reset_panels)
        .add_systems(
            Update,
            (choice_keys, resolve_choice, present_next_panel, sync_play_state, hold_clock_for_panels)
                .chain()
                .run_if(in_state(GameState::InGame)),
        )
        .add_systems(
            FixedPostUpdate,
            hold_clock_for_panels
                .after(contacts::reward_kills)
                .after(rounds::detect_completion)
                .run_if(in_state(GameState::InGame)),
        );
}

/// Draw the options for a panel of `kind`.
pub fn draw_panel(kind: PanelKind, tunables: &Tunables, rng: &mut GameRng) -> PanelOptions {
    let rounds = &tunables.rounds;
    match kind {
        PanelKind::PlayerLevelUp => PanelOptions::Player(draw_options(
            &super::weighted(&LEVEL_UP_CATALOG, &tunables.upgrades),
            rounds.player_choices.max(1),
            &mut rng.0,
        )),
        PanelKind::RoundReward => PanelOptions::Player(draw_options(
            &super::weighted(&ROUND_CATALOG, &tunables.upgrades),
            rounds.player_choices.max(1),
            &mut rng.0,
        )),
        PanelKind::EnemyEscalation => PanelOptions::Enemy(draw_options(
            &super::enemy_catalog(),
            rounds.enemy_choices.max(1),
            &mut rng.0,
        )),
    }
}

fn reset_panels(
    mut queue: ResMut<PanelQueue>,
    mut active: ResMut<ActivePanel>,
    mut next: ResMut<NextState<PlayState>>,
    mut virtual_time: ResMut<Time<Virtual>>,
) {
    queue.clear();
    active.0 = None;
    next.set(PlayState::Running);
    virtual_time.set_relative_speed(1.0);
}

fn choice_keys(keys: Option<Res<ButtonInput<KeyCode>>>, mut choices: MessageWriter<UpgradeChoice>) {
    let Some(keys) = keys else {
        return;
    };
    for (index, key) in [KeyCode::Digit1, KeyCode::Digit2, KeyCode::Digit3].into_iter().enumerate() {
        if keys.just_pressed(key) {
            choices.write(UpgradeChoice { index });
        }
    }
}

pub fn present_next_panel(
    tunables: Res<Tunables>,
    mut queue: ResMut<PanelQueue>,
    round: Res<RoundState>,
    mut rng: ResMut<GameRng>,
    mut active: ResMut<ActivePanel>,
    q_player: Query<(&PlayerStats, &Weapon), With<Player>>,
    mut requests: MessageWriter<PanelRequest>,
) {
    if active.0.is_some() {
        return;
    }
    let Some(kind) = queue.front() else {
        return;
    };

    let options = draw_panel(kind, &tunables, &mut rng);
    if options.is_empty() {
        warn!("{} panel drew no options (check [upgrades.weights]); skipped", kind.request_name());
        queue.pop();
        return;
    }
    let step = tunables.rounds.enemy_upgrade_step;
    let labels: Vec<String> = match &options {
        PanelOptions::Player(kinds) => match q_player.single() {
            Ok((stats, weapon)) => kinds
                .iter()
                .map(|k| describe(*k, stats, weapon, &tunables.player))
                .collect(),
            Err(_) => kinds.iter().map(|k| k.label().to_string()).collect(),
        },
        PanelOptions::Enemy(upgrades) => {
            upgrades.iter().map(|u| u.describe(&round.multipliers, step)).collect()
        }
    };

    info!("{} (stage {}): {}", kind.request_name(), kind.stage(), labels.join(" | "));
    requests.write(PanelRequest { name: kind.request_name(), stage: kind.stage(), options: labels });
    active.0 = Some(Presented { kind, options });
}

pub fn resolve_choice(
    tunables: Res<Tunables>,
    mut choices: MessageReader<UpgradeChoice>,
    mut queue: ResMut<PanelQueue>,
    mut active: ResMut<ActivePanel>,
    mut pool: ResMut<BulletPool>,
    mut q_player: Query<(&mut PlayerStats, &mut Weapon), With<Player>>,
    mut enemy_chosen: MessageWriter<EnemyUpgradeChosen>,
) {
    for choice in choices.read() {
        let Some(presented) = active.0.as_ref() else {
            continue;
        };
        if choice.index >= presented.options.len() {
            warn!(
                "Upgrade choice {} out of range ({} options); ignored",
                choice.index,
                presented.options.len()
            );
            continue;
        }

        match &presented.options {
            PanelOptions::Player(kinds) => {
                let kind = kinds[choice.index];
                if let Ok((mut stats, mut weapon)) = q_player.single_mut() {
                    apply(kind, &mut stats, &mut weapon, &mut pool, &tunables.player);
                    info!("Upgrade applied: {}", kind.label());
                }
            }
            PanelOptions::Enemy(upgrades) => {
                let upgrade = upgrades[choice.index];
                enemy_chosen.write(EnemyUpgradeChosen { upgrade });
            }
        }

        queue.pop();
        active.0 = None;
    }
}

pub fn sync_play_state(
    queue: Res<PanelQueue>,
    state: Res<State<PlayState>>,
    mut next: ResMut<NextState<PlayState>>,
) {
    match (state.get(), queue.is_empty()) {
        (PlayState::Running, false) => next.set(PlayState::Selecting),
        (PlayState::Selecting, true) => next.set(PlayState::Running),
        _ => {}
    }
}

/// Stop virtual time while any panel is pending. `Update` keeps running for
/// menu input; the fixed schedules see no time pass.
pub fn hold_clock_for_panels(queue: Res<PanelQueue>, mut virtual_time: ResMut<Time<Virtual>>) {
    let speed = if queue.is_empty() { 1.0 } else { 0.0 };
    if virtual_time.relative_speed() != speed {
        virtual_time.set_relative_speed(speed);
        debug!("Simulation speed set to {speed} ({} panels pending)", queue.len());
    }
}
