//! Player plugin.
//!
//! Pipeline:
//! - Update: sample input, write the `PlayerInput` resource
//! - FixedUpdate: movement, jumping, drop-through, passive healing
//! - FixedPostUpdate: contacts (enemies, pickups), incoming damage, kill rewards
//!
//! The player entity is created once per run and stored in `PlayerEntity`, so
//! other plugins address it directly instead of scanning for it.

pub mod contacts;
pub mod progression;

use avian2d::collision::narrow_phase::CollisionEventSystems;
use avian2d::prelude::*;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;

use crate::common::{layers::Layer, state::GameState, tunables::Tunables};
use crate::plugins::core::Deferred;
use crate::plugins::persistence::Progress;
use crate::plugins::physics::{self, Grounded, OneWayRider, ground_caster, start_drop_through};
use crate::plugins::weapon::Weapon;

pub use progression::PlayerStats;

#[derive(Component)]
pub struct Player;

/// Handle of the current run's player entity.
#[derive(Resource, Default, Debug, Clone, Copy)]
pub struct PlayerEntity(pub Option<Entity>);

#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

impl Facing {
    pub fn direction(self) -> Vec2 {
        match self {
            Facing::Left => Vec2::NEG_X,
            Facing::Right => Vec2::X,
        }
    }
}

/// Health reached zero. Written once per run.
#[derive(Message, Clone, Copy, Debug)]
pub struct PlayerDied {
    pub player: Entity,
}

#[derive(Resource, Default, Debug)]
pub struct PlayerInput {
    pub move_axis: f32,
    /// Latched until the fixed tick consumes it.
    pub jump: bool,
    pub drop_through: bool,
}

pub fn plugin(app: &mut App) {
    app.init_resource::<PlayerInput>()
        .init_resource::<PlayerEntity>()
        .add_message::<PlayerDied>()
        .add_systems(OnEnter(GameState::InGame), spawn)
        .add_systems(Update, gather_input.run_if(in_state(GameState::InGame)))
        .add_systems(Update, restart_on_key.run_if(in_state(GameState::GameOver)))
        .add_systems(
            FixedUpdate,
            (apply_movement.after(physics::update_grounded), passive_healing)
                .run_if(in_state(GameState::InGame)),
        )
        .add_systems(
            FixedPostUpdate,
            (
                contacts::player_contacts.after(CollisionEventSystems),
                contacts::apply_player_damage.after(contacts::player_contacts),
                contacts::reward_kills.after(crate::plugins::enemies::apply_enemy_damage),
                enter_game_over.after(contacts::apply_player_damage),
            )
                .run_if(in_state(GameState::InGame)),
        );
}

pub fn player_layers() -> CollisionLayers {
    CollisionLayers::new(
        Layer::Player,
        [Layer::World, Layer::Platform, Layer::Enemy, Layer::Pickup, Layer::Hazard],
    )
}

fn spawn(
    mut commands: Commands,
    tunables: Res<Tunables>,
    progress: Res<Progress>,
    mut player_entity: ResMut<PlayerEntity>,
) {
    let t = &tunables.player;
    let e = commands
        .spawn((
            Name::new("Player"),
            Player,
            PlayerStats::from_tuning(t, progress.0.money),
            Weapon::from_template(&tunables.weapon),
            Facing::default(),
            Sprite {
                color: Color::srgb(0.2, 0.75, 0.9),
                custom_size: Some(Vec2::splat(t.radius * 2.0)),
                ..default()
            },
            Transform::from_xyz(0.0, 0.0, 1.0),
            (
                RigidBody::Dynamic,
                Collider::circle(t.radius),
                LockedAxes::ROTATION_LOCKED,
                Friction::ZERO,
                player_layers(),
                LinearVelocity::ZERO,
                CollisionEventsEnabled,
                Grounded::default(),
                OneWayRider::default(),
                ground_caster(t.radius * 2.0, t.radius),
            ),
            DespawnOnExit(GameState::InGame),
        ))
        .id();

    player_entity.0 = Some(e);
    info!("Player spawned with {} money", progress.0.money);
}

fn gather_input(keys: Option<Res<ButtonInput<KeyCode>>>, mut input: ResMut<PlayerInput>) {
    let Some(keys) = keys else {
        return;
    };

    let mut axis = 0.0;
    if keys.pressed(KeyCode::KeyA) || keys.pressed(KeyCode::ArrowLeft) {
        axis -= 1.0;
    }
    if keys.pressed(KeyCode::KeyD) || keys.pressed(KeyCode::ArrowRight) {
        axis += 1.0;
    }
    input.move_axis = axis;

    if keys.just_pressed(KeyCode::Space) || keys.just_pressed(KeyCode::KeyW) {
        input.jump = true;
    }
    if keys.just_pressed(KeyCode::KeyS) || keys.just_pressed(KeyCode::ArrowDown) {
        input.drop_through = true;
    }
}

fn apply_movement(
    time: Res<Time<Fixed>>,
    tunables: Res<Tunables>,
    mut input: ResMut<PlayerInput>,
    mut deferred: ResMut<Deferred>,
    mut q_player: Query<
        (Entity, &PlayerStats, &Grounded, &mut LinearVelocity, &mut Facing, &mut OneWayRider),
        With<Player>,
    >,
) {
    let jump = std::mem::take(&mut input.jump);
    let drop_through = std::mem::take(&mut input.drop_through);

    let Ok((e, stats, grounded, mut vel, mut facing, mut rider)) = q_player.single_mut() else {
        return;
    };

    vel.x = input.move_axis * stats.move_speed;
    if input.move_axis < 0.0 {
        *facing = Facing::Left;
    } else if input.move_axis > 0.0 {
        *facing = Facing::Right;
    }

    if !grounded.0 {
        return;
    }
    if drop_through {
        start_drop_through(
            e,
            &mut rider,
            &mut deferred,
            time.elapsed_secs_f64(),
            tunables.player.drop_through_time,
        );
    } else if jump {
        vel.y = stats.jump_force;
    }
}

fn passive_healing(time: Res<Time<Fixed>>, mut q: Query<&mut PlayerStats, With<Player>>) {
    let dt = time.delta_secs();
    for mut stats in &mut q {
        let healed = stats.advance_healing(dt);
        if healed > 0.0 {
            debug!("Player healed {healed:.2} ({:.1}/{:.1})", stats.current_health, stats.max_health);
        }
    }
}

fn enter_game_over(mut died: MessageReader<PlayerDied>, mut next: ResMut<NextState<GameState>>) {
    if died.read().next().is_some() {
        info!("Player died; run over");
        next.set(GameState::GameOver);
    }
}

fn restart_on_key(keys: Option<Res<ButtonInput<KeyCode>>>, mut next: ResMut<NextState<GameState>>) {
    if keys.is_some_and(|k| k.just_pressed(KeyCode::KeyR)) {
        next.set(GameState::InGame);
    }
}
