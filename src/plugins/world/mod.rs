//! World plugin: level templates, level geometry and spike hazards.
//!
//! A level is one `Level` root entity with every platform and spike as a child,
//! so regenerating a round is a single recursive despawn. Enemy and player
//! placement is not done here; the round manager reads the template's markers.

use std::collections::HashMap;

use avian2d::prelude::*;
use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;
use serde::Deserialize;

use crate::common::combat::Damage;
use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::common::tunables::Tunables;

#[derive(Debug, Clone, Deserialize)]
pub struct LevelTemplate {
    pub name: String,
    #[serde(default)]
    pub platforms: Vec<PlatformDef>,
    #[serde(default)]
    pub spikes: Vec<SpikeDef>,
    #[serde(default)]
    pub markers: Vec<Marker>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PlatformDef {
    pub center: [f32; 2],
    pub size: [f32; 2],
    /// Can be jumped through from below and dropped through from above.
    #[serde(default)]
    pub one_way: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SpikeDef {
    pub center: [f32; 2],
    pub size: [f32; 2],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    EnemySpawn,
    PlayerSpawn,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Marker {
    pub kind: MarkerKind,
    pub at: [f32; 2],
}

impl LevelTemplate {
    pub fn enemy_spawns(&self) -> impl Iterator<Item = Vec2> + '_ {
        self.markers
            .iter()
            .filter(|m| m.kind == MarkerKind::EnemySpawn)
            .map(|m| Vec2::from(m.at))
    }

    /// First player-spawn marker. Levels without one spawn the player at the origin.
    pub fn player_spawn(&self) -> Vec2 {
        self.markers
            .iter()
            .find(|m| m.kind == MarkerKind::PlayerSpawn)
            .map(|m| Vec2::from(m.at))
            .unwrap_or(Vec2::ZERO)
    }

    /// Levels compiled into the binary, used when the tunables list none.
    pub fn builtin() -> Vec<LevelTemplate> {
        vec![
            LevelTemplate {
                name: "Ledges".into(),
                platforms: with_arena(&[
                    solid(-400.0, -140.0, 240.0, 24.0),
                    solid(400.0, -140.0, 240.0, 24.0),
                    one_way(0.0, -40.0, 320.0, 12.0),
                    one_way(-480.0, 80.0, 200.0, 12.0),
                    one_way(480.0, 80.0, 200.0, 12.0),
                ]),
                spikes: vec![SpikeDef { center: [0.0, -288.0], size: [96.0, 16.0] }],
                markers: vec![
                    player(-200.0, -250.0),
                    enemy(-400.0, -110.0),
                    enemy(400.0, -110.0),
                    enemy(0.0, -10.0),
                    enemy(-480.0, 110.0),
                    enemy(480.0, 110.0),
                    enemy(-650.0, -250.0),
                ],
            },
            LevelTemplate {
                name: "Tower".into(),
                platforms: with_arena(&[
                    solid(0.0, -180.0, 160.0, 24.0),
                    one_way(-260.0, -100.0, 220.0, 12.0),
                    one_way(260.0, -100.0, 220.0, 12.0),
                    one_way(0.0, -10.0, 220.0, 12.0),
                    one_way(-260.0, 80.0, 220.0, 12.0),
                    one_way(260.0, 80.0, 220.0, 12.0),
                ]),
                spikes: vec![
                    SpikeDef { center: [-560.0, -288.0], size: [80.0, 16.0] },
                    SpikeDef { center: [560.0, -288.0], size: [80.0, 16.0] },
                ],
                markers: vec![
                    player(-300.0, -250.0),
                    enemy(260.0, -70.0),
                    enemy(-260.0, -70.0),
                    enemy(0.0, 20.0),
                    enemy(260.0, 110.0),
                    enemy(300.0, -250.0),
                ],
            },
            LevelTemplate {
                name: "Pit".into(),
                platforms: with_arena(&[
                    solid(-500.0, -200.0, 300.0, 24.0),
                    solid(500.0, -200.0, 300.0, 24.0),
                    one_way(-180.0, -120.0, 160.0, 12.0),
                    one_way(180.0, -120.0, 160.0, 12.0),
                    one_way(0.0, 0.0, 260.0, 12.0),
                ]),
                spikes: vec![SpikeDef { center: [0.0, -288.0], size: [240.0, 16.0] }],
                markers: vec![
                    player(-500.0, -170.0),
                    enemy(500.0, -170.0),
                    enemy(180.0, -90.0),
                    enemy(-180.0, -90.0),
                    enemy(0.0, 30.0),
                    enemy(620.0, -170.0),
                ],
            },
        ]
    }
}

const ARENA_HALF_WIDTH: f32 = 800.0;
const ARENA_FLOOR: f32 = -300.0;
const ARENA_HEIGHT: f32 = 900.0;
const WALL_THICKNESS: f32 = 30.0;

fn solid(x: f32, y: f32, w: f32, h: f32) -> PlatformDef {
    PlatformDef { center: [x, y], size: [w, h], one_way: false }
}

fn one_way(x: f32, y: f32, w: f32, h: f32) -> PlatformDef {
    PlatformDef { center: [x, y], size: [w, h], one_way: true }
}

fn player(x: f32, y: f32) -> Marker {
    Marker { kind: MarkerKind::PlayerSpawn, at: [x, y] }
}

fn enemy(x: f32, y: f32) -> Marker {
    Marker { kind: MarkerKind::EnemySpawn, at: [x, y] }
}

/// Floor, side walls and ceiling around the given interior platforms.
fn with_arena(interior: &[PlatformDef]) -> Vec<PlatformDef> {
    let wide = ARENA_HALF_WIDTH * 2.0 + WALL_THICKNESS * 2.0;
    let mid_y = ARENA_FLOOR + ARENA_HEIGHT * 0.5;
    let mut out = vec![
        solid(0.0, ARENA_FLOOR - WALL_THICKNESS * 0.5, wide, WALL_THICKNESS),
        solid(0.0, ARENA_FLOOR + ARENA_HEIGHT + WALL_THICKNESS * 0.5, wide, WALL_THICKNESS),
        solid(-ARENA_HALF_WIDTH - WALL_THICKNESS * 0.5, mid_y, WALL_THICKNESS, ARENA_HEIGHT),
        solid(ARENA_HALF_WIDTH + WALL_THICKNESS * 0.5, mid_y, WALL_THICKNESS, ARENA_HEIGHT),
    ];
    out.extend_from_slice(interior);
    out
}

/// Root of the currently instantiated level.
#[derive(Component, Debug)]
pub struct Level {
    pub template: String,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Platform {
    pub one_way: bool,
}

/// Damages whatever stands in it every `interval` seconds.
///
/// `next_hit` holds, per touching entity, the fixed time its next hit lands.
/// Entities that step off are forgotten, so re-entering hits immediately.
#[derive(Component, Debug, Default)]
pub struct Spikes {
    pub next_hit: HashMap<Entity, f64>,
}

pub fn plugin(app: &mut App) {
    app.add_systems(
        FixedUpdate,
        tick_spikes.run_if(in_state(GameState::InGame)),
    );
}

pub fn world_layers() -> CollisionLayers {
    CollisionLayers::new(
        Layer::World,
        [Layer::Player, Layer::Enemy, Layer::PlayerBullet, Layer::Pickup],
    )
}

pub fn platform_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::Platform, [Layer::Player, Layer::Enemy, Layer::Pickup])
}

pub fn spike_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::Hazard, [Layer::Player, Layer::Enemy])
}

/// Instantiate `template` under a new `Level` root and return the root.
pub fn spawn_level(commands: &mut Commands, template: &LevelTemplate) -> Entity {
    let solid_color = Color::srgb(0.25, 0.27, 0.33);
    let platform_color = Color::srgb(0.35, 0.30, 0.22);
    let spike_color = Color::srgb(0.70, 0.16, 0.16);

    commands
        .spawn((
            Name::new(format!("Level: {}", template.name)),
            Level { template: template.name.clone() },
            Transform::default(),
            Visibility::default(),
            DespawnOnExit(GameState::InGame),
        ))
        .with_children(|level| {
            for spec in &template.platforms {
                let size = Vec2::from(spec.size);
                let (color, layers) = if spec.one_way {
                    (platform_color, platform_layers())
                } else {
                    (solid_color, world_layers())
                };
                level.spawn((
                    Name::new(if spec.one_way { "OneWayPlatform" } else { "Platform" }),
                    Platform { one_way: spec.one_way },
                    Sprite::from_color(color, size),
                    Transform::from_translation(Vec2::from(spec.center).extend(0.0)),
                    RigidBody::Static,
                    Collider::rectangle(size.x, size.y),
                    Friction::ZERO,
                    layers,
                ));
            }
            for spec in &template.spikes {
                let size = Vec2::from(spec.size);
                level.spawn((
                    Name::new("Spikes"),
                    Spikes::default(),
                    Sprite::from_color(spike_color, size),
                    Transform::from_translation(Vec2::from(spec.center).extend(0.1)),
                    RigidBody::Static,
                    Collider::rectangle(size.x, size.y),
                    Sensor,
                    CollidingEntities::default(),
                    spike_layers(),
                ));
            }
        })
        .id()
}

/// Entities due a spike hit at `now`, updating the per-entity schedule.
pub fn spike_hits(spikes: &mut Spikes, touching: &[Entity], now: f64, interval: f32) -> Vec<Entity> {
    spikes.next_hit.retain(|e, _| touching.contains(e));
    let mut due = Vec::new();
    for &e in touching {
        let next = spikes.next_hit.entry(e).or_insert(now);
        if now >= *next {
            due.push(e);
            *next = now + f64::from(interval);
        }
    }
    due
}

fn tick_spikes(
    time: Res<Time<Fixed>>,
    tunables: Res<Tunables>,
    mut spikes: Query<(&mut Spikes, &CollidingEntities)>,
    mut damage: MessageWriter<Damage>,
) {
    let now = time.elapsed_secs_f64();
    let hazards = &tunables.hazards;
    for (mut spike, colliding) in &mut spikes {
        let touching: Vec<Entity> = colliding.iter().copied().collect();
        for target in spike_hits(&mut spike, &touching, now, hazards.spike_interval) {
            // No source: spike kills grant no reward.
            damage.write(Damage { target, amount: hazards.spike_damage, source: None });
        }
    }
}

#[cfg(test)]
mod tests;
