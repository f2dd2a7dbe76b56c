//! Item drops: one optional pickup per kill.

use avian2d::prelude::*;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy::state::state_scoped::DespawnOnExit;
use rand::Rng;
use serde::Deserialize;

use crate::common::layers::Layer;
use crate::common::state::GameState;
use crate::common::tunables::Tunables;
use crate::plugins::core::GameRng;

use super::EnemyKilled;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DropKind {
    /// Money, scaled by the collector's money multiplier.
    Coin { value: u32 },
    /// Restores a fraction of max health.
    HealingPack,
}

/// A possible drop with its independent probability in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct DropCandidate {
    #[serde(flatten)]
    pub kind: DropKind,
    pub chance: f32,
}

#[derive(Component, Debug, Clone, Copy)]
pub struct Pickup {
    pub kind: DropKind,
}

/// Roll candidates in order; the first success is the drop. At most one.
pub fn roll_drop(candidates: &[DropCandidate], rng: &mut impl Rng) -> Option<DropKind> {
    candidates
        .iter()
        .find(|c| rng.r#gen::<f32>() < c.chance)
        .map(|c| c.kind)
}

pub fn pickup_layers() -> CollisionLayers {
    CollisionLayers::new(Layer::Pickup, [Layer::World, Layer::Platform, Layer::Player])
}

pub fn spawn_pickup(commands: &mut Commands, kind: DropKind, at: Vec2, size: f32) -> Entity {
    let (name, color) = match kind {
        DropKind::Coin { .. } => ("Coin", Color::srgb(1.0, 0.82, 0.2)),
        DropKind::HealingPack => ("HealingPack", Color::srgb(0.3, 0.9, 0.4)),
    };
    commands
        .spawn((
            Name::new(name),
            Pickup { kind },
            Sprite::from_color(color, Vec2::splat(size)),
            Transform::from_translation(at.extend(0.5)),
            RigidBody::Dynamic,
            Collider::rectangle(size, size),
            LockedAxes::ROTATION_LOCKED,
            pickup_layers(),
            DespawnOnExit(GameState::InGame),
        ))
        .id()
}

pub fn spawn_drops(
    mut commands: Commands,
    tunables: Res<Tunables>,
    mut rng: ResMut<GameRng>,
    mut kills: MessageReader<EnemyKilled>,
) {
    for kill in kills.read() {
        if let Some(kind) = roll_drop(&tunables.drops, &mut rng.0) {
            spawn_pickup(&mut commands, kind, kill.position, tunables.pickups.size);
            debug!("Enemy dropped {kind:?}");
        }
    }
}
