//! Things that happen *to* the player: contact damage, pickups, incoming
//! damage, and rewards for kills.

use avian2d::prelude::*;
use bevy::ecs::message::{MessageReader, MessageWriter};
use bevy::platform::collections::HashSet;
use bevy::prelude::*;

use crate::common::combat::Damage;
use crate::common::tunables::Tunables;
use crate::plugins::enemies::drops::{DropKind, Pickup};
use crate::plugins::enemies::{EnemyKilled, EnemyStats};
use crate::plugins::upgrades::panels::{PanelKind, PanelQueue};

use super::{PlayerDied, PlayerEntity, PlayerStats};

/// Apply a collected pickup to the player's stats.
pub fn apply_pickup(stats: &mut PlayerStats, kind: DropKind, heal_fraction: f32) {
    match kind {
        DropKind::Coin { value } => {
            let added = stats.add_money(value);
            debug!("Coin collected: +{added} (total {})", stats.money);
        }
        DropKind::HealingPack => {
            stats.heal(stats.max_health * heal_fraction);
            debug!("Healing pack collected: {:.1}/{:.1}", stats.current_health, stats.max_health);
        }
    }
}

/// The entity on the other side of a contact involving `player`, if any.
#[inline]
fn other_side(ev: &CollisionStart, player: Entity) -> Option<Entity> {
    let a = ev.body1.unwrap_or(ev.collider1);
    let b = ev.body2.unwrap_or(ev.collider2);
    if a == player {
        Some(b)
    } else if b == player {
        Some(a)
    } else {
        None
    }
}

pub fn player_contacts(
    mut commands: Commands,
    tunables: Res<Tunables>,
    player: Res<PlayerEntity>,
    mut started: MessageReader<CollisionStart>,
    q_enemies: Query<&EnemyStats>,
    q_pickups: Query<&Pickup>,
    mut q_stats: Query<&mut PlayerStats>,
    mut damage: MessageWriter<Damage>,
    mut taken: Local<HashSet<Entity>>,
) {
    taken.clear();
    let Some(player) = player.0 else {
        return;
    };

    for ev in started.read() {
        let Some(other) = other_side(ev, player) else {
            continue;
        };

        if let Ok(enemy) = q_enemies.get(other) {
            if !enemy.is_dead() {
                damage.write(Damage { target: player, amount: enemy.damage, source: None });
            }
            continue;
        }

        if let Ok(pickup) = q_pickups.get(other)
            && taken.insert(other)
            && let Ok(mut stats) = q_stats.get_mut(player)
        {
            apply_pickup(&mut stats, pickup.kind, tunables.pickups.heal_fraction);
            commands.entity(other).despawn();
        }
    }
}

pub fn apply_player_damage(
    player: Res<PlayerEntity>,
    mut incoming: MessageReader<Damage>,
    mut q_stats: Query<&mut PlayerStats>,
    mut died: MessageWriter<PlayerDied>,
) {
    let Some(player) = player.0 else {
        return;
    };
    for hit in incoming.read().filter(|d| d.target == player) {
        let Ok(mut stats) = q_stats.get_mut(player) else {
            return;
        };
        if stats.take_damage(hit.amount as f32) {
            died.write(PlayerDied { player });
        }
    }
}

/// Grant EXP to whoever is credited with a kill. Kills with no surviving
/// killer grant nothing.
pub fn reward_kills(
    mut kills: MessageReader<EnemyKilled>,
    mut q_stats: Query<&mut PlayerStats>,
    mut panels: ResMut<PanelQueue>,
) {
    for kill in kills.read() {
        let Some(killer) = kill.killer else {
            continue;
        };
        let Ok(mut stats) = q_stats.get_mut(killer) else {
            continue;
        };
        let levels = stats.add_experience(kill.exp_value);
        for _ in 0..levels {
            panels.push(PanelKind::PlayerLevelUp);
        }
        if levels > 0 {
            info!("Player reached level {} (next at {} EXP)", stats.level, stats.max_exp);
        }
    }
}
