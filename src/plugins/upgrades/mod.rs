//! Upgrade catalogs, option draws and the mutators each pick dispatches to.
//!
//! Three catalogs exist:
//! - the round catalog, offered after a cleared round;
//! - the level-up catalog, offered per player level gained;
//! - the enemy catalog, the second stage of the round reward.
//!
//! Drawing is weighted sampling *without replacement*, so a panel never shows
//! the same upgrade twice. `describe` and `apply` are plain functions of the
//! stats they touch; the panel flow in `panels` decides when they run.

pub mod panels;

use rand::Rng;

use crate::common::tunables::{PlayerTuning, UpgradeTuning};
use crate::plugins::enemies::EnemyMultipliers;
use crate::plugins::player::PlayerStats;
use crate::plugins::projectiles::pool::BulletPool;
use crate::plugins::weapon::Weapon;

pub use panels::{ActivePanel, EnemyUpgradeChosen, PanelKind, PanelQueue, PanelRequest, UpgradeChoice};

pub fn plugin(app: &mut bevy::prelude::App) {
    panels::plugin(app);
}

/// Upgrades that improve the player or the player's weapon.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UpgradeKind {
    // Level-up catalog
    MaxHealth,
    BulletDamage,
    MoveSpeed,
    // Round catalog
    BulletSpeed,
    FireRate,
    BulletLifetime,
    MagazineSize,
    ReloadTime,
    HealRate,
    ExpGain,
    MoneyGain,
}

pub const ROUND_CATALOG: [UpgradeKind; 8] = [
    UpgradeKind::BulletSpeed,
    UpgradeKind::FireRate,
    UpgradeKind::BulletLifetime,
    UpgradeKind::MagazineSize,
    UpgradeKind::ReloadTime,
    UpgradeKind::HealRate,
    UpgradeKind::ExpGain,
    UpgradeKind::MoneyGain,
];

pub const LEVEL_UP_CATALOG: [UpgradeKind; 3] =
    [UpgradeKind::MaxHealth, UpgradeKind::BulletDamage, UpgradeKind::MoveSpeed];

impl UpgradeKind {
    /// Config key used for weights in `[upgrades.weights]`.
    pub fn key(self) -> &'static str {
        match self {
            UpgradeKind::MaxHealth => "max_health",
            UpgradeKind::BulletDamage => "bullet_damage",
            UpgradeKind::MoveSpeed => "move_speed",
            UpgradeKind::BulletSpeed => "bullet_speed",
            UpgradeKind::FireRate => "fire_rate",
            UpgradeKind::BulletLifetime => "bullet_lifetime",
            UpgradeKind::MagazineSize => "magazine_size",
            UpgradeKind::ReloadTime => "reload_time",
            UpgradeKind::HealRate => "heal_rate",
            UpgradeKind::ExpGain => "exp_gain",
            UpgradeKind::MoneyGain => "money_gain",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            UpgradeKind::MaxHealth => "Max Health",
            UpgradeKind::BulletDamage => "Bullet Damage",
            UpgradeKind::MoveSpeed => "Move Speed",
            UpgradeKind::BulletSpeed => "Bullet Speed",
            UpgradeKind::FireRate => "Fire Rate",
            UpgradeKind::BulletLifetime => "Bullet Lifetime",
            UpgradeKind::MagazineSize => "Magazine Size",
            UpgradeKind::ReloadTime => "Reload Time",
            UpgradeKind::HealRate => "Heal Rate",
            UpgradeKind::ExpGain => "EXP Gain",
            UpgradeKind::MoneyGain => "Money Gain",
        }
    }

    /// Weapon upgrades that change how many bullets can be in flight.
    fn resizes_pool(self) -> bool {
        matches!(
            self,
            UpgradeKind::FireRate | UpgradeKind::BulletLifetime | UpgradeKind::MagazineSize
        )
    }
}

/// Enemy-side escalation picked as the second stage of a round reward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EnemyUpgrade {
    Speed,
    Health,
    Damage,
}

pub const ENEMY_CATALOG: [EnemyUpgrade; 3] = [EnemyUpgrade::Speed, EnemyUpgrade::Health, EnemyUpgrade::Damage];

impl EnemyUpgrade {
    pub fn label(self) -> &'static str {
        match self {
            EnemyUpgrade::Speed => "Enemy Speed",
            EnemyUpgrade::Health => "Enemy Health",
            EnemyUpgrade::Damage => "Enemy Damage",
        }
    }

    /// Compound the matching multiplier by `step`.
    pub fn apply(self, m: &mut EnemyMultipliers, step: f32) {
        let slot = match self {
            EnemyUpgrade::Speed => &mut m.speed,
            EnemyUpgrade::Health => &mut m.health,
            EnemyUpgrade::Damage => &mut m.damage,
        };
        *slot *= step;
    }

    pub fn describe(self, m: &EnemyMultipliers, step: f32) -> String {
        let current = match self {
            EnemyUpgrade::Speed => m.speed,
            EnemyUpgrade::Health => m.health,
            EnemyUpgrade::Damage => m.damage,
        };
        format!("{}: x{:.2} -> x{:.2}", self.label(), current, current * step)
    }
}

/// Draw up to `n` distinct entries, each pick weighted by its weight among the
/// entries still left. Non-positive weights are never drawn.
pub fn draw_options<K: Copy>(catalog: &[(K, f32)], n: usize, rng: &mut impl Rng) -> Vec<K> {
    let mut remaining: Vec<(K, f32)> = catalog.iter().copied().filter(|(_, w)| *w > 0.0).collect();
    let mut picked = Vec::with_capacity(n.min(remaining.len()));

    while picked.len() < n && !remaining.is_empty() {
        let total: f32 = remaining.iter().map(|(_, w)| w).sum();
        let mut roll = rng.r#gen::<f32>() * total;
        let mut index = remaining.len() - 1;
        for (i, (_, w)) in remaining.iter().enumerate() {
            if roll < *w {
                index = i;
                break;
            }
            roll -= w;
        }
        picked.push(remaining.swap_remove(index).0);
    }
    picked
}

/// Pair each kind with its configured weight (1.0 when not configured).
pub fn weighted(kinds: &[UpgradeKind], tuning: &UpgradeTuning) -> Vec<(UpgradeKind, f32)> {
    kinds
        .iter()
        .map(|k| (*k, tuning.weight(*k)))
        .collect()
}

pub fn enemy_catalog() -> Vec<(EnemyUpgrade, f32)> {
    ENEMY_CATALOG.iter().map(|u| (*u, 1.0)).collect()
}

/// "Label: current -> next" for a player upgrade, computed on a scratch copy so
/// the preview always matches what `apply` will do.
pub fn describe(kind: UpgradeKind, stats: &PlayerStats, weapon: &Weapon, tuning: &PlayerTuning) -> String {
    let mut next_stats = stats.clone();
    let mut next_weapon = weapon.clone();
    apply_to_stats(kind, &mut next_stats, &mut next_weapon, tuning);

    let (now, next) = match kind {
        UpgradeKind::MaxHealth => (fmt1(stats.max_health), fmt1(next_stats.max_health)),
        UpgradeKind::BulletDamage => (weapon.bullet_damage.to_string(), next_weapon.bullet_damage.to_string()),
        UpgradeKind::MoveSpeed => (fmt1(stats.move_speed), fmt1(next_stats.move_speed)),
        UpgradeKind::BulletSpeed => (fmt1(weapon.bullet_speed), fmt1(next_weapon.bullet_speed)),
        UpgradeKind::FireRate => (fmt1(weapon.fires_per_minute), fmt1(next_weapon.fires_per_minute)),
        UpgradeKind::BulletLifetime => (fmt2(weapon.bullet_lifetime), fmt2(next_weapon.bullet_lifetime)),
        UpgradeKind::MagazineSize => (weapon.magazine_size.to_string(), next_weapon.magazine_size.to_string()),
        UpgradeKind::ReloadTime => (fmt2(weapon.reload_time), fmt2(next_weapon.reload_time)),
        UpgradeKind::HealRate => (pct(stats.heal_rate), pct(next_stats.heal_rate)),
        UpgradeKind::ExpGain => (mult(stats.exp_multiplier), mult(next_stats.exp_multiplier)),
        UpgradeKind::MoneyGain => (mult(stats.money_multiplier), mult(next_stats.money_multiplier)),
    };
    format!("{}: {now} -> {next}", kind.label())
}

fn fmt1(v: f32) -> String {
    format!("{v:.1}")
}

fn fmt2(v: f32) -> String {
    format!("{v:.2}")
}

fn pct(v: f32) -> String {
    format!("{:.2}%", v * 100.0)
}

fn mult(v: f32) -> String {
    format!("x{v:.2}")
}

fn apply_to_stats(kind: UpgradeKind, stats: &mut PlayerStats, weapon: &mut Weapon, tuning: &PlayerTuning) {
    match kind {
        UpgradeKind::MaxHealth => stats.upgrade_max_health(tuning.max_health_step),
        UpgradeKind::BulletDamage => weapon.upgrade_damage(),
        UpgradeKind::MoveSpeed => stats.upgrade_move_speed(tuning.move_speed_step),
        UpgradeKind::BulletSpeed => weapon.upgrade_bullet_speed(),
        UpgradeKind::FireRate => weapon.upgrade_fire_rate(),
        UpgradeKind::BulletLifetime => weapon.upgrade_bullet_lifetime(),
        UpgradeKind::MagazineSize => weapon.upgrade_magazine_size(),
        UpgradeKind::ReloadTime => weapon.upgrade_reload_time(),
        UpgradeKind::HealRate => stats.upgrade_heal_rate(),
        UpgradeKind::ExpGain => stats.upgrade_exp_gain(),
        UpgradeKind::MoneyGain => stats.upgrade_money_gain(),
    }
}

/// Apply one upgrade. Weapon upgrades that change the in-flight requirement
/// retarget the bullet pool immediately.
pub fn apply(
    kind: UpgradeKind,
    stats: &mut PlayerStats,
    weapon: &mut Weapon,
    pool: &mut BulletPool,
    tuning: &PlayerTuning,
) {
    apply_to_stats(kind, stats, weapon, tuning);
    if kind.resizes_pool() {
        pool.set_target(weapon.pool_capacity());
    }
}
