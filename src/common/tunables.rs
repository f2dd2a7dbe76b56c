//! Tunable gameplay constants.
//!
//! `Tunables` is loaded once from `assets/tunables.toml` while the core plugin is
//! built, before the physics plugin reads `pixels_per_meter`. Every section is
//! `#[serde(default)]`, so a file only needs the values it overrides. A missing
//! file is normal (compiled defaults apply); a malformed one is logged and ignored.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bevy::prelude::*;
use serde::Deserialize;

use crate::common::error::{GameError, GameResult};
use crate::plugins::enemies::drops::{DropCandidate, DropKind};
use crate::plugins::upgrades::{LEVEL_UP_CATALOG, ROUND_CATALOG, UpgradeKind};
use crate::plugins::weapon::WeaponTemplate;
use crate::plugins::world::LevelTemplate;

pub const DEFAULT_TUNABLES_PATH: &str = "assets/tunables.toml";
/// Overrides the tunables path (useful for tests and mods).
pub const TUNABLES_PATH_ENV: &str = "ROUND_SURVIVAL_TUNABLES";

#[derive(Resource, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Tunables {
    pub pixels_per_meter: f32,
    /// Downward acceleration in world units per second squared.
    pub gravity: f32,
    /// Fixed RNG seed. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    pub player: PlayerTuning,
    pub weapon: WeaponTemplate,
    pub enemy: EnemyTuning,
    pub rounds: RoundTuning,
    pub upgrades: UpgradeTuning,
    pub hazards: HazardTuning,
    pub pickups: PickupTuning,
    pub drops: Vec<DropCandidate>,
    pub levels: Vec<LevelTemplate>,
    pub persistence: PersistenceTuning,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            pixels_per_meter: 32.0,
            gravity: 980.0,
            rng_seed: None,
            player: PlayerTuning::default(),
            weapon: WeaponTemplate::default(),
            enemy: EnemyTuning::default(),
            rounds: RoundTuning::default(),
            upgrades: UpgradeTuning::default(),
            hazards: HazardTuning::default(),
            pickups: PickupTuning::default(),
            drops: vec![
                DropCandidate { kind: DropKind::Coin { value: 5 }, chance: 0.35 },
                DropCandidate { kind: DropKind::HealingPack, chance: 0.10 },
            ],
            levels: LevelTemplate::builtin(),
            persistence: PersistenceTuning::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    pub move_speed: f32,
    pub jump_force: f32,
    pub max_health: f32,
    /// Fraction of max health restored per heal interval.
    pub heal_rate: f32,
    pub heal_interval: f32,
    pub max_exp: u32,
    /// World units added per "Move Speed" level-up pick.
    pub move_speed_step: f32,
    pub max_health_step: f32,
    /// How long the player ignores one-way platforms after pressing down.
    pub drop_through_time: f32,
    pub radius: f32,
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            move_speed: 160.0,
            jump_force: 480.0,
            max_health: 100.0,
            heal_rate: 0.001,
            heal_interval: 1.0,
            max_exp: 100,
            move_speed_step: 32.0,
            max_health_step: 10.0,
            drop_through_time: 0.2,
            radius: 12.0,
        }
    }
}

/// Base enemy stats before round multipliers, plus AI parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EnemyTuning {
    pub move_speed: f32,
    pub max_health: u32,
    pub damage: u32,
    pub exp_value: u32,
    pub detection_range: f32,
    /// Seconds the player must stay out of range before pursuit is abandoned.
    pub lose_interest_after: f32,
    pub patrol_half_width: f32,
    pub jump_force: f32,
    pub jump_cooldown: f32,
    pub jump_height_threshold: f32,
    pub jump_horizontal_range: f32,
    pub size: f32,
}

impl Default for EnemyTuning {
    fn default() -> Self {
        Self {
            move_speed: 64.0,
            max_health: 50,
            damage: 10,
            exp_value: 20,
            detection_range: 256.0,
            lose_interest_after: 1.5,
            patrol_half_width: 96.0,
            jump_force: 420.0,
            jump_cooldown: 1.2,
            jump_height_threshold: 48.0,
            jump_horizontal_range: 160.0,
            size: 28.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RoundTuning {
    pub enemies_per_round: usize,
    /// Money granted (before the money multiplier) when a round is cleared.
    pub completion_reward: u32,
    /// Factor applied to an enemy multiplier per pick.
    pub enemy_upgrade_step: f32,
    pub player_choices: usize,
    pub enemy_choices: usize,
}

impl Default for RoundTuning {
    fn default() -> Self {
        Self {
            enemies_per_round: 5,
            completion_reward: 25,
            enemy_upgrade_step: 1.2,
            player_choices: 3,
            enemy_choices: 2,
        }
    }
}

/// Draw weights keyed by upgrade name (`fire_rate`, `heal_rate`, ...).
/// Unlisted upgrades weigh 1.0; a weight of 0 removes one from the draw.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UpgradeTuning {
    pub weights: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HazardTuning {
    pub spike_damage: u32,
    pub spike_interval: f32,
}

impl Default for HazardTuning {
    fn default() -> Self {
        Self { spike_damage: 10, spike_interval: 0.5 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PickupTuning {
    /// Fraction of max health restored by a healing pack.
    pub heal_fraction: f32,
    pub size: f32,
}

impl Default for PickupTuning {
    fn default() -> Self {
        Self { heal_fraction: 0.25, size: 12.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PersistenceTuning {
    /// Explicit data directory. `None` resolves the per-user data directory.
    pub data_dir: Option<PathBuf>,
    pub file_name: String,
}

impl Default for PersistenceTuning {
    fn default() -> Self {
        Self { data_dir: None, file_name: "progress.json".into() }
    }
}

impl Tunables {
    pub fn from_toml_str(contents: &str, path: &Path) -> GameResult<Self> {
        toml::from_str(contents).map_err(|source| GameError::Toml { path: path.to_path_buf(), source })
    }

    pub fn load(path: &Path) -> GameResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| GameError::io(path, e))?;
        Self::from_toml_str(&contents, path)
    }

    /// Load from the env override or the default path, falling back to compiled defaults.
    pub fn load_or_default() -> Self {
        let path = std::env::var_os(TUNABLES_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_TUNABLES_PATH));

        match Self::load(&path) {
            Ok(tunables) => {
                info!("Loaded tunables from {}", path.display());
                tunables.validated()
            }
            Err(e) if e.is_not_found() => {
                info!("No {} found; using compiled defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{e}; using compiled defaults");
                Self::default()
            }
        }
    }

    /// Repair values that would break the simulation rather than rejecting the file.
    pub fn validated(mut self) -> Self {
        if self.levels.is_empty() {
            warn!("No level templates configured; using built-in levels");
            self.levels = LevelTemplate::builtin();
        }
        for level in &self.levels {
            if level.enemy_spawns().next().is_none() {
                warn!("Level '{}' has no enemy spawn markers; its rounds cannot complete", level.name);
            }
        }
        if self.weapon.fires_per_minute <= 0.0 {
            warn!("weapon.fires_per_minute must be positive; using default");
            self.weapon.fires_per_minute = WeaponTemplate::default().fires_per_minute;
        }
        self.player.max_exp = self.player.max_exp.max(1);
        if self.rounds.player_choices == 0 || self.rounds.enemy_choices == 0 {
            warn!("rounds.player_choices and rounds.enemy_choices must be at least 1");
            self.rounds.player_choices = self.rounds.player_choices.max(1);
            self.rounds.enemy_choices = self.rounds.enemy_choices.max(1);
        }
        for (name, catalog) in [("level-up", &LEVEL_UP_CATALOG[..]), ("round", &ROUND_CATALOG[..])] {
            if !self.upgrades.any_drawable(catalog) {
                warn!("Every {name} upgrade has a non-positive weight; resetting their weights");
                for kind in catalog {
                    self.upgrades.weights.remove(kind.key());
                }
            }
        }
        self
    }
}

impl UpgradeTuning {
    pub fn weight(&self, kind: UpgradeKind) -> f32 {
        self.weights.get(kind.key()).copied().unwrap_or(1.0)
    }

    /// True if at least one of `kinds` can be drawn.
    pub fn any_drawable(&self, kinds: &[UpgradeKind]) -> bool {
        kinds.iter().any(|k| self.weight(*k) > 0.0)
    }
}
