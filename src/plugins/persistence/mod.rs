//! Persistence plugin: the progress that survives between runs.
//!
//! Only two numbers are kept: the money wallet and the highest round reached.
//! They are stored as JSON (`{"money": 250, "highestRound": 7}`) in the
//! per-user data directory and written at checkpoints only:
//! - a round is cleared,
//! - the player dies,
//! - the app exits.
//!
//! Storage problems never stop the game. A missing file is a first run, a
//! corrupt one is logged and replaced by defaults, and failed writes are logged.

use std::fs;
use std::path::{Path, PathBuf};

use bevy::app::AppExit;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::common::error::{GameError, GameResult};
use crate::common::tunables::{PersistenceTuning, Tunables};
use crate::plugins::player::{PlayerDied, PlayerEntity, PlayerStats};
use crate::plugins::rounds::{self, RoundCompleted, RoundState};

/// Overrides the data directory (useful for tests and portable installs).
pub const DATA_DIR_ENV: &str = "ROUND_SURVIVAL_DATA_DIR";
const APP_DIR: &str = "round-survival";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PersistedProgress {
    pub money: u32,
    pub highest_round: u32,
}

/// The progress loaded at startup and refreshed at every checkpoint.
#[derive(Resource, Debug, Default, Clone, Copy)]
pub struct Progress(pub PersistedProgress);

impl Progress {
    /// Pull the latest wallet and best round from live game state.
    pub fn sync(&mut self, stats: Option<&PlayerStats>, round: &RoundState) {
        if let Some(stats) = stats {
            self.0.money = stats.money;
        }
        self.0.highest_round = self.0.highest_round.max(round.highest_round);
    }
}

/// Where progress lives. `path: None` keeps everything in memory.
#[derive(Resource, Debug, Clone, Default)]
pub struct ProgressStore {
    path: Option<PathBuf>,
}

impl ProgressStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: Some(path.into()) }
    }

    /// A store that never touches the disk.
    pub fn in_memory() -> Self {
        Self { path: None }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Resolve the data directory from the environment, config, then platform.
    pub fn from_env(tuning: &PersistenceTuning) -> Self {
        let dir = data_dir(
            std::env::var_os(DATA_DIR_ENV).map(PathBuf::from),
            tuning.data_dir.clone(),
            PlatformDirs::from_env(),
        );
        Self { path: dir.map(|d| d.join(&tuning.file_name)) }
    }

    /// Missing file → defaults. Unreadable or corrupt → error.
    pub fn load(&self) -> GameResult<PersistedProgress> {
        let Some(path) = self.path.as_deref() else {
            return Ok(PersistedProgress::default());
        };
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(PersistedProgress::default()),
            Err(e) => return Err(GameError::io(path, e)),
        };
        serde_json::from_str(&contents).map_err(|source| GameError::Json { path: path.to_path_buf(), source })
    }

    pub fn load_or_default(&self) -> PersistedProgress {
        match self.load() {
            Ok(progress) => progress,
            Err(e) => {
                warn!("{e}; starting from empty progress");
                PersistedProgress::default()
            }
        }
    }

    /// Write atomically: a temp file next to the target, then a rename.
    pub fn save(&self, progress: &PersistedProgress) -> GameResult<()> {
        let Some(path) = self.path.as_deref() else {
            return Ok(());
        };
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).map_err(|e| GameError::io(dir, e))?;
        }
        let json = serde_json::to_string_pretty(progress)
            .map_err(|source| GameError::Json { path: path.to_path_buf(), source })?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| GameError::io(&tmp, e))?;
        fs::rename(&tmp, path).map_err(|e| GameError::io(path, e))?;
        Ok(())
    }

    /// Save and log the outcome. Gameplay continues either way.
    pub fn checkpoint(&self, progress: &PersistedProgress, reason: &str) {
        match self.save(progress) {
            Ok(()) => info!(
                "Progress saved ({reason}): money {}, best round {}",
                progress.money, progress.highest_round
            ),
            Err(e) => warn!("Could not save progress ({reason}): {e}"),
        }
    }
}

/// Platform locations for per-user data, as read from the environment.
#[derive(Debug, Clone, Default)]
pub struct PlatformDirs {
    pub xdg_data_home: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub app_data: Option<PathBuf>,
}

impl PlatformDirs {
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var_os(name).filter(|v| !v.is_empty()).map(PathBuf::from);
        Self { xdg_data_home: var("XDG_DATA_HOME"), home: var("HOME"), app_data: var("APPDATA") }
    }
}

/// First match wins: explicit override, configured dir, platform data dir.
pub fn data_dir(
    env_override: Option<PathBuf>,
    configured: Option<PathBuf>,
    platform: PlatformDirs,
) -> Option<PathBuf> {
    env_override
        .or(configured)
        .or_else(|| platform.xdg_data_home.map(|d| d.join(APP_DIR)))
        .or_else(|| platform.home.map(|h| h.join(".local").join("share").join(APP_DIR)))
        .or_else(|| platform.app_data.map(|d| d.join(APP_DIR)))
}

pub fn plugin(app: &mut App) {
    if !app.world().contains_resource::<ProgressStore>() {
        let store = match app.world().get_resource::<Tunables>() {
            Some(tunables) => ProgressStore::from_env(&tunables.persistence),
            None => ProgressStore::from_env(&PersistenceTuning::default()),
        };
        if store.path().is_none() {
            warn!("{}; progress will not be saved", GameError::StorageUnavailable);
        }
        app.insert_resource(store);
    }

    let progress = app.world().resource::<ProgressStore>().load_or_default();
    info!("Loaded progress: money {}, best round {}", progress.money, progress.highest_round);

    app.insert_resource(Progress(progress))
        .add_systems(
            FixedPostUpdate,
            save_checkpoints
                .after(rounds::detect_completion)
                .after(crate::plugins::player::contacts::apply_player_damage),
        )
        .add_systems(Last, save_on_exit);
}

/// Why this tick saves, if it does. A death outranks a clear in the same tick.
pub fn checkpoint_reason(round_cleared: bool, player_died: bool) -> Option<&'static str> {
    match (round_cleared, player_died) {
        (_, true) => Some("player died"),
        (true, false) => Some("round cleared"),
        (false, false) => None,
    }
}

fn save_checkpoints(
    store: Res<ProgressStore>,
    round: Res<RoundState>,
    player_entity: Res<PlayerEntity>,
    q_stats: Query<&PlayerStats>,
    mut progress: ResMut<Progress>,
    mut completed: MessageReader<RoundCompleted>,
    mut died: MessageReader<PlayerDied>,
) {
    let cleared = completed.read().count() > 0;
    let died = died.read().count() > 0;
    let Some(reason) = checkpoint_reason(cleared, died) else {
        return;
    };
    let stats = player_entity.0.and_then(|e| q_stats.get(e).ok());
    progress.sync(stats, &round);
    store.checkpoint(&progress.0, reason);
}

fn save_on_exit(
    store: Res<ProgressStore>,
    round: Res<RoundState>,
    player_entity: Res<PlayerEntity>,
    q_stats: Query<&PlayerStats>,
    mut progress: ResMut<Progress>,
    mut exit: MessageReader<AppExit>,
) {
    if exit.read().next().is_none() {
        return;
    }
    let stats = player_entity.0.and_then(|e| q_stats.get(e).ok());
    progress.sync(stats, &round);
    store.checkpoint(&progress.0, "shutdown");
}
