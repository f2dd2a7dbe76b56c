//! Integration test harness.
//!
//! Keep integration tests headless:
//! - `MinimalPlugins` provides core ECS runtime.
//! - we then call `round_survival::game::configure_headless` to install gameplay plugins.
//! - time advances by exactly one fixed step per `app.update()`.

#![allow(dead_code)]

use std::path::PathBuf;
use std::time::Duration;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::scene::ScenePlugin;
use bevy::state::app::StatesPlugin;
use bevy::time::TimeUpdateStrategy;
use round_survival::common::tunables::Tunables;
use round_survival::plugins::persistence::ProgressStore;

/// Bevy's default fixed timestep.
pub const STEP: f64 = 1.0 / 64.0;

pub fn app_headless() -> App {
    app_with_store(ProgressStore::in_memory())
}

pub fn app_with_store(store: ProgressStore) -> App {
    let mut app = App::new();

    // Add AssetPlugin + ScenePlugin so SceneSpawner exists.
    app.add_plugins((MinimalPlugins, StatesPlugin, AssetPlugin::default(), ScenePlugin));
    app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(STEP)));

    let tunables = Tunables { rng_seed: Some(7), ..Tunables::default() };
    app.insert_resource(tunables);
    app.insert_resource(store);

    round_survival::game::configure_headless(&mut app);
    // `App::run` would call these; Avian registers its diagnostics resources in `finish`.
    app.finish();
    app.cleanup();
    app
}

pub fn run_frames(app: &mut App, n: usize) {
    for _ in 0..n {
        app.update();
    }
}

/// A fresh scratch directory for files written by one test.
pub fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("round-survival-it-{}-{name}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}
