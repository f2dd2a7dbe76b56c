//! Feature plugins.

use bevy::prelude::*;

use crate::plugins::projectiles::ProjectilesPlugin;

pub mod core;
pub mod enemies;
pub mod persistence;
pub mod physics;
pub mod player;
pub mod projectiles;
pub mod rounds;
pub mod upgrades;
pub mod weapon;
pub mod world;

// Render-only
pub mod camera;

/// Register gameplay plugins that work in headless tests.
///
/// `core` goes first: it loads `Tunables`, which the others read while building.
pub fn register_gameplay(app: &mut App) {
    core::plugin(app);
    physics::plugin(app);
    persistence::plugin(app);
    world::plugin(app);
    player::plugin(app);
    weapon::plugin(app);
    enemies::plugin(app);
    rounds::plugin(app);
    upgrades::plugin(app);
    app.add_plugins(ProjectilesPlugin);
}

/// Register render-only plugins (requires DefaultPlugins / render infra).
pub fn register_render(app: &mut App) {
    camera::plugin(app);
}

/// Register all plugins (full app).
pub fn register_all(app: &mut App) {
    register_gameplay(app);
    register_render(app);
}
