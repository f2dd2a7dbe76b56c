//! Global state machines.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, States, Default)]
pub enum GameState {
    #[default]
    InGame,
    /// Player died; the run is over until restarted.
    GameOver,
}

/// Whether the simulation is running or frozen while an upgrade panel waits for a choice.
///
/// Only the fixed-step simulation is frozen. `Update` keeps ticking so the
/// selection itself can be made.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, States, Default)]
pub enum PlayState {
    #[default]
    Running,
    Selecting,
}
