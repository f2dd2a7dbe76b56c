//! Core plugin: shared resources, global settings and the deferred task queue.

pub mod deferred;

use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::common::combat::Damage;
use crate::common::tunables::Tunables;

pub use deferred::{Deferred, DeferredFired, DeferredTask};

/// The single source of randomness for gameplay decisions.
///
/// Level picks, upgrade draws and drop rolls all go through this resource, so a
/// configured seed makes a run reproducible.
#[derive(Resource, Deref, DerefMut)]
pub struct GameRng(pub StdRng);

impl GameRng {
    pub fn new(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self(StdRng::seed_from_u64(seed)),
            None => Self(StdRng::from_entropy()),
        }
    }
}

pub fn plugin(app: &mut App) {
    // Tests and tools may insert their own tunables before the plugin is built.
    if !app.world().contains_resource::<Tunables>() {
        app.insert_resource(Tunables::load_or_default());
    }
    let seed = app.world().resource::<Tunables>().rng_seed;

    app.insert_resource(GameRng::new(seed))
        .insert_resource(ClearColor(Color::srgb(0.05, 0.05, 0.07)))
        .init_resource::<Deferred>()
        .add_message::<DeferredFired>()
        .add_message::<Damage>()
        .add_systems(FixedPreUpdate, deferred::drive_deferred);
}
