//! Test helpers.
//!
//! Systems that use `Commands` enqueue structural changes. We call `world.flush()`
//! after running so queued commands are applied before assertions.

use std::time::Duration;

use bevy::ecs::message::{Message, MessageReader};
use bevy::ecs::system::{IntoSystem, RunSystemOnce};
use bevy::prelude::*;
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::plugins::core::GameRng;

/// Run a system once on the given world, then flush deferred commands.
/// Returns the system output.
pub fn run_system_once<T, Out, Marker>(world: &mut World, system: T) -> Out
where
    T: IntoSystem<(), Out, Marker>,
{
    let out = world.run_system_once(system).expect("system run failed");
    world.flush();
    out
}

/// A `Time<Fixed>` whose last step was `dt` seconds long.
pub fn fixed_time_with_delta(dt: f32) -> Time<Fixed> {
    let mut t = Time::<Fixed>::default();
    t.advance_by(Duration::from_secs_f32(dt));
    t
}

/// Advance the world's `Time<Fixed>` by one step of `dt` seconds.
pub fn step_fixed_time(world: &mut World, dt: f32) {
    world
        .resource_mut::<Time<Fixed>>()
        .advance_by(Duration::from_secs_f32(dt));
}

pub fn seeded_rng(seed: u64) -> GameRng {
    GameRng(StdRng::seed_from_u64(seed))
}

/// Read every message of type `M` currently buffered in the world.
pub fn read_messages<M: Message + Clone>(world: &mut World) -> Vec<M> {
    run_system_once(world, |mut reader: MessageReader<M>| {
        reader.read().cloned().collect::<Vec<M>>()
    })
}

/// Fresh entity ids for tests that only need distinct handles.
pub fn dummy_entities(n: usize) -> Vec<Entity> {
    let mut scratch = World::new();
    (0..n).map(|_| scratch.spawn_empty().id()).collect()
}
