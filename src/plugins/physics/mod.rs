//! Physics plugin: Avian setup, ground sensing and one-way platforms.
//!
//! Avian owns integration and contact resolution. This module only adds the two
//! platformer rules Avian has no opinion about:
//! - `Grounded`: whether a body is standing on something (jump gating).
//! - One-way platforms: riders collide with `Layer::Platform` only while falling
//!   and not dropping through.

use avian2d::prelude::*;
use bevy::ecs::message::MessageReader;
use bevy::prelude::*;

use crate::common::layers::Layer;
use crate::common::tunables::Tunables;
use crate::plugins::core::{Deferred, DeferredFired, DeferredTask};

/// Set from the body's downward shape cast at the start of each fixed step.
#[derive(Component, Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Grounded(pub bool);

/// A body that lands on one-way platforms.
#[derive(Component, Debug, Default, Clone, Copy)]
pub struct OneWayRider {
    /// True during a drop-through window; platforms are ignored entirely.
    pub dropping: bool,
}

/// Gap below the feet that still counts as standing.
const GROUND_PROBE_DISTANCE: f32 = 3.0;

pub fn plugin(app: &mut App) {
    let (ppm, gravity) = {
        let tunables = app.world().resource::<Tunables>();
        (tunables.pixels_per_meter, tunables.gravity)
    };
    app.add_plugins(PhysicsPlugins::default().with_length_unit(ppm));
    app.insert_resource(Gravity(Vec2::new(0.0, -gravity)));

    app.add_systems(FixedUpdate, (update_grounded, end_drop_through));
    app.add_systems(FixedPostUpdate, update_platform_filters.before(PhysicsSystems::StepSimulation));
}

/// Ground probe for a body whose collider is `width` wide and `half_height` tall below its center.
pub fn ground_caster(width: f32, half_height: f32) -> ShapeCaster {
    ShapeCaster::new(
        Collider::rectangle(width * 0.9, 2.0),
        Vec2::new(0.0, -half_height),
        0.0,
        Dir2::NEG_Y,
    )
    .with_max_distance(GROUND_PROBE_DISTANCE)
    .with_query_filter(SpatialQueryFilter::from_mask([Layer::World, Layer::Platform]))
}

/// A rising body is never grounded, even if its probe still touches a platform it is passing.
pub fn is_grounded(probe_hits: usize, vertical_velocity: f32) -> bool {
    probe_hits > 0 && vertical_velocity <= 1.0
}

/// Whether a rider should currently collide with one-way platforms.
pub fn platform_solid_for(rider: &OneWayRider, vertical_velocity: f32) -> bool {
    !rider.dropping && vertical_velocity <= 0.0
}

pub fn update_grounded(mut q: Query<(&ShapeHits, &LinearVelocity, &mut Grounded)>) {
    for (hits, vel, mut grounded) in &mut q {
        let now = is_grounded(hits.iter().count(), vel.y);
        if grounded.0 != now {
            grounded.0 = now;
        }
    }
}

pub(crate) fn update_platform_filters(
    mut q: Query<(&OneWayRider, &LinearVelocity, &mut CollisionLayers)>,
) {
    for (rider, vel, mut layers) in &mut q {
        // Non-interacting bodies (dying enemies) keep empty filters.
        if !layers.filters.has_all(Layer::World) {
            continue;
        }
        let has_platform = layers.filters.has_all(Layer::Platform);
        let wants_platform = platform_solid_for(rider, vel.y);
        if wants_platform && !has_platform {
            layers.filters.add(Layer::Platform);
        } else if !wants_platform && has_platform {
            layers.filters.remove(Layer::Platform);
        }
    }
}

/// Open a drop-through window of `duration` seconds. No effect while one is open.
pub fn start_drop_through(
    entity: Entity,
    rider: &mut OneWayRider,
    deferred: &mut Deferred,
    now: f64,
    duration: f32,
) -> bool {
    if rider.dropping {
        return false;
    }
    rider.dropping = true;
    deferred.schedule(now, duration, DeferredTask::DropThroughEnd { rider: entity });
    true
}

pub fn end_drop_through(mut fired: MessageReader<DeferredFired>, mut q: Query<&mut OneWayRider>) {
    for DeferredFired(task) in fired.read() {
        if let DeferredTask::DropThroughEnd { rider } = *task
            && let Ok(mut r) = q.get_mut(rider)
        {
            r.dropping = false;
        }
    }
}
