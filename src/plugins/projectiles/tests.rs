//! Projectiles plugin tests.
//!
//! Collisions are not produced by the physics pipeline here. Tests inject
//! `CollisionStart` messages directly and run the projectile systems once.
use avian2d::prelude::*;
use bevy::ecs::message::Messages;
use bevy::prelude::*;

use super::messages::SpawnBulletRequest;
use super::{allocator, collision, commit, components, messages, pool};
use crate::common::combat::Damage;
use crate::common::layers::Layer;
use crate::common::test_utils::{dummy_entities, read_messages, run_system_once, step_fixed_time};
use crate::plugins::core::{Deferred, DeferredFired, DeferredTask};

// --------------------------------------------------------------------------------------
// Helpers
// --------------------------------------------------------------------------------------

fn write_collision_start(world: &mut World, a: Entity, b: Entity) {
    if world.get_resource::<Messages<CollisionStart>>().is_none() {
        world.init_resource::<Messages<CollisionStart>>();
    }
    world.write_message(CollisionStart { collider1: a, collider2: b, body1: Some(a), body2: Some(b) });
}

/// World with a pool of `n` inactive bullets and the resources the systems need.
fn world_with_pool(n: usize) -> World {
    let mut world = World::new();
    world.init_resource::<Time<Fixed>>();
    world.init_resource::<Deferred>();
    world.init_resource::<Messages<SpawnBulletRequest>>();
    world.init_resource::<Messages<DeferredFired>>();
    world.init_resource::<Messages<Damage>>();
    let mut p = pool::BulletPool::default();
    p.set_target(n);
    world.insert_resource(p);
    run_system_once(&mut world, pool::reconcile_pool);
    world
}


fn fire(world: &mut World, owner: Option<Entity>, lifetime: f32) -> Entity {
    world.write_message(SpawnBulletRequest {
        pos: Vec2::new(10.0, 20.0),
        vel: Vec2::new(100.0, 0.0),
        damage: 7,
        lifetime,
        owner,
    });
    run_system_once(world, allocator::allocate_bullets_from_pool);
    world
        .query::<(Entity, &components::BulletState)>()
        .iter(world)
        .filter(|(_, s)| **s == components::BulletState::Active)
        .map(|(e, _)| e)
        .last()
        .expect("a bullet should be active")
}

fn active_bullet(world: &mut World, owner: Option<Entity>) -> Entity {
    world
        .spawn((
            components::PooledBullet,
            components::BulletState::Active,
            components::Bullet { damage: 3, owner, shot: 1 },
            pool::active_bullet_layers(),
        ))
        .id()
}

/// Tiny deterministic xorshift for property-style tests.
struct TestRng(u64);

impl TestRng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

// --------------------------------------------------------------------------------------
// Pool bookkeeping (pure)
// --------------------------------------------------------------------------------------

#[test]
fn grow_plans_new_entries() {
    let mut p = pool::BulletPool::default();
    p.set_target(4);
    assert_eq!(p.plan_resize(), pool::ResizePlan { spawn: 4, retire: vec![] });
}

#[test]
fn shrink_retires_free_entries_before_in_flight_ones() {
    let ids = dummy_entities(6);
    let mut p = pool::BulletPool::default();
    ids.iter().for_each(|e| p.register(*e));
    let (fired_a, _) = p.take().unwrap();
    let (fired_b, _) = p.take().unwrap();

    // 6 entries, 2 in flight. Shrink to 1: all 4 free entries go now, 1 in-flight later.
    p.set_target(1);
    let plan = p.plan_resize();
    assert_eq!(plan.spawn, 0);
    assert_eq!(plan.retire.len(), 4);
    assert!(!plan.retire.contains(&fired_a) && !plan.retire.contains(&fired_b));
    assert_eq!(p.retire_pending(), 1);
    assert_eq!(p.effective_size(), 1);

    assert_eq!(p.recycle(fired_a), pool::Recycle::Retire);
    assert_eq!(p.recycle(fired_b), pool::Recycle::Free);
    assert_eq!(p.entries(), 1);
    assert_eq!(p.free_count(), 1);
}

#[test]
fn growing_again_cancels_pending_retirements() {
    let ids = dummy_entities(3);
    let mut p = pool::BulletPool::default();
    ids.iter().for_each(|e| p.register(*e));
    for _ in 0..3 {
        p.take().unwrap();
    }
    p.set_target(1);
    assert!(p.plan_resize().retire.is_empty());
    assert_eq!(p.retire_pending(), 2);

    p.set_target(4);
    let plan = p.plan_resize();
    assert_eq!(p.retire_pending(), 0);
    assert_eq!(plan.spawn, 1);
}

#[test]
fn shot_ids_change_on_every_take() {
    let ids = dummy_entities(1);
    let mut p = pool::BulletPool::default();
    p.register(ids[0]);
    let (e, first) = p.take().unwrap();
    p.recycle(e);
    let (_, second) = p.take().unwrap();
    assert_ne!(first, second);
}

#[test]
fn random_resizes_never_retire_in_flight_entries() {
    let ids = dummy_entities(64);
    let mut next_id = ids.into_iter();
    let mut rng = TestRng(0x9E37_79B9_7F4A_7C15);
    let mut p = pool::BulletPool::default();
    let mut in_flight: Vec<Entity> = Vec::new();

    for _ in 0..400 {
        match rng.below(4) {
            0 => {
                p.set_target(rng.below(12) as usize);
                let plan = p.plan_resize();
                for retired in &plan.retire {
                    assert!(!in_flight.contains(retired), "retired an in-flight bullet");
                }
                for _ in 0..plan.spawn {
                    match next_id.next() {
                        Some(e) => p.register(e),
                        None => return,
                    }
                }
                assert_eq!(p.effective_size(), p.target());
            }
            1 | 2 => {
                if let Some((e, _)) = p.take() {
                    in_flight.push(e);
                }
            }
            _ => {
                if !in_flight.is_empty() {
                    let i = rng.below(in_flight.len() as u64) as usize;
                    let e = in_flight.swap_remove(i);
                    p.recycle(e);
                }
            }
        }
        assert_eq!(p.in_flight(), in_flight.len());
        assert!(p.retire_pending() <= in_flight.len());
    }
}

// --------------------------------------------------------------------------------------
// Pool systems
// --------------------------------------------------------------------------------------

#[test]
fn reconcile_spawns_inactive_bullets() {
    let mut world = world_with_pool(8);

    assert_eq!(world.resource::<pool::BulletPool>().free_count(), 8);
    let mut q = world.query::<(&components::BulletState, &Visibility, &CollisionLayers, &CollisionEventsEnabled)>();
    assert_eq!(q.iter(&world).count(), 8);
    for (state, vis, layers, _) in q.iter(&world) {
        assert_eq!(*state, components::BulletState::Inactive);
        assert_eq!(*vis, Visibility::Hidden);
        assert!(layers.memberships.has_all(Layer::PlayerBullet));
        assert_eq!(layers.filters, LayerMask::NONE);
    }
}

#[test]
fn reconcile_shrink_despawns_only_free_bullets() {
    let mut world = world_with_pool(4);
    let shot = fire(&mut world, None, 2.0);

    world.resource_mut::<pool::BulletPool>().set_target(1);
    run_system_once(&mut world, pool::reconcile_pool);

    assert!(world.get_entity(shot).is_ok());
    let remaining = world.query::<&components::PooledBullet>().iter(&world).count();
    assert_eq!(remaining, 1);
}

#[test]
fn allocator_activates_bullet_and_schedules_expiry() {
    let mut world = world_with_pool(1);
    let owner = world.spawn_empty().id();
    let e = fire(&mut world, Some(owner), 2.0);

    assert_eq!(world.get::<Transform>(e).unwrap().translation.truncate(), Vec2::new(10.0, 20.0));
    assert_eq!(world.get::<LinearVelocity>(e).unwrap().0, Vec2::new(100.0, 0.0));
    assert_eq!(*world.get::<Visibility>(e).unwrap(), Visibility::Visible);
    let layers = world.get::<CollisionLayers>(e).unwrap();
    assert!(layers.filters.has_all(Layer::World));
    assert!(layers.filters.has_all(Layer::Enemy));
    let bullet = world.get::<components::Bullet>(e).unwrap();
    assert_eq!(bullet.damage, 7);
    assert_eq!(bullet.owner, Some(owner));

    let task = DeferredTask::BulletExpired { bullet: e, shot: bullet.shot };
    assert!(world.resource::<Deferred>().is_scheduled(&task));
}

#[test]
fn request_with_empty_pool_is_dropped() {
    let mut world = world_with_pool(0);
    world.write_message(SpawnBulletRequest {
        pos: Vec2::ZERO,
        vel: Vec2::X,
        damage: 1,
        lifetime: 1.0,
        owner: None,
    });
    run_system_once(&mut world, allocator::allocate_bullets_from_pool);
    assert!(world.resource::<Deferred>().is_empty());
}

#[test]
fn expiry_returns_bullet_after_lifetime() {
    let mut world = world_with_pool(1);
    let e = fire(&mut world, None, 0.5);

    step_fixed_time(&mut world, 0.5);
    run_system_once(&mut world, crate::plugins::core::deferred::drive_deferred);
    run_system_once(&mut world, allocator::expire_bullets);
    assert_eq!(*world.get::<components::BulletState>(e).unwrap(), components::BulletState::PendingReturn);

    run_system_once(&mut world, commit::return_to_pool_commit);
    assert_eq!(*world.get::<components::BulletState>(e).unwrap(), components::BulletState::Inactive);
    assert_eq!(world.get::<LinearVelocity>(e).unwrap().0, Vec2::ZERO);
    assert_eq!(world.resource::<pool::BulletPool>().free_count(), 1);
}

#[test]
fn stale_expiry_does_not_return_a_refired_bullet() {
    let mut world = world_with_pool(1);
    let e = fire(&mut world, None, 1.0);
    let first_shot = world.get::<components::Bullet>(e).unwrap().shot;

    // Hit a wall early, recycle, fire again.
    *world.get_mut::<components::BulletState>(e).unwrap() = components::BulletState::PendingReturn;
    run_system_once(&mut world, commit::return_to_pool_commit);
    let again = fire(&mut world, None, 1.0);
    assert_eq!(again, e);

    world.write_message(DeferredFired(DeferredTask::BulletExpired { bullet: e, shot: first_shot }));
    run_system_once(&mut world, allocator::expire_bullets);
    assert_eq!(*world.get::<components::BulletState>(e).unwrap(), components::BulletState::Active);
}

#[test]
fn commit_despawns_bullets_the_pool_is_retiring() {
    let mut world = world_with_pool(2);
    let e = fire(&mut world, None, 1.0);
    let _other = fire(&mut world, None, 1.0);

    world.resource_mut::<pool::BulletPool>().set_target(1);
    run_system_once(&mut world, pool::reconcile_pool);
    assert_eq!(world.resource::<pool::BulletPool>().retire_pending(), 1);

    *world.get_mut::<components::BulletState>(e).unwrap() = components::BulletState::PendingReturn;
    run_system_once(&mut world, commit::return_to_pool_commit);
    assert!(world.get_entity(e).is_err());
    assert_eq!(world.resource::<pool::BulletPool>().entries(), 1);
}

// --------------------------------------------------------------------------------------
// Collisions (injected CollisionStart)
// --------------------------------------------------------------------------------------

#[test]
fn world_geometry_absorbs_bullet() {
    let mut world = World::new();
    world.init_resource::<Messages<Damage>>();
    let bullet = active_bullet(&mut world, None);
    let wall = world.spawn(CollisionLayers::new(Layer::World, [Layer::PlayerBullet])).id();

    write_collision_start(&mut world, bullet, wall);
    run_system_once(&mut world, collision::process_player_bullet_collisions);

    assert_eq!(*world.get::<components::BulletState>(bullet).unwrap(), components::BulletState::PendingReturn);
    assert!(read_messages::<Damage>(&mut world).is_empty());
}

#[test]
fn enemy_hit_absorbs_bullet_and_credits_owner() {
    let mut world = World::new();
    world.init_resource::<Messages<Damage>>();
    let shooter = world.spawn_empty().id();
    let bullet = active_bullet(&mut world, Some(shooter));
    let enemy = world.spawn(CollisionLayers::new(Layer::Enemy, [Layer::PlayerBullet])).id();

    write_collision_start(&mut world, enemy, bullet);
    run_system_once(&mut world, collision::process_player_bullet_collisions);

    assert_eq!(*world.get::<components::BulletState>(bullet).unwrap(), components::BulletState::PendingReturn);
    assert_eq!(
        read_messages::<Damage>(&mut world),
        vec![Damage { target: enemy, amount: 3, source: Some(shooter) }]
    );
}

#[test]
fn bullet_damages_only_the_first_enemy_it_touches() {
    let mut world = World::new();
    world.init_resource::<Messages<Damage>>();
    let bullet = active_bullet(&mut world, None);
    let a = world.spawn(CollisionLayers::new(Layer::Enemy, [Layer::PlayerBullet])).id();
    let b = world.spawn(CollisionLayers::new(Layer::Enemy, [Layer::PlayerBullet])).id();

    write_collision_start(&mut world, bullet, a);
    write_collision_start(&mut world, bullet, b);
    run_system_once(&mut world, collision::process_player_bullet_collisions);

    let hits = read_messages::<Damage>(&mut world);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].target, a);
}

#[test]
fn bullet_ignores_its_owner() {
    let mut world = World::new();
    world.init_resource::<Messages<Damage>>();
    let owner = world.spawn(CollisionLayers::new(Layer::Enemy, [Layer::PlayerBullet])).id();
    let bullet = active_bullet(&mut world, Some(owner));

    write_collision_start(&mut world, bullet, owner);
    run_system_once(&mut world, collision::process_player_bullet_collisions);

    assert_eq!(*world.get::<components::BulletState>(bullet).unwrap(), components::BulletState::Active);
    assert!(read_messages::<Damage>(&mut world).is_empty());
}

#[test]
fn inactive_bullets_ignore_collisions() {
    let mut world = World::new();
    world.init_resource::<Messages<Damage>>();
    let bullet = active_bullet(&mut world, None);
    *world.get_mut::<components::BulletState>(bullet).unwrap() = components::BulletState::Inactive;
    let enemy = world.spawn(CollisionLayers::new(Layer::Enemy, [Layer::PlayerBullet])).id();

    write_collision_start(&mut world, bullet, enemy);
    run_system_once(&mut world, collision::process_player_bullet_collisions);

    assert!(read_messages::<Damage>(&mut world).is_empty());
}

#[test]
fn projectiles_plugin_registers_pool_and_messages() {
    let mut app = App::new();
    app.add_plugins(bevy::state::app::StatesPlugin);
    app.init_state::<crate::common::state::GameState>();
    app.add_plugins(super::ProjectilesPlugin);
    assert!(app.world().get_resource::<pool::BulletPool>().is_some());
    assert!(app.world().get_resource::<Messages<messages::SpawnBulletRequest>>().is_some());
}
