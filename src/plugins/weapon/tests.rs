use bevy::ecs::message::Messages;
use bevy::prelude::*;

use super::{TriggerInput, Weapon, WeaponTemplate, complete_reloads, fire_weapon, provision_pool, start_reload};
use crate::common::test_utils::{dummy_entities, read_messages, run_system_once, step_fixed_time};
use crate::plugins::core::deferred::drive_deferred;
use crate::plugins::core::{Deferred, DeferredFired};
use crate::plugins::player::{Facing, Player};
use crate::plugins::projectiles::messages::SpawnBulletRequest;
use crate::plugins::projectiles::pool::BulletPool;

fn weapon() -> Weapon {
    Weapon::from_template(&WeaponTemplate::default())
}

fn shooting_world() -> (World, Entity) {
    let mut world = World::new();
    world.init_resource::<Time<Fixed>>();
    world.init_resource::<Deferred>();
    world.init_resource::<Messages<SpawnBulletRequest>>();
    world.init_resource::<Messages<DeferredFired>>();
    world.insert_resource(TriggerInput { held: true, ..default() });
    let mut pool = BulletPool::default();
    pool.register(dummy_entities(1)[0]);
    world.insert_resource(pool);
    let player = world.spawn((Player, weapon(), Transform::default(), Facing::Right)).id();
    (world, player)
}

fn tick(world: &mut World, dt: f32) {
    step_fixed_time(world, dt);
    run_system_once(world, drive_deferred);
    run_system_once(world, complete_reloads);
}

#[test]
fn template_defaults() {
    let w = weapon();
    assert_eq!(w.bullet_damage, 10);
    assert_eq!(w.magazine_size, 30);
    assert_eq!(w.current_ammo, 30);
    assert!((w.fire_interval() - 0.2).abs() < 1e-6);
}

#[test]
fn pool_capacity_covers_magazine_and_bullets_in_flight() {
    let mut w = weapon();
    // 2s lifetime / 0.2s interval = 10 in flight + 5 buffer, below a 30 round magazine.
    assert_eq!(w.pool_capacity(), 30);

    w.fires_per_minute = 1200.0;
    w.bullet_lifetime = 3.0;
    // 3 / 0.05 = 60 in flight + 5.
    assert_eq!(w.pool_capacity(), 65);
}

#[test]
fn firing_is_gated_by_interval_ammo_and_reload() {
    let mut w = weapon();
    assert!(w.can_fire(0.0));
    w.commit_shot(0.0);
    assert_eq!(w.current_ammo, 29);
    assert!(!w.can_fire(0.1));
    assert!(w.can_fire(0.2 + 1e-6));

    w.reloading = true;
    assert!(!w.can_fire(10.0));

    w.reloading = false;
    w.current_ammo = 0;
    assert!(!w.can_fire(10.0));
}

#[test]
fn reload_reentry_has_no_effect() {
    let mut w = weapon();
    w.current_ammo = 3;
    assert!(w.begin_reload());
    assert!(!w.begin_reload());
    assert!(w.reloading);
    assert_eq!(w.current_ammo, 3);

    let mut deferred = Deferred::default();
    let e = dummy_entities(1)[0];
    assert!(!start_reload(e, &mut w, &mut deferred, 0.0));
    assert!(deferred.is_empty());
}

#[test]
fn full_magazine_refuses_manual_reload() {
    let mut w = weapon();
    assert!(!w.begin_reload());
    assert!(!w.reloading);
}

#[test]
fn upgrades_follow_their_steps() {
    let mut w = weapon();
    w.upgrade_damage();
    w.upgrade_bullet_speed();
    w.upgrade_fire_rate();
    w.upgrade_bullet_lifetime();
    w.upgrade_magazine_size();
    w.upgrade_reload_time();

    assert_eq!(w.bullet_damage, 12);
    assert!((w.bullet_speed - 704.0).abs() < 1e-3);
    assert!((w.fires_per_minute - 330.0).abs() < 1e-3);
    assert!((w.bullet_lifetime - 2.2).abs() < 1e-5);
    assert_eq!(w.magazine_size, 33);
    assert!((w.reload_time - 1.8).abs() < 1e-5);
}

#[test]
fn template_parses_partial_toml() {
    let t: WeaponTemplate = toml::from_str("name = \"Rifle\"\nmagazine_size = 12").unwrap();
    assert_eq!(t.name, "Rifle");
    assert_eq!(t.magazine_size, 12);
    assert_eq!(t.bullet_damage, WeaponTemplate::default().bullet_damage);
}

#[test]
fn magazine_empties_then_reloads_after_reload_time() {
    let (mut world, player) = shooting_world();

    for _ in 0..30 {
        step_fixed_time(&mut world, 0.25);
        run_system_once(&mut world, fire_weapon);
    }
    assert_eq!(read_messages::<SpawnBulletRequest>(&mut world).len(), 30);
    let w = world.get::<Weapon>(player).unwrap();
    assert_eq!(w.current_ammo, 0);
    assert!(w.reloading);

    // 1.75s into a 2s reload: still empty, trigger does nothing.
    for _ in 0..7 {
        tick(&mut world, 0.25);
        run_system_once(&mut world, fire_weapon);
    }
    assert_eq!(read_messages::<SpawnBulletRequest>(&mut world).len(), 30);
    assert_eq!(world.get::<Weapon>(player).unwrap().current_ammo, 0);

    tick(&mut world, 0.25);
    let w = world.get::<Weapon>(player).unwrap();
    assert_eq!(w.current_ammo, 30);
    assert!(!w.reloading);
    assert_eq!(world.resource::<BulletPool>().target(), 30);
}

#[test]
fn shot_follows_facing_and_uses_weapon_damage() {
    let (mut world, player) = shooting_world();
    world.get_mut::<Transform>(player).unwrap().translation = Vec3::new(5.0, 5.0, 0.0);
    *world.get_mut::<Facing>(player).unwrap() = Facing::Left;

    run_system_once(&mut world, fire_weapon);

    let shots = read_messages::<SpawnBulletRequest>(&mut world);
    assert_eq!(shots.len(), 1);
    assert!(shots[0].vel.x < 0.0 && shots[0].vel.y == 0.0);
    assert!(shots[0].pos.x < 5.0);
    assert_eq!(shots[0].damage, 10);
    assert_eq!(shots[0].owner, Some(player));
}

#[test]
fn no_free_bullet_means_no_shot() {
    let (mut world, player) = shooting_world();
    world.insert_resource(BulletPool::default());

    run_system_once(&mut world, fire_weapon);

    assert!(read_messages::<SpawnBulletRequest>(&mut world).is_empty());
    assert_eq!(world.get::<Weapon>(player).unwrap().current_ammo, 30);
}

#[test]
fn manual_reload_request_is_consumed() {
    let (mut world, player) = shooting_world();
    world.get_mut::<Weapon>(player).unwrap().current_ammo = 10;
    world.insert_resource(TriggerInput { held: false, reload_requested: true, aim: None });

    run_system_once(&mut world, fire_weapon);

    assert!(world.get::<Weapon>(player).unwrap().reloading);
    assert!(!world.resource::<TriggerInput>().reload_requested);
    assert_eq!(world.resource::<Deferred>().len(), 1);
}

#[test]
fn new_weapon_sizes_the_pool() {
    let mut world = World::new();
    world.init_resource::<BulletPool>();
    world.spawn(weapon());
    run_system_once(&mut world, provision_pool);
    assert_eq!(world.resource::<BulletPool>().target(), 30);
}
