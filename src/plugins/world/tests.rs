use avian2d::prelude::*;
use bevy::prelude::*;

use crate::common::test_utils::{dummy_entities, run_system_once};
use crate::plugins::world::{Level, LevelTemplate, MarkerKind, Platform, Spikes, spawn_level, spike_hits};

#[test]
fn builtin_levels_have_spawn_markers() {
    let levels = LevelTemplate::builtin();
    assert!(levels.len() >= 3);
    for level in &levels {
        assert!(level.enemy_spawns().count() >= 5, "{} has too few enemy spawns", level.name);
        assert!(level.markers.iter().any(|m| m.kind == MarkerKind::PlayerSpawn));
    }
}

#[test]
fn template_parses_from_toml() {
    let src = r#"
        name = "Flat"
        platforms = [
            { center = [0.0, -100.0], size = [800.0, 20.0] },
            { center = [0.0, 0.0], size = [100.0, 10.0], one_way = true },
        ]
        markers = [
            { kind = "player_spawn", at = [0.0, -80.0] },
            { kind = "enemy_spawn", at = [200.0, -80.0] },
        ]
    "#;
    let level: LevelTemplate = toml::from_str(src).unwrap();
    assert_eq!(level.platforms.len(), 2);
    assert!(level.platforms[1].one_way);
    assert!(level.spikes.is_empty());
    assert_eq!(level.player_spawn(), Vec2::new(0.0, -80.0));
    assert_eq!(level.enemy_spawns().collect::<Vec<_>>(), vec![Vec2::new(200.0, -80.0)]);
}

#[test]
fn level_without_player_marker_spawns_at_origin() {
    let level = LevelTemplate { name: "Empty".into(), platforms: vec![], spikes: vec![], markers: vec![] };
    assert_eq!(level.player_spawn(), Vec2::ZERO);
    assert_eq!(level.enemy_spawns().count(), 0);
}

#[test]
fn spawn_level_parents_geometry_under_one_root() {
    let mut world = World::new();
    let template = LevelTemplate::builtin().remove(0);
    let expected_platforms = template.platforms.len();
    let expected_spikes = template.spikes.len();

    let root = run_system_once(&mut world, move |mut commands: Commands| {
        spawn_level(&mut commands, &template)
    });

    assert!(world.get::<Level>(root).is_some());
    let children = world.get::<Children>(root).unwrap().len();
    assert_eq!(children, expected_platforms + expected_spikes);

    let statics = world
        .query::<(&Platform, &RigidBody)>()
        .iter(&world)
        .filter(|(_, rb)| matches!(**rb, RigidBody::Static))
        .count();
    assert_eq!(statics, expected_platforms);
    assert_eq!(world.query::<&Spikes>().iter(&world).count(), expected_spikes);
}

#[test]
fn spikes_hit_on_entry_then_every_interval() {
    let ids = dummy_entities(2);
    let (a, b) = (ids[0], ids[1]);
    let mut spikes = Spikes::default();

    assert_eq!(spike_hits(&mut spikes, &[a], 0.0, 0.5), vec![a]);
    assert!(spike_hits(&mut spikes, &[a], 0.25, 0.5).is_empty());
    assert_eq!(spike_hits(&mut spikes, &[a, b], 0.5, 0.5), vec![a, b]);
}

#[test]
fn stepping_off_spikes_resets_the_schedule() {
    let a = dummy_entities(1)[0];
    let mut spikes = Spikes::default();

    assert_eq!(spike_hits(&mut spikes, &[a], 0.0, 0.5), vec![a]);
    assert!(spike_hits(&mut spikes, &[], 0.1, 0.5).is_empty());
    assert_eq!(spike_hits(&mut spikes, &[a], 0.2, 0.5), vec![a]);
}
