//! Weapon data: the immutable template and the per-player mutable stats.

use serde::Deserialize;

/// Extra pool entries on top of what the fire rate keeps in flight.
pub const POOL_BUFFER: usize = 5;

/// Named, versioned weapon definition. Never mutated at runtime; each player
/// clones it into a `Weapon` that upgrades then modify.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaponTemplate {
    pub name: String,
    pub version: u32,
    pub bullet_damage: u32,
    /// World units per second.
    pub bullet_speed: f32,
    pub fires_per_minute: f32,
    /// Seconds before an unobstructed bullet returns to the pool.
    pub bullet_lifetime: f32,
    pub magazine_size: u32,
    pub reload_time: f32,
}

impl Default for WeaponTemplate {
    fn default() -> Self {
        Self {
            name: "Pistol".into(),
            version: 1,
            bullet_damage: 10,
            bullet_speed: 640.0,
            fires_per_minute: 300.0,
            bullet_lifetime: 2.0,
            magazine_size: 30,
            reload_time: 2.0,
        }
    }
}

/// A player's weapon state.
///
/// Invariants:
/// - `current_ammo <= magazine_size`
/// - while `reloading`, `can_fire` is false
#[derive(bevy::prelude::Component, Debug, Clone, PartialEq)]
pub struct Weapon {
    pub template: String,
    pub bullet_damage: u32,
    pub bullet_speed: f32,
    pub fires_per_minute: f32,
    pub bullet_lifetime: f32,
    pub magazine_size: u32,
    pub reload_time: f32,
    pub current_ammo: u32,
    pub reloading: bool,
    /// Fixed time before which the next shot is refused.
    pub next_fire_time: f64,
}

impl Weapon {
    pub fn from_template(template: &WeaponTemplate) -> Self {
        Self {
            template: format!("{} v{}", template.name, template.version),
            bullet_damage: template.bullet_damage,
            bullet_speed: template.bullet_speed,
            fires_per_minute: template.fires_per_minute,
            bullet_lifetime: template.bullet_lifetime,
            magazine_size: template.magazine_size.max(1),
            reload_time: template.reload_time.max(0.0),
            current_ammo: template.magazine_size.max(1),
            reloading: false,
            next_fire_time: 0.0,
        }
    }

    /// Seconds between shots.
    #[inline]
    pub fn fire_interval(&self) -> f32 {
        60.0 / self.fires_per_minute
    }

    /// Pool entries needed so the weapon never starves while bullets are in
    /// flight, and never less than one full magazine.
    pub fn pool_capacity(&self) -> usize {
        let in_flight = (self.bullet_lifetime / self.fire_interval()).ceil().max(0.0) as usize;
        (in_flight + POOL_BUFFER).max(self.magazine_size as usize)
    }

    #[inline]
    pub fn can_fire(&self, now: f64) -> bool {
        !self.reloading && self.current_ammo > 0 && now >= self.next_fire_time
    }

    /// Spend one round. Callers check `can_fire` first.
    pub fn commit_shot(&mut self, now: f64) {
        self.current_ammo = self.current_ammo.saturating_sub(1);
        self.next_fire_time = now + f64::from(self.fire_interval());
    }

    #[inline]
    pub fn needs_auto_reload(&self) -> bool {
        !self.reloading && self.current_ammo == 0
    }

    /// Enter the reloading state. Returns false, changing nothing, when already
    /// reloading or the magazine is full.
    pub fn begin_reload(&mut self) -> bool {
        if self.reloading || self.current_ammo >= self.magazine_size {
            return false;
        }
        self.reloading = true;
        true
    }

    pub fn finish_reload(&mut self) {
        self.current_ammo = self.magazine_size;
        self.reloading = false;
    }

    pub fn upgrade_damage(&mut self) {
        self.bullet_damage = self.bullet_damage.saturating_add(2);
    }

    pub fn upgrade_bullet_speed(&mut self) {
        self.bullet_speed *= 1.1;
    }

    pub fn upgrade_fire_rate(&mut self) {
        self.fires_per_minute *= 1.1;
    }

    pub fn upgrade_bullet_lifetime(&mut self) {
        self.bullet_lifetime *= 1.1;
    }

    pub fn upgrade_magazine_size(&mut self) {
        self.magazine_size = (self.magazine_size as f32 * 1.1).round() as u32;
    }

    pub fn upgrade_reload_time(&mut self) {
        self.reload_time *= 0.9;
    }
}
