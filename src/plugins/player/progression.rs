//! Player stats and the rules that mutate them.
//!
//! Everything here is plain data and arithmetic so it can be tested without a
//! `World`. Systems call these methods and handle the side effects (panels,
//! death, saving).

use bevy::prelude::*;

use crate::common::tunables::PlayerTuning;

/// Growth of the EXP threshold per level.
pub const MAX_EXP_GROWTH: f32 = 1.5;

/// Invariants:
/// - `0 <= current_health <= max_health`
/// - `current_exp < max_exp` between calls to `add_experience`
#[derive(Component, Debug, Clone, PartialEq)]
pub struct PlayerStats {
    pub move_speed: f32,
    pub jump_force: f32,
    pub max_health: f32,
    pub current_health: f32,
    /// Fraction of `max_health` restored per heal interval.
    pub heal_rate: f32,
    pub heal_interval: f32,
    heal_elapsed: f32,
    pub current_exp: u32,
    pub max_exp: u32,
    pub level: u32,
    pub exp_multiplier: f32,
    pub money: u32,
    pub money_multiplier: f32,
    dead: bool,
}

impl PlayerStats {
    pub fn from_tuning(t: &PlayerTuning, money: u32) -> Self {
        Self {
            move_speed: t.move_speed,
            jump_force: t.jump_force,
            max_health: t.max_health,
            current_health: t.max_health,
            heal_rate: t.heal_rate,
            heal_interval: t.heal_interval,
            heal_elapsed: 0.0,
            current_exp: 0,
            max_exp: t.max_exp.max(1),
            level: 1,
            exp_multiplier: 1.0,
            money,
            money_multiplier: 1.0,
            dead: false,
        }
    }

    #[inline]
    pub fn is_dead(&self) -> bool {
        self.dead
    }

    /// Apply damage. Returns true only for the hit that kills.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.dead {
            return false;
        }
        self.current_health = (self.current_health - amount.max(0.0)).clamp(0.0, self.max_health);
        if self.current_health <= 0.0 {
            self.dead = true;
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        if self.dead {
            return;
        }
        self.current_health = (self.current_health + amount.max(0.0)).clamp(0.0, self.max_health);
    }

    /// Passive regeneration. Heals `max_health * heal_rate` once per full
    /// interval spent below max health; returns the amount healed.
    pub fn advance_healing(&mut self, dt: f32) -> f32 {
        if self.dead || self.current_health >= self.max_health {
            return 0.0;
        }
        self.heal_elapsed += dt;
        if self.heal_elapsed < self.heal_interval {
            return 0.0;
        }
        self.heal_elapsed = 0.0;
        let before = self.current_health;
        self.heal(self.max_health * self.heal_rate);
        self.current_health - before
    }

    /// Add experience scaled by the multiplier. Returns the number of levels gained.
    pub fn add_experience(&mut self, amount: u32) -> u32 {
        let scaled = (amount as f32 * self.exp_multiplier).round() as u32;
        self.current_exp = self.current_exp.saturating_add(scaled);

        let mut gained = 0;
        while self.current_exp >= self.max_exp {
            self.current_exp -= self.max_exp;
            self.level += 1;
            self.max_exp = ((self.max_exp as f32 * MAX_EXP_GROWTH).round() as u32).max(1);
            gained += 1;
        }
        gained
    }

    /// Add money scaled by the multiplier. Returns the amount actually added.
    pub fn add_money(&mut self, amount: u32) -> u32 {
        let scaled = (amount as f32 * self.money_multiplier).round().max(0.0) as u32;
        self.money = self.money.saturating_add(scaled);
        scaled
    }

    pub fn upgrade_max_health(&mut self, step: f32) {
        self.max_health += step;
    }

    pub fn upgrade_move_speed(&mut self, step: f32) {
        self.move_speed += step;
    }

    pub fn upgrade_heal_rate(&mut self) {
        self.heal_rate *= 1.1;
    }

    pub fn upgrade_exp_gain(&mut self) {
        self.exp_multiplier *= 1.1;
    }

    pub fn upgrade_money_gain(&mut self) {
        self.money_multiplier *= 1.1;
    }
}
