use bevy::prelude::*;

/// Marks an entity owned by the bullet pool. Never removed.
#[derive(Component)]
pub struct PooledBullet;

/// Pool lifecycle of a bullet entity. Transitions only by value writes:
/// `Inactive -> Active` (allocator), `Active -> PendingReturn` (collision or
/// expiry), `PendingReturn -> Inactive` (commit).
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BulletState {
    #[default]
    Inactive,
    Active,
    PendingReturn,
}

#[derive(Component, Debug, Clone, Default)]
pub struct Bullet {
    pub damage: u32,
    /// Never damaged by this bullet; credited with its kills.
    pub owner: Option<Entity>,
    /// Firing generation. Expiry tasks carry the shot they were scheduled for.
    pub shot: u32,
}

impl Bullet {
    #[inline]
    pub fn reset_for_fire(&mut self, damage: u32, owner: Option<Entity>, shot: u32) {
        self.damage = damage;
        self.owner = owner;
        self.shot = shot;
    }
}
