//! Deferred continuations: timed waits resumed by the fixed tick.
//!
//! Anything that has to "wait N seconds, then continue" (reload, bullet lifetime,
//! dropping through a platform) schedules a `DeferredTask` here instead of keeping
//! its own timer. `drive_deferred` runs first in every fixed step and turns due
//! tasks into `DeferredFired` messages for the owning plugin to consume.
//!
//! Due times are measured on `Time<Fixed>`, so pausing virtual time also pauses
//! every pending wait.

use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeferredTask {
    /// A weapon's reload wait is over.
    ReloadComplete { weapon: Entity },
    /// A fired bullet reached the end of its lifetime.
    ///
    /// `shot` identifies the firing; a bullet that was recycled and fired again
    /// carries a different shot id, so a stale expiry is ignored.
    BulletExpired { bullet: Entity, shot: u32 },
    /// A rider's drop-through window on one-way platforms has ended.
    DropThroughEnd { rider: Entity },
}

#[derive(Message, Clone, Copy, Debug)]
pub struct DeferredFired(pub DeferredTask);

#[derive(Clone, Copy, Debug)]
struct Pending {
    due: f64,
    seq: u64,
    task: DeferredTask,
}

#[derive(Resource, Default, Debug)]
pub struct Deferred {
    pending: Vec<Pending>,
    next_seq: u64,
}

impl Deferred {
    /// Schedule `task` to fire once fixed time reaches `now + delay`.
    pub fn schedule(&mut self, now: f64, delay: f32, task: DeferredTask) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending.push(Pending { due: now + f64::from(delay.max(0.0)), seq, task });
    }

    /// Remove and return every task due at `now`, earliest first.
    /// Tasks with equal due times keep scheduling order.
    pub fn drain_due(&mut self, now: f64) -> Vec<DeferredTask> {
        let mut due: Vec<Pending> = Vec::new();
        self.pending.retain(|p| {
            if p.due <= now {
                due.push(*p);
                false
            } else {
                true
            }
        });
        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|p| p.task).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn is_scheduled(&self, task: &DeferredTask) -> bool {
        self.pending.iter().any(|p| &p.task == task)
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

pub fn drive_deferred(
    time: Res<Time<Fixed>>,
    mut deferred: ResMut<Deferred>,
    mut fired: MessageWriter<DeferredFired>,
) {
    for task in deferred.drain_due(time.elapsed_secs_f64()) {
        fired.write(DeferredFired(task));
    }
}
