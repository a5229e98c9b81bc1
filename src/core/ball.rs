use crate::core::event::Event;
use crate::core::EPS_TIME;
use crate::error::{Error, Result};
use std::rc::Rc;

/// Gravity, when enabled, acts along this axis with unit magnitude,
/// pointing negative.
pub const GRAVITY_AXIS: usize = 1;

/// A hard ball with its own proper time.
///
/// `pos` and `vel` are the state at simulated time `time`; between events the
/// ball is in free flight, so the state at any later instant follows in
/// closed form. Vectors are stored as `[f64; 3]` with the trailing component
/// unused (zero) in 2D.
#[derive(Debug)]
pub struct Ball {
    /// Stable index into the simulation's ball store.
    pub index: u32,
    /// Position at `time`.
    pub pos: [f64; 3],
    /// Velocity at `time`.
    pub vel: [f64; 3],
    /// Ball radius (shared by every ball in a run).
    pub radius: f64,
    /// Simulated time `pos` and `vel` were last written at.
    pub time: f64,
    /// Grid cell containing `pos` at `time`.
    pub cell: [i32; 3],
    /// Pending events this ball participates in, for bulk invalidation.
    events: Vec<Rc<Event>>,
}

impl Ball {
    pub fn new(index: u32, pos: [f64; 3], vel: [f64; 3], radius: f64, cell: [i32; 3]) -> Self {
        Self {
            index,
            pos,
            vel,
            radius,
            time: 0.0,
            cell,
            events: Vec::new(),
        }
    }

    /// Free-flight position and velocity at time `t >= self.time`.
    ///
    /// `t` within epsilon before `self.time` clamps to `self.time`; anything
    /// earlier is a time-reversal invariant violation.
    pub fn state_at(&self, t: f64, gravity: bool) -> Result<([f64; 3], [f64; 3])> {
        let mut dt = t - self.time;
        if dt < -EPS_TIME {
            return Err(Error::Invariant(format!(
                "ball {} queried at t={t} before its proper time {}",
                self.index, self.time
            )));
        }
        if dt < 0.0 {
            dt = 0.0;
        }
        let mut pos = self.pos;
        let mut vel = self.vel;
        for k in 0..3 {
            pos[k] += self.vel[k] * dt;
        }
        if gravity {
            pos[GRAVITY_AXIS] -= 0.5 * dt * dt;
            vel[GRAVITY_AXIS] -= dt;
        }
        Ok((pos, vel))
    }

    /// Advance the stored state to time `t` and set the proper time to it.
    pub fn advance_to(&mut self, t: f64, gravity: bool) -> Result<()> {
        let (pos, vel) = self.state_at(t, gravity)?;
        self.pos = pos;
        self.vel = vel;
        self.time = self.time.max(t);
        Ok(())
    }

    /// Kinetic energy with unit mass.
    #[inline]
    pub fn kinetic_energy(&self) -> f64 {
        0.5 * self.vel.iter().map(|&c| c * c).sum::<f64>()
    }

    /// Register a pending event this ball participates in.
    pub fn add_event(&mut self, event: Rc<Event>) {
        self.events.push(event);
    }

    /// Flip every owned event to invalid and clear the set. Called whenever
    /// this ball's velocity changes, so stale predictions are discarded on pop.
    pub fn invalidate_events(&mut self) {
        for event in self.events.drain(..) {
            event.invalidate();
        }
    }

    /// Number of still-pending grid-transit events this ball owns.
    /// A moving ball should own exactly one after regeneration.
    pub fn pending_transit_events(&self) -> usize {
        self.events
            .iter()
            .filter(|e| e.is_valid() && matches!(e.kind(), crate::core::EventKind::GridTransit { .. }))
            .count()
    }
}
