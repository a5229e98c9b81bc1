use crate::error::{Error, Result};
use ordered_float::NotNan;
use std::cell::Cell;

/// What a scheduled event does when it fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Collision between balls `i` and `j`.
    BallBall { i: u32, j: u32 },
    /// Collision between ball `i` and wall `wall`.
    BallWall { i: u32, wall: u32 },
    /// Ball `i` crosses a face of its current cell into `new_cell`.
    GridTransit { i: u32, new_cell: [i32; 3] },
    /// Write a frame of every ball's state.
    Export,
    /// Stop the run.
    End,
}

/// A shared event record.
///
/// The heap holds one reference, each participating ball holds another; the
/// validity flag is the only mutable part. Invalidation flips it in place and
/// the queue discards flagged records on pop, so nothing ever searches the
/// heap (no decrease-key, no back pointers).
#[derive(Debug)]
pub struct Event {
    time: NotNan<f64>,
    kind: EventKind,
    valid: Cell<bool>,
}

impl Event {
    /// Create a pending event, rejecting NaN or non-finite times.
    pub fn new(time: f64, kind: EventKind) -> Result<Self> {
        if !time.is_finite() {
            return Err(Error::Numerics(format!(
                "event time {time} is not finite for {kind:?}"
            )));
        }
        let time =
            NotNan::new(time).map_err(|_| Error::Numerics(format!("NaN event time for {kind:?}")))?;
        Ok(Self {
            time,
            kind,
            valid: Cell::new(true),
        })
    }

    #[inline]
    pub fn time(&self) -> f64 {
        self.time.into_inner()
    }

    pub(crate) fn time_key(&self) -> NotNan<f64> {
        self.time
    }

    #[inline]
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Whether this event is still pending (not invalidated, not consumed).
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Mark the event stale; the queue will discard it on pop.
    #[inline]
    pub fn invalidate(&self) {
        self.valid.set(false);
    }
}
