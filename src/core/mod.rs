//! Core event-driven simulation kernel.
//!
//! Simulated time advances by jumping to the next predicted event: a
//! ball-ball collision, a ball-wall collision, a grid-cell transit, a frame
//! export, or the end marker. Each ball carries its own proper time and is
//! only advanced when an event touches it.

pub mod ball;
pub mod event;
pub mod generate;
pub mod grid;
pub mod output;
pub mod physics;
pub mod queue;
pub mod sim;
pub mod wall;

pub use ball::Ball;
pub use event::{Event, EventKind};
pub use grid::Grid;
pub use queue::EventQueue;
pub use sim::Simulation;
pub use wall::Wall;

/// Shared numeric tolerance for time and geometric comparisons.
pub(crate) const EPS_TIME: f64 = 1e-12;
