//! Event-driven molecular dynamics of hard balls in an axis-aligned box.
//!
//! `ballsim` advances simulated time by jumping between predicted events
//! instead of integrating with a fixed timestep: ball-ball and ball-wall
//! collisions, grid-cell transits, frame exports, and the end marker. A
//! uniform grid bounds the neighbor search, a min-heap orders pending events,
//! and stale predictions are lazily invalidated through per-ball owner sets.
//! Optional uniform gravity acts along negative y.
//!
//! Frames are written as whitespace-separated text files, one per export
//! event; everything else (configuration file parsing, visualization) is
//! left to callers.
//!
//! ```no_run
//! use ballsim::{SimConfig, Simulation};
//!
//! let config = SimConfig {
//!     ndim: 2,
//!     num_balls: 100,
//!     ball_radius: 0.45,
//!     domain_size: vec![50.0, 20.0],
//!     simulation_time: 10.0,
//!     gravity: true,
//!     output_rate: 0.1,
//!     output_dir: "runs/example_gravity_sim".into(),
//!     ..SimConfig::default()
//! };
//! let mut sim = Simulation::new(config)?;
//! sim.run()?;
//! # Ok::<(), ballsim::Error>(())
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use config::SimConfig;
pub use core::sim::Simulation;
pub use error::{Error, Result};
