use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Edge length of a grid cell; fixes the length scale of a run.
pub const CELL_SIZE: f64 = 1.0;

/// Walls are inset this far from the domain boundary.
pub const WALL_INSET: f64 = 0.01;

/// Run configuration for a simulation.
///
/// All lengths are in units of the grid cell edge ([`CELL_SIZE`]); gravity,
/// when enabled, has unit magnitude along negative y in those scaled units.
/// The struct is serde-deserializable so callers can layer any file format on
/// top; the core itself only validates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Spatial dimension, 2 or 3.
    pub ndim: usize,
    /// Number of balls to place.
    pub num_balls: usize,
    /// Shared ball radius, in (0, 0.5] with diameter strictly below the cell size.
    pub ball_radius: f64,
    /// Domain edge lengths, one per dimension.
    pub domain_size: Vec<f64>,
    /// Absolute simulated time at which the run ends.
    pub simulation_time: f64,
    /// Uniform gravity g = (0, -1[, 0]) when enabled.
    pub gravity: bool,
    /// Ball-ball coefficient of restitution in (0, 1].
    pub ball_restitution: f64,
    /// Ball-wall coefficient of restitution in (0, 1].
    pub wall_restitution: f64,
    /// Interval between exported frames.
    pub output_rate: f64,
    /// Directory frame files are written into.
    pub output_dir: PathBuf,
    /// Seed for the velocity-drawing RNG.
    pub random_seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            ndim: 2,
            num_balls: 0,
            ball_radius: 0.25,
            domain_size: vec![10.0, 10.0],
            simulation_time: 10.0,
            gravity: false,
            ball_restitution: 1.0,
            wall_restitution: 1.0,
            output_rate: 1.0,
            output_dir: PathBuf::from("runs"),
            random_seed: 100,
        }
    }
}

impl SimConfig {
    /// Check every startup precondition, before any simulation state exists.
    pub fn validate(&self) -> Result<()> {
        if self.ndim != 2 && self.ndim != 3 {
            return Err(Error::Config(format!("ndim must be 2 or 3, got {}", self.ndim)));
        }
        if self.domain_size.len() != self.ndim {
            return Err(Error::Config(format!(
                "domain_size has {} entries for ndim={}",
                self.domain_size.len(),
                self.ndim
            )));
        }
        for (k, &size) in self.domain_size.iter().enumerate() {
            if !size.is_finite() || size <= 2.0 * WALL_INSET {
                return Err(Error::Config(format!(
                    "domain_size[{k}] = {size} must exceed twice the wall inset ({})",
                    2.0 * WALL_INSET
                )));
            }
        }
        if !self.ball_radius.is_finite() || self.ball_radius <= 0.0 {
            return Err(Error::Config(format!(
                "ball_radius must be positive, got {}",
                self.ball_radius
            )));
        }
        if self.ball_radius > 0.5 {
            return Err(Error::Config(format!(
                "ball_radius {} exceeds 0.5; cell-centered placement would overlap",
                self.ball_radius
            )));
        }
        if 2.0 * self.ball_radius >= CELL_SIZE {
            return Err(Error::Config(format!(
                "ball diameter {} must be smaller than the cell size {CELL_SIZE}",
                2.0 * self.ball_radius
            )));
        }
        if !self.simulation_time.is_finite() || self.simulation_time <= 0.0 {
            return Err(Error::Config(format!(
                "simulation_time must be positive, got {}",
                self.simulation_time
            )));
        }
        if !self.output_rate.is_finite() || self.output_rate <= 0.0 {
            return Err(Error::Config(format!(
                "output_rate must be positive, got {}",
                self.output_rate
            )));
        }
        for (name, e) in [
            ("ball_restitution", self.ball_restitution),
            ("wall_restitution", self.wall_restitution),
        ] {
            if !e.is_finite() || e <= 0.0 || e > 1.0 {
                return Err(Error::Config(format!("{name} must lie in (0, 1], got {e}")));
            }
        }
        let cells = self.interior_cells();
        if self.num_balls > cells {
            return Err(Error::Config(format!(
                "{} balls do not fit the {} interior cells of domain {:?}",
                self.num_balls, cells, self.domain_size
            )));
        }
        Ok(())
    }

    /// Number of whole cells the domain holds per axis, multiplied out.
    /// Placement assigns one ball per interior cell, so this caps `num_balls`.
    pub fn interior_cells(&self) -> usize {
        self.domain_size
            .iter()
            .map(|size| (size / CELL_SIZE).floor() as usize)
            .product()
    }
}
