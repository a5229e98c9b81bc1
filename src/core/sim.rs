use crate::config::{SimConfig, CELL_SIZE, WALL_INSET};
use crate::core::ball::Ball;
use crate::core::event::{Event, EventKind};
use crate::core::generate::{ball_ball_events, events_for_ball, transit_event};
use crate::core::grid::Grid;
use crate::core::output::FrameWriter;
use crate::core::physics::{resolve_ball_ball, resolve_ball_wall};
use crate::core::queue::EventQueue;
use crate::core::wall::{box_walls, Wall};
use crate::core::EPS_TIME;
use crate::error::{Error, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::rc::Rc;
use tracing::{debug, info, trace};

/// One processed event, as reported by [`Simulation::step`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Processed {
    pub time: f64,
    pub kind: EventKind,
}

/// The event-driven simulation: ball store, walls, grid, event queue and
/// the dispatch loop that ties them together.
///
/// Construction places the balls and draws velocities; [`Simulation::run`]
/// (or the first [`Simulation::step`]) seeds the queue and processes events
/// until the end marker fires.
#[derive(Debug)]
pub struct Simulation {
    config: SimConfig,
    balls: Vec<Ball>,
    walls: Vec<Wall>,
    grid: Grid,
    queue: EventQueue,
    writer: FrameWriter,
    time_now: f64,
    events_processed: u64,
    seeded: bool,
    finished: bool,
}

impl Simulation {
    /// Validate the configuration and build the initial state.
    ///
    /// Balls are placed at the centers of distinct interior cells in
    /// row-major order (x fastest); with the ball diameter strictly below
    /// the cell edge this cannot overlap. Velocity components are i.i.d.
    /// standard normal draws from a ChaCha8 generator seeded with
    /// `random_seed`, so a run is reproducible from its configuration alone.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;

        let walls = box_walls(
            config.ndim,
            &config.domain_size,
            WALL_INSET,
            config.wall_restitution,
        );
        let mut grid = Grid::new(config.ndim, &config.domain_size);
        let mut rng = ChaCha8Rng::seed_from_u64(config.random_seed);

        let mut per_axis = [1usize; 3];
        for (k, &size) in config.domain_size.iter().enumerate() {
            per_axis[k] = (size / CELL_SIZE).floor() as usize;
        }

        let mut balls = Vec::with_capacity(config.num_balls);
        for i in 0..config.num_balls {
            let cell = [
                (i % per_axis[0]) as i32,
                ((i / per_axis[0]) % per_axis[1]) as i32,
                (i / (per_axis[0] * per_axis[1])) as i32,
            ];
            let mut pos = [0.0; 3];
            for k in 0..config.ndim {
                pos[k] = (cell[k] as f64 + 0.5) * CELL_SIZE;
            }
            let mut vel = [0.0; 3];
            for v in vel.iter_mut().take(config.ndim) {
                *v = rng.sample(StandardNormal);
            }
            grid.insert(i as u32, cell)?;
            balls.push(Ball::new(i as u32, pos, vel, config.ball_radius, cell));
        }

        let writer = FrameWriter::new(&config.output_dir)?;
        Ok(Self {
            config,
            balls,
            walls,
            grid,
            queue: EventQueue::new(),
            writer,
            time_now: 0.0,
            events_processed: 0,
            seeded: false,
            finished: false,
        })
    }

    /// Current simulated time: the time of the last processed event.
    pub fn time(&self) -> f64 {
        self.time_now
    }

    pub fn balls(&self) -> &[Ball] {
        &self.balls
    }

    pub fn walls(&self) -> &[Wall] {
        &self.walls
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn events_processed(&self) -> u64 {
        self.events_processed
    }

    /// Frames exported so far.
    pub fn frames_written(&self) -> u32 {
        self.writer.frames_written()
    }

    /// Total kinetic energy (diagnostic; unit masses).
    pub fn kinetic_energy(&self) -> f64 {
        self.balls.iter().map(|b| b.kinetic_energy()).sum()
    }

    /// Overwrite a ball's position and velocity before the run starts,
    /// re-deriving its grid cell. Intended for prepared initial conditions;
    /// once events are seeded the stored predictions would go stale, so this
    /// refuses to run after seeding.
    pub fn set_state(&mut self, i: usize, pos: [f64; 3], vel: [f64; 3]) -> Result<()> {
        if self.seeded {
            return Err(Error::Invariant(
                "cannot overwrite ball state after event seeding".into(),
            ));
        }
        if i >= self.balls.len() {
            return Err(Error::Config(format!(
                "ball index {i} out of range ({} balls)",
                self.balls.len()
            )));
        }
        if !pos.iter().chain(vel.iter()).all(|c| c.is_finite()) {
            return Err(Error::Config("ball state must be finite".into()));
        }
        let new_cell = self.grid.cell_of(&pos);
        let old_cell = self.balls[i].cell;
        if new_cell != old_cell {
            self.grid.remove(i as u32, old_cell)?;
            self.grid.insert(i as u32, new_cell)?;
        }
        let ball = &mut self.balls[i];
        ball.pos = pos;
        ball.vel = vel;
        ball.cell = new_cell;
        Ok(())
    }

    /// Seed the queue: per-ball candidate events in index order (partners
    /// restricted to higher indices to avoid duplicate pairs), the export
    /// cadence, and the end marker. Idempotent.
    pub fn seed_events(&mut self) -> Result<()> {
        if self.seeded {
            return Ok(());
        }
        debug!(balls = self.balls.len(), "seeding initial events");
        for i in 0..self.balls.len() {
            events_for_ball(
                i,
                &mut self.balls,
                &self.walls,
                &self.grid,
                &mut self.queue,
                0.0,
                self.config.gravity,
                true,
            )?;
        }
        let mut k = 0u64;
        loop {
            let t = k as f64 * self.config.output_rate;
            if t > self.config.simulation_time {
                break;
            }
            self.queue.push(Rc::new(Event::new(t, EventKind::Export)?));
            k += 1;
        }
        self.queue.push(Rc::new(Event::new(
            self.config.simulation_time,
            EventKind::End,
        )?));
        self.seeded = true;
        debug!(queued = self.queue.len(), "queue seeded");
        Ok(())
    }

    /// Pop and process the next pending event. Returns `None` once the end
    /// marker has fired or the queue is exhausted.
    pub fn step(&mut self) -> Result<Option<Processed>> {
        self.seed_events()?;
        if self.finished {
            return Ok(None);
        }
        let Some(event) = self.queue.pop_valid() else {
            self.finished = true;
            return Ok(None);
        };

        let t = event.time();
        if t < self.time_now - EPS_TIME {
            return Err(Error::Invariant(format!(
                "event at t={t} popped after time already reached {}",
                self.time_now
            )));
        }
        self.time_now = self.time_now.max(t);
        self.events_processed += 1;
        if self.events_processed % 1000 == 0 {
            debug!(
                events = self.events_processed,
                time = self.time_now,
                queued = self.queue.len(),
                "processing"
            );
        }

        let kind = event.kind();
        trace!(time = t, kind = ?kind, "dispatch");
        match kind {
            EventKind::BallBall { i, j } => self.on_ball_ball(i as usize, j as usize, t)?,
            EventKind::BallWall { i, wall } => self.on_ball_wall(i as usize, wall as usize, t)?,
            EventKind::GridTransit { i, new_cell } => self.on_transit(i as usize, new_cell, t)?,
            EventKind::Export => self.on_export(t)?,
            EventKind::End => self.finished = true,
        }
        Ok(Some(Processed { time: t, kind }))
    }

    /// Run the event loop to completion.
    pub fn run(&mut self) -> Result<()> {
        self.seed_events()?;
        info!(
            balls = self.balls.len(),
            ndim = self.config.ndim,
            simulation_time = self.config.simulation_time,
            gravity = self.config.gravity,
            "starting run"
        );
        while self.step()?.is_some() {}
        info!(
            events = self.events_processed,
            final_time = self.time_now,
            frames = self.writer.frames_written(),
            "run complete"
        );
        Ok(())
    }

    // ============ Event handlers ============

    fn on_ball_ball(&mut self, i: usize, j: usize, t: f64) -> Result<()> {
        let gravity = self.config.gravity;
        {
            let (a, b) = pair_mut(&mut self.balls, i, j);
            a.advance_to(t, gravity)?;
            b.advance_to(t, gravity)?;
            resolve_ball_ball(a, b, self.config.ball_restitution)?;
            a.invalidate_events();
            b.invalidate_events();
        }
        for ball in [i, j] {
            events_for_ball(
                ball,
                &mut self.balls,
                &self.walls,
                &self.grid,
                &mut self.queue,
                t,
                gravity,
                false,
            )?;
        }
        Ok(())
    }

    fn on_ball_wall(&mut self, i: usize, w: usize, t: f64) -> Result<()> {
        let gravity = self.config.gravity;
        {
            let ball = &mut self.balls[i];
            ball.advance_to(t, gravity)?;
            resolve_ball_wall(ball, &self.walls[w]);
            ball.invalidate_events();
        }
        events_for_ball(
            i,
            &mut self.balls,
            &self.walls,
            &self.grid,
            &mut self.queue,
            t,
            gravity,
            false,
        )
    }

    fn on_transit(&mut self, i: usize, new_cell: [i32; 3], t: f64) -> Result<()> {
        if !self.grid.contains(new_cell) {
            return Err(Error::Invariant(format!(
                "ball {i} transit into out-of-bounds cell {new_cell:?} at t={t}"
            )));
        }
        let gravity = self.config.gravity;
        let old_cell = self.balls[i].cell;
        {
            let ball = &mut self.balls[i];
            ball.advance_to(t, gravity)?;
            ball.cell = new_cell;
        }
        self.grid.remove(i as u32, old_cell)?;
        self.grid.insert(i as u32, new_cell)?;

        // velocity is continuous across a transit, so pending events stay
        // correct; only partners in the newly adjacent cells and the next
        // face crossing are missing
        let entering = self.grid.entering_neighbors(old_cell, new_cell);
        ball_ball_events(
            i,
            &entering,
            &mut self.balls,
            &mut self.queue,
            t,
            gravity,
            false,
        )?;
        transit_event(i, &mut self.balls, &self.grid, &mut self.queue, t, gravity)
    }

    fn on_export(&mut self, t: f64) -> Result<()> {
        let path = self
            .writer
            .write_frame(t, &self.balls, self.config.ndim, self.config.gravity)?;
        trace!(time = t, path = %path.display(), "frame written");
        Ok(())
    }
}

/// Distinct mutable borrows of two slice entries.
fn pair_mut(balls: &mut [Ball], i: usize, j: usize) -> (&mut Ball, &mut Ball) {
    debug_assert_ne!(i, j);
    if i < j {
        let (lo, hi) = balls.split_at_mut(j);
        (&mut lo[i], &mut hi[0])
    } else {
        let (lo, hi) = balls.split_at_mut(i);
        (&mut hi[0], &mut lo[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::path::PathBuf;

    fn scratch_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("ballsim-sim-{}-{name}", std::process::id()))
    }

    fn config(name: &str) -> SimConfig {
        SimConfig {
            ndim: 2,
            num_balls: 4,
            ball_radius: 0.3,
            domain_size: vec![6.0, 3.0],
            simulation_time: 2.0,
            output_dir: scratch_dir(name),
            ..SimConfig::default()
        }
    }

    #[test]
    fn placement_is_row_major_cell_centers() {
        let sim = Simulation::new(SimConfig {
            num_balls: 8,
            ..config("placement")
        })
        .unwrap();
        assert_eq!(sim.balls()[0].pos, [0.5, 0.5, 0.0]);
        assert_eq!(sim.balls()[5].pos, [5.5, 0.5, 0.0]);
        // 6 interior cells per row: index 6 wraps to the second row
        assert_eq!(sim.balls()[6].pos, [0.5, 1.5, 0.0]);
        assert_eq!(sim.balls()[6].cell, [0, 1, 0]);
    }

    #[test]
    fn same_seed_same_velocities() {
        let a = Simulation::new(config("seed-a")).unwrap();
        let b = Simulation::new(config("seed-b")).unwrap();
        for (x, y) in a.balls().iter().zip(b.balls()) {
            assert_eq!(x.vel, y.vel);
        }
        let c = Simulation::new(SimConfig {
            random_seed: 7,
            ..config("seed-c")
        })
        .unwrap();
        assert_ne!(a.balls()[0].vel, c.balls()[0].vel);
    }

    #[test]
    fn zero_balls_still_runs_and_exports() {
        let mut sim = Simulation::new(SimConfig {
            num_balls: 0,
            ..config("empty")
        })
        .unwrap();
        sim.run().unwrap();
        assert_eq!(sim.frames_written(), 3); // t = 0, 1, 2
        assert_relative_eq!(sim.time(), 2.0);
    }

    #[test]
    fn set_state_rederives_the_cell() {
        let mut sim = Simulation::new(config("set-state")).unwrap();
        sim.set_state(0, [4.5, 2.5, 0.0], [0.0, -1.0, 0.0]).unwrap();
        assert_eq!(sim.balls()[0].cell, [4, 2, 0]);
        sim.seed_events().unwrap();
        assert!(sim.set_state(0, [1.5, 1.5, 0.0], [0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn events_pop_in_nondecreasing_time_order() {
        let mut sim = Simulation::new(SimConfig {
            num_balls: 12,
            domain_size: vec![4.0, 4.0],
            simulation_time: 3.0,
            ..config("monotone")
        })
        .unwrap();
        let mut last = 0.0;
        while let Some(p) = sim.step().unwrap() {
            assert!(
                p.time >= last - 1e-12,
                "event at {} after time reached {}",
                p.time,
                last
            );
            last = last.max(p.time);
        }
        assert_relative_eq!(sim.time(), 3.0);
    }

    #[test]
    fn end_event_stops_the_loop() {
        let mut sim = Simulation::new(config("end")).unwrap();
        let mut saw_end = false;
        while let Some(p) = sim.step().unwrap() {
            assert!(!saw_end, "no event may follow the end marker");
            saw_end = matches!(p.kind, EventKind::End);
        }
        assert!(saw_end);
    }

    #[test]
    fn moving_balls_own_exactly_one_transit_after_any_event() {
        let mut sim = Simulation::new(SimConfig {
            num_balls: 6,
            domain_size: vec![3.0, 3.0],
            simulation_time: 4.0,
            ..config("transit-hygiene")
        })
        .unwrap();
        while let Some(p) = sim.step().unwrap() {
            if matches!(p.kind, EventKind::Export | EventKind::End) {
                continue;
            }
            for ball in sim.balls() {
                let moving = ball.vel.iter().any(|&v| v != 0.0);
                if moving {
                    assert_eq!(
                        ball.pending_transit_events(),
                        1,
                        "ball {} after {:?}",
                        ball.index,
                        p.kind
                    );
                }
            }
        }
    }

    #[test]
    fn pair_mut_returns_both_orders() {
        let mut balls = vec![
            Ball::new(0, [0.5; 3], [0.0; 3], 0.1, [0, 0, 0]),
            Ball::new(1, [1.5; 3], [0.0; 3], 0.1, [1, 1, 1]),
        ];
        let (a, b) = pair_mut(&mut balls, 1, 0);
        assert_eq!(a.index, 1);
        assert_eq!(b.index, 0);
    }
}
