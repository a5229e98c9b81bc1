use crate::core::ball::Ball;
use crate::core::event::{Event, EventKind};
use crate::core::grid::Grid;
use crate::core::physics::{ball_ball_collision_time, ball_wall_collision_time, grid_transit_time};
use crate::core::queue::EventQueue;
use crate::core::wall::Wall;
use crate::error::Result;
use std::rc::Rc;

/// Enumerate and enqueue every candidate event for ball `i`, freshly updated
/// at `now`: ball-ball against the 3^d neighborhood of its cell, ball-wall
/// per wall, and the next grid transit.
///
/// `seeding` restricts ball-ball partners to higher indices; initial seeding
/// visits every ball in order, so the restriction prevents duplicate (i, j) /
/// (j, i) pairs. After any collision or transit the full neighborhood is
/// used: the mirror event a partner may later create gets invalidated by
/// whichever state change comes first.
#[allow(clippy::too_many_arguments)]
pub fn events_for_ball(
    i: usize,
    balls: &mut [Ball],
    walls: &[Wall],
    grid: &Grid,
    queue: &mut EventQueue,
    now: f64,
    gravity: bool,
    seeding: bool,
) -> Result<()> {
    let partners = grid.neighbors(balls[i].cell);
    ball_ball_events(i, &partners, balls, queue, now, gravity, seeding)?;
    ball_wall_events(i, balls, walls, queue, now, gravity)?;
    transit_event(i, balls, grid, queue, now, gravity)
}

/// Enqueue ball-ball events between `i` and each listed partner.
pub fn ball_ball_events(
    i: usize,
    partners: &[u32],
    balls: &mut [Ball],
    queue: &mut EventQueue,
    now: f64,
    gravity: bool,
    only_higher: bool,
) -> Result<()> {
    for &j in partners {
        let j = j as usize;
        if j == i || (only_higher && j < i) {
            continue;
        }
        if let Some(t) = ball_ball_collision_time(&balls[i], &balls[j], now, gravity)? {
            let event = Rc::new(Event::new(
                t,
                EventKind::BallBall {
                    i: i as u32,
                    j: j as u32,
                },
            )?);
            queue.push(event.clone());
            balls[i].add_event(event.clone());
            balls[j].add_event(event);
        }
    }
    Ok(())
}

/// Enqueue the earliest hit per wall for ball `i`.
pub fn ball_wall_events(
    i: usize,
    balls: &mut [Ball],
    walls: &[Wall],
    queue: &mut EventQueue,
    now: f64,
    gravity: bool,
) -> Result<()> {
    for (w, wall) in walls.iter().enumerate() {
        if let Some(t) = ball_wall_collision_time(&balls[i], wall, now, gravity)? {
            let event = Rc::new(Event::new(
                t,
                EventKind::BallWall {
                    i: i as u32,
                    wall: w as u32,
                },
            )?);
            queue.push(event.clone());
            balls[i].add_event(event);
        }
    }
    Ok(())
}

/// Enqueue the next face crossing for ball `i`, when one exists. Every ball
/// with nonzero velocity (or under gravity) must own one pending transit, or
/// it would silently never leave its cell.
pub fn transit_event(
    i: usize,
    balls: &mut [Ball],
    grid: &Grid,
    queue: &mut EventQueue,
    now: f64,
    gravity: bool,
) -> Result<()> {
    if let Some((t, new_cell)) = grid_transit_time(&balls[i], now, grid.ndim(), gravity)? {
        let event = Rc::new(Event::new(
            t,
            EventKind::GridTransit {
                i: i as u32,
                new_cell,
            },
        )?);
        queue.push(event.clone());
        balls[i].add_event(event);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::wall::box_walls;

    fn setup() -> (Vec<Ball>, Vec<Wall>, Grid, EventQueue) {
        let mut grid = Grid::new(2, &[6.0, 3.0]);
        let balls = vec![
            Ball::new(0, [1.5, 1.5, 0.0], [1.0, 0.0, 0.0], 0.3, [1, 1, 0]),
            Ball::new(1, [2.5, 1.5, 0.0], [-1.0, 0.0, 0.0], 0.3, [2, 1, 0]),
        ];
        for b in &balls {
            grid.insert(b.index, b.cell).unwrap();
        }
        let walls = box_walls(2, &[6.0, 3.0], 0.01, 1.0);
        (balls, walls, grid, EventQueue::new())
    }

    #[test]
    fn generated_events_register_with_both_participants() {
        let (mut balls, walls, grid, mut queue) = setup();
        events_for_ball(0, &mut balls, &walls, &grid, &mut queue, 0.0, false, false).unwrap();
        // approaching neighbors: one BB event, visible from both owner sets
        let first = queue.pop_valid().unwrap();
        assert!(matches!(first.kind(), EventKind::BallBall { i: 0, j: 1 }));
        // invalidating ball 1 should have killed the pair event had it
        // still been pending
        let (mut balls, walls, grid, mut queue) = setup();
        events_for_ball(0, &mut balls, &walls, &grid, &mut queue, 0.0, false, false).unwrap();
        balls[1].invalidate_events();
        assert!(!matches!(
            queue.pop_valid().map(|e| e.kind()),
            Some(EventKind::BallBall { .. })
        ));
    }

    #[test]
    fn seeding_skips_lower_indexed_partners() {
        let (mut balls, walls, grid, mut queue) = setup();
        events_for_ball(1, &mut balls, &walls, &grid, &mut queue, 0.0, false, true).unwrap();
        while let Some(ev) = queue.pop_valid() {
            assert!(
                !matches!(ev.kind(), EventKind::BallBall { .. }),
                "seeding for the higher index must not duplicate the pair"
            );
        }
    }

    #[test]
    fn moving_ball_always_gets_a_transit() {
        let (mut balls, walls, grid, mut queue) = setup();
        events_for_ball(0, &mut balls, &walls, &grid, &mut queue, 0.0, false, false).unwrap();
        assert_eq!(balls[0].pending_transit_events(), 1);
    }

    #[test]
    fn wall_events_cover_approaching_walls_only() {
        let mut grid = Grid::new(2, &[6.0, 3.0]);
        let mut balls = vec![Ball::new(0, [1.5, 1.5, 0.0], [1.0, 0.5, 0.0], 0.3, [1, 1, 0])];
        grid.insert(0, [1, 1, 0]).unwrap();
        let walls = box_walls(2, &[6.0, 3.0], 0.01, 1.0);
        let mut queue = EventQueue::new();
        ball_wall_events(0, &mut balls, &walls, &mut queue, 0.0, false).unwrap();
        let mut hit_walls = Vec::new();
        while let Some(ev) = queue.pop_valid() {
            if let EventKind::BallWall { wall, .. } = ev.kind() {
                hit_walls.push(wall);
            }
        }
        // moving +x, +y: only the max walls (ids 1 and 3) are reachable
        hit_walls.sort_unstable();
        assert_eq!(hit_walls, vec![1, 3]);
    }
}
