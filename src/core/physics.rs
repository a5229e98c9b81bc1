use crate::config::CELL_SIZE;
use crate::core::ball::{Ball, GRAVITY_AXIS};
use crate::core::wall::Wall;
use crate::core::EPS_TIME;
use crate::error::{Error, Result};

/// Squared-distance deficit beyond which a ball pair counts as overlapping
/// rather than touching.
const OVERLAP_TOL: f64 = 1e-9;

#[inline]
fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Absolute time at which balls `a` and `b` first touch, if they are on a
/// collision course.
///
/// Both states are evaluated at the common reference time `now`; since both
/// balls feel the same gravity, the relative motion from there is linear and
/// `|dx + dv*tau|^2 = (r_a + r_b)^2` is a quadratic in `tau`. Requires
/// approach (`dx . dv < 0`) and takes the smaller root. A pair already
/// overlapping beyond tolerance is an invariant breach, reported, never
/// scheduled.
pub fn ball_ball_collision_time(
    a: &Ball,
    b: &Ball,
    now: f64,
    gravity: bool,
) -> Result<Option<f64>> {
    let (pa, va) = a.state_at(now, gravity)?;
    let (pb, vb) = b.state_at(now, gravity)?;

    let mut dx = [0.0; 3];
    let mut dv = [0.0; 3];
    for k in 0..3 {
        dx[k] = pb[k] - pa[k];
        dv[k] = vb[k] - va[k];
    }

    let qb = 2.0 * dot(&dx, &dv);
    if qb >= 0.0 {
        return Ok(None); // separating or tangent
    }
    let qa = dot(&dv, &dv);
    if qa <= EPS_TIME {
        return Ok(None);
    }
    let touch = a.radius + b.radius;
    let qc = dot(&dx, &dx) - touch * touch;
    if qc < -OVERLAP_TOL {
        return Err(Error::Overlap {
            i: a.index,
            j: b.index,
            time: now,
        });
    }
    if qc <= 0.0 {
        return Ok(None); // touching within tolerance
    }

    let disc = qb * qb - 4.0 * qa * qc;
    if disc <= 0.0 {
        return Ok(None);
    }
    let tau = (-qb - disc.sqrt()) / (2.0 * qa);
    if tau <= EPS_TIME {
        return Ok(None);
    }
    let t = now + tau;
    if !t.is_finite() {
        return Err(Error::Numerics(format!(
            "non-finite collision time for balls {} and {}",
            a.index, b.index
        )));
    }
    Ok(Some(t))
}

/// Earliest absolute time after `now` at which `ball` touches `wall`, if any.
///
/// Linear along non-gravity axes; quadratic along the gravity axis when
/// gravity is on (the ball can hit the same wall on the way back down).
pub fn ball_wall_collision_time(
    ball: &Ball,
    wall: &Wall,
    now: f64,
    gravity: bool,
) -> Result<Option<f64>> {
    let (pos, vel) = ball.state_at(now, gravity)?;
    let k = wall.axis;
    // contact coordinate of the center, on whichever side it currently is
    let contact = if pos[k] < wall.offset {
        wall.offset - ball.radius
    } else {
        wall.offset + ball.radius
    };
    let under_gravity = gravity && k == GRAVITY_AXIS;
    let tau = crossing_time(pos[k], vel[k], contact, -wall.normal, under_gravity);
    Ok(tau.map(|tau| now + tau))
}

/// Earliest face crossing of `ball`'s current cell after `now`, and the cell
/// it moves into. Crossing is by the ball center.
pub fn grid_transit_time(
    ball: &Ball,
    now: f64,
    ndim: usize,
    gravity: bool,
) -> Result<Option<(f64, [i32; 3])>> {
    let (pos, vel) = ball.state_at(now, gravity)?;
    let mut best: Option<(f64, [i32; 3])> = None;
    for axis in 0..ndim {
        let lower = ball.cell[axis] as f64 * CELL_SIZE;
        let under_gravity = gravity && axis == GRAVITY_AXIS;
        for (face, step) in [(lower, -1i32), (lower + CELL_SIZE, 1)] {
            let outward = step as f64;
            if let Some(tau) = crossing_time(pos[axis], vel[axis], face, outward, under_gravity) {
                if best.map_or(true, |(t, _)| tau < t) {
                    let mut new_cell = ball.cell;
                    new_cell[axis] += step;
                    best = Some((tau, new_cell));
                }
            }
        }
    }
    Ok(best.map(|(tau, cell)| (now + tau, cell)))
}

/// Relative time at which coordinate `x` with velocity `v` reaches `plane`,
/// strictly in the future.
///
/// `outward` is the sign of motion that counts as leaving through the plane.
/// A coordinate sitting exactly on the plane and moving outward crosses
/// *now*: the zero root is clamped rather than letting a just-transited or
/// just-spawned-on-a-face state schedule an event in the past.
fn crossing_time(x: f64, v: f64, plane: f64, outward: f64, under_gravity: bool) -> Option<f64> {
    if (x - plane).abs() <= EPS_TIME && v * outward > EPS_TIME {
        return Some(0.0);
    }
    if under_gravity {
        // x + v*tau - tau^2/2 = plane
        smallest_positive_root(-0.5, v, x - plane)
    } else if v.abs() > EPS_TIME {
        let tau = (plane - x) / v;
        (tau > EPS_TIME).then_some(tau)
    } else {
        None
    }
}

/// Smallest root of `a*t^2 + b*t + c = 0` strictly greater than [`EPS_TIME`].
fn smallest_positive_root(a: f64, b: f64, c: f64) -> Option<f64> {
    let disc = b * b - 4.0 * a * c;
    if disc < 0.0 {
        return None;
    }
    let sq = disc.sqrt();
    let r1 = (-b - sq) / (2.0 * a);
    let r2 = (-b + sq) / (2.0 * a);
    let (lo, hi) = if r1 <= r2 { (r1, r2) } else { (r2, r1) };
    if lo > EPS_TIME {
        Some(lo)
    } else if hi > EPS_TIME {
        Some(hi)
    } else {
        None
    }
}

/// Impulse exchange between two touching balls of equal unit mass.
///
/// With restitution `e`, the impulse along the contact normal is
/// `(1 + e) * (dv . n) / 2`; momentum is conserved exactly and kinetic
/// energy is conserved for `e = 1`. A separating pair is left untouched.
pub fn resolve_ball_ball(a: &mut Ball, b: &mut Ball, restitution: f64) -> Result<()> {
    let mut n = [0.0; 3];
    for k in 0..3 {
        n[k] = b.pos[k] - a.pos[k];
    }
    let dist_sq = dot(&n, &n);
    if dist_sq <= EPS_TIME {
        return Err(Error::Numerics(format!(
            "degenerate contact normal between balls {} and {}",
            a.index, b.index
        )));
    }
    let dist = dist_sq.sqrt();
    for nk in &mut n {
        *nk /= dist;
    }

    let mut dv = [0.0; 3];
    for k in 0..3 {
        dv[k] = b.vel[k] - a.vel[k];
    }
    let vn = dot(&dv, &n);
    if vn >= 0.0 {
        return Ok(()); // already separating
    }

    let impulse = (1.0 + restitution) * vn / 2.0;
    for k in 0..3 {
        a.vel[k] += impulse * n[k];
        b.vel[k] -= impulse * n[k];
    }
    Ok(())
}

/// Reflect the wall-normal velocity component, scaled by the wall's
/// restitution. A ball already moving away is left untouched.
pub fn resolve_ball_wall(ball: &mut Ball, wall: &Wall) {
    let k = wall.axis;
    if ball.vel[k] * wall.normal < 0.0 {
        ball.vel[k] = -wall.restitution * ball.vel[k];
    }
}
