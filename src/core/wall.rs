/// An axis-aligned wall plane.
///
/// `normal` is the inward-pointing normal sign along `axis`: `+1.0` when the
/// domain interior lies on the positive side of the plane, `-1.0` otherwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wall {
    /// Axis the wall is perpendicular to (0 = x, 1 = y, 2 = z).
    pub axis: usize,
    /// Plane coordinate along `axis`.
    pub offset: f64,
    /// Inward normal sign, +1.0 or -1.0.
    pub normal: f64,
    /// Coefficient of restitution for impacts on this wall.
    pub restitution: f64,
}

impl Wall {
    pub fn new(axis: usize, offset: f64, normal: f64, restitution: f64) -> Self {
        Self {
            axis,
            offset,
            normal,
            restitution,
        }
    }

    /// Signed distance from `point` to the wall plane, positive inside the
    /// domain.
    #[inline]
    pub fn signed_distance(&self, point: &[f64; 3]) -> f64 {
        self.normal * (point[self.axis] - self.offset)
    }
}

/// The `2 * ndim` walls of the simulation box, each inset from the domain
/// boundary. Min and max wall per axis, in axis order.
pub fn box_walls(ndim: usize, domain_size: &[f64], inset: f64, restitution: f64) -> Vec<Wall> {
    let mut walls = Vec::with_capacity(2 * ndim);
    for axis in 0..ndim {
        walls.push(Wall::new(axis, inset, 1.0, restitution));
        walls.push(Wall::new(axis, domain_size[axis] - inset, -1.0, restitution));
    }
    walls
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_walls_2d() {
        let walls = box_walls(2, &[6.0, 3.0], 0.01, 1.0);
        assert_eq!(walls.len(), 4);
        assert_relative_eq!(walls[0].offset, 0.01);
        assert_relative_eq!(walls[1].offset, 5.99);
        assert_relative_eq!(walls[3].offset, 2.99);
        assert_eq!(walls[2].axis, 1);
        assert_eq!(walls[0].normal, 1.0);
        assert_eq!(walls[1].normal, -1.0);
    }

    #[test]
    fn box_walls_3d_has_six() {
        let walls = box_walls(3, &[4.0, 4.0, 4.0], 0.01, 0.9);
        assert_eq!(walls.len(), 6);
        assert!(walls.iter().all(|w| w.restitution == 0.9));
    }

    #[test]
    fn signed_distance_positive_inside() {
        let wall = Wall::new(0, 0.01, 1.0, 1.0);
        assert!(wall.signed_distance(&[0.5, 0.0, 0.0]) > 0.0);
        assert!(wall.signed_distance(&[0.0, 0.0, 0.0]) < 0.0);
        let top = Wall::new(1, 2.99, -1.0, 1.0);
        assert!(top.signed_distance(&[0.0, 1.5, 0.0]) > 0.0);
        assert!(top.signed_distance(&[0.0, 3.0, 0.0]) < 0.0);
    }
}
