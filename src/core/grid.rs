use crate::config::CELL_SIZE;
use crate::error::{Error, Result};

/// Uniform spatial grid over the domain, cell edge [`CELL_SIZE`].
///
/// Each cell holds the indices of the balls whose centers lie in it. Because
/// the ball diameter is strictly below the cell edge, two balls can only
/// collide while they occupy the same or adjacent cells, so the 3^d block
/// around a ball's cell bounds its candidate partners.
///
/// Cell membership lives in a `Vec` per cell: contents are unique by
/// construction, and iteration order stays deterministic, which the queue's
/// insertion-order tie-break relies on for reproducible runs.
#[derive(Debug)]
pub struct Grid {
    ndim: usize,
    num_cells: [i32; 3],
    cells: Vec<Vec<u32>>,
}

impl Grid {
    pub fn new(ndim: usize, domain_size: &[f64]) -> Self {
        let mut num_cells = [1i32; 3];
        for (k, &size) in domain_size.iter().enumerate().take(ndim) {
            num_cells[k] = (size / CELL_SIZE).ceil().max(1.0) as i32;
        }
        let total = (num_cells[0] * num_cells[1] * num_cells[2]) as usize;
        Self {
            ndim,
            num_cells,
            cells: vec![Vec::new(); total],
        }
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    pub fn num_cells(&self) -> [i32; 3] {
        self.num_cells
    }

    /// Whether `cell` lies inside the grid.
    pub fn contains(&self, cell: [i32; 3]) -> bool {
        (0..3).all(|k| cell[k] >= 0 && cell[k] < self.num_cells[k])
    }

    /// Cell containing `pos`, clamped to the grid bounds.
    pub fn cell_of(&self, pos: &[f64; 3]) -> [i32; 3] {
        let mut cell = [0i32; 3];
        for k in 0..self.ndim {
            cell[k] = ((pos[k] / CELL_SIZE).floor() as i32).clamp(0, self.num_cells[k] - 1);
        }
        cell
    }

    #[inline]
    fn slot(&self, cell: [i32; 3]) -> usize {
        ((cell[2] * self.num_cells[1] + cell[1]) * self.num_cells[0] + cell[0]) as usize
    }

    pub fn insert(&mut self, ball: u32, cell: [i32; 3]) -> Result<()> {
        if !self.contains(cell) {
            return Err(Error::Invariant(format!(
                "insert of ball {ball} into out-of-bounds cell {cell:?}"
            )));
        }
        let slot = self.slot(cell);
        self.cells[slot].push(ball);
        Ok(())
    }

    pub fn remove(&mut self, ball: u32, cell: [i32; 3]) -> Result<()> {
        if !self.contains(cell) {
            return Err(Error::Invariant(format!(
                "remove of ball {ball} from out-of-bounds cell {cell:?}"
            )));
        }
        let slot = self.slot(cell);
        match self.cells[slot].iter().position(|&b| b == ball) {
            Some(at) => {
                self.cells[slot].swap_remove(at);
                Ok(())
            }
            None => Err(Error::Invariant(format!(
                "ball {ball} not registered in cell {cell:?}"
            ))),
        }
    }

    /// Ball indices in the 3^d block centered on `cell`, clipped to the grid
    /// bounds. Includes the center cell (and therefore the querying ball).
    pub fn neighbors(&self, cell: [i32; 3]) -> Vec<u32> {
        let mut out = Vec::new();
        self.extend_block(&mut out, |k| {
            if k < self.ndim {
                (cell[k] - 1, cell[k] + 1)
            } else {
                (0, 0)
            }
        });
        out
    }

    /// Ball indices in the cells that became adjacent when a ball moved
    /// `old -> new`: the face layer one step beyond `new` along each moved
    /// axis. Everything else was already in the old neighborhood.
    pub fn entering_neighbors(&self, old: [i32; 3], new: [i32; 3]) -> Vec<u32> {
        let mut out = Vec::new();
        for axis in 0..self.ndim {
            let step = new[axis] - old[axis];
            if step == 0 {
                continue;
            }
            let lead = new[axis] + step;
            self.extend_block(&mut out, |k| {
                if k == axis {
                    (lead, lead)
                } else if k < self.ndim {
                    (new[k] - 1, new[k] + 1)
                } else {
                    (0, 0)
                }
            });
        }
        out
    }

    fn extend_block(&self, out: &mut Vec<u32>, range: impl Fn(usize) -> (i32, i32)) {
        let (x0, x1) = range(0);
        let (y0, y1) = range(1);
        let (z0, z1) = range(2);
        for z in z0..=z1 {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let cell = [x, y, z];
                    if self.contains(cell) {
                        out.extend_from_slice(&self.cells[self.slot(cell)]);
                    }
                }
            }
        }
    }
}
