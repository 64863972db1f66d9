use std::collections::VecDeque;
use std::fmt;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// A square cell of the spawn grid, addressed by integer coordinates on
/// the x/z plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCell {
    /// Column along x.
    pub x: i32,
    /// Row along z.
    pub z: i32,
}

impl GridCell {
    /// Cell at `(x, z)`.
    pub const fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// The cell a position falls in. Rounds toward negative infinity, so
    /// cells are the same size on both sides of the origin.
    pub fn containing(position: Vec3, cell_size: f32) -> Self {
        Self {
            x: (position.x / cell_size).floor() as i32,
            z: (position.z / cell_size).floor() as i32,
        }
    }

    /// World position of the cell's minimum corner.
    pub fn origin(self, cell_size: f32) -> Vec3 {
        Vec3::new(self.x as f32 * cell_size, 0.0, self.z as f32 * cell_size)
    }

    /// Neighbouring cell by offset. Clamps at the edge of the grid.
    pub fn offset(self, dx: i32, dz: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.z.saturating_add(dz))
    }

    /// All cells within `radius` cells in both directions, edges included.
    /// Near the edge of the grid clamped cells repeat.
    pub fn window(self, radius: i32) -> impl Iterator<Item = GridCell> {
        (-radius..=radius).flat_map(move |dx| (-radius..=radius).map(move |dz| self.offset(dx, dz)))
    }
}

impl fmt::Display for GridCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.z)
    }
}

/// Rectangle outside of which tracked entities are despawned.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DespawnWindow {
    /// Minimum corner.
    pub min: Vec3,
    /// Maximum corner.
    pub max: Vec3,
}

impl DespawnWindow {
    /// The scan window around `center`, extended to the far edges of its
    /// outermost cells.
    pub fn around(center: GridCell, radius: i32, cell_size: f32) -> Self {
        let min = center.offset(-radius, -radius).origin(cell_size);
        let max = center.offset(radius, radius).offset(1, 1).origin(cell_size);
        Self { min, max }
    }

    /// Inclusive on every edge.
    pub fn contains(&self, position: Vec3) -> bool {
        position.x >= self.min.x
            && position.x <= self.max.x
            && position.z >= self.min.z
            && position.z <= self.max.z
    }
}

/// Cells that already had a spawn event. Bounded; the oldest cell is
/// forgotten once the capacity is exceeded.
#[derive(Debug, Clone)]
pub struct VisitedCells {
    cells: VecDeque<GridCell>,
    capacity: usize,
}

impl VisitedCells {
    /// Remember at most `capacity` cells.
    pub fn new(capacity: usize) -> Self {
        Self {
            cells: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// True if the cell is remembered.
    pub fn contains(&self, cell: GridCell) -> bool {
        self.cells.contains(&cell)
    }

    /// Remember a cell. Returns false if it was already remembered.
    pub fn insert(&mut self, cell: GridCell) -> bool {
        if self.contains(cell) {
            return false;
        }
        self.cells.push_back(cell);
        while self.cells.len() > self.capacity {
            self.cells.pop_front();
        }
        true
    }

    /// Cells remembered.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True when nothing is remembered.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Most cells kept at once.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &GridCell> {
        self.cells.iter()
    }

    /// Forget every cell.
    pub fn clear(&mut self) {
        self.cells.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_uses_floor_division() {
        assert_eq!(GridCell::containing(Vec3::new(5.0, 0.0, 15.0), 10.0), GridCell::new(0, 1));
        assert_eq!(
            GridCell::containing(Vec3::new(-0.5, 0.0, -10.0), 10.0),
            GridCell::new(-1, -1)
        );
        assert_eq!(GridCell::containing(Vec3::new(10.0, 3.0, 0.0), 10.0), GridCell::new(1, 0));
    }

    #[test]
    fn window_is_inclusive() {
        let cells: Vec<GridCell> = GridCell::new(2, -1).window(1).collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.contains(&GridCell::new(1, -2)));
        assert!(cells.contains(&GridCell::new(3, 0)));
        assert!(!cells.contains(&GridCell::new(4, 0)));
        assert_eq!(GridCell::new(0, 0).window(0).count(), 1);
    }

    #[test]
    fn despawn_window_edges_are_inside() {
        let window = DespawnWindow::around(GridCell::new(0, 0), 1, 10.0);
        assert!(window.contains(Vec3::new(-10.0, 0.0, 20.0)));
        assert!(window.contains(Vec3::new(20.0, 0.0, -10.0)));
        assert!(!window.contains(Vec3::new(20.1, 0.0, 0.0)));
        assert!(!window.contains(Vec3::new(0.0, 0.0, -10.1)));
    }

    #[test]
    fn far_positions_clamp_to_the_grid_edge() {
        let far = GridCell::containing(Vec3::new(1.0e12, 0.0, -1.0e12), 150.0);
        assert_eq!(far, GridCell::new(i32::MAX, i32::MIN));

        let cells: Vec<GridCell> = far.window(1).collect();
        assert_eq!(cells.len(), 9);
        assert!(cells.iter().all(|c| c.x >= i32::MAX - 1 && c.z <= i32::MIN + 1));

        let window = DespawnWindow::around(far, 1, 150.0);
        assert!(window.min.x <= window.max.x);
        assert!(window.min.z <= window.max.z);
    }

    #[test]
    fn visited_cells_evict_oldest() {
        let mut visited = VisitedCells::new(2);
        assert!(visited.insert(GridCell::new(0, 0)));
        assert!(!visited.insert(GridCell::new(0, 0)));
        visited.insert(GridCell::new(1, 0));
        visited.insert(GridCell::new(2, 0));
        assert_eq!(visited.len(), 2);
        assert!(!visited.contains(GridCell::new(0, 0)));
        assert_eq!(
            visited.iter().copied().collect::<Vec<_>>(),
            vec![GridCell::new(1, 0), GridCell::new(2, 0)]
        );
    }
}
