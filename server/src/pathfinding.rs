//! A* routing over a blocked/free grid overlay of the arena.
//!
//! The grid is built once from the obstacle layout and never patched; a new
//! layout means a new `Pathfinder`. Queries allocate their own search state,
//! so one grid can serve any number of calls.

use crate::arena::Rect;
use crate::geometry::Vec2;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

/// 4 orthogonal then 4 diagonal neighbours.
const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, 0),
    (1, 0),
    (0, -1),
    (0, 1),
    (-1, -1),
    (-1, 1),
    (1, -1),
    (1, 1),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub fn new(col: i32, row: i32) -> Self {
        Cell { col, row }
    }

    fn manhattan(&self, other: &Cell) -> f64 {
        ((self.col - other.col).abs() + (self.row - other.row).abs()) as f64
    }

    fn step_cost(&self, other: &Cell) -> f64 {
        let dc = (self.col - other.col) as f64;
        let dr = (self.row - other.row) as f64;
        dc.hypot(dr)
    }
}

/// Open-set entry. Ordered so the max-heap pops the lowest `f` first and,
/// among equal `f`, the entry pushed earliest.
#[derive(Debug, Clone, Copy)]
struct OpenNode {
    f: f64,
    order: u64,
    cell: Cell,
}

impl PartialEq for OpenNode {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenNode {}

impl PartialOrd for OpenNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenNode {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.order.cmp(&self.order))
    }
}

#[derive(Debug, Clone)]
pub struct Pathfinder {
    cell_size: i32,
    cols: i32,
    rows: i32,
    blocked: Vec<bool>,
}

impl Pathfinder {
    /// Creates an all-free grid covering `width` x `height`.
    pub fn new(width: i32, height: i32, cell_size: i32) -> Self {
        let cols = (width + cell_size - 1) / cell_size;
        let rows = (height + cell_size - 1) / cell_size;
        Self {
            cell_size,
            cols,
            rows,
            blocked: vec![false; (cols * rows) as usize],
        }
    }

    /// Builds the grid for an obstacle layout: a cell is blocked iff it
    /// intersects at least one rectangle.
    pub fn from_obstacles(width: i32, height: i32, cell_size: i32, obstacles: &[Rect]) -> Self {
        let mut grid = Self::new(width, height, cell_size);
        for rect in obstacles {
            grid.block_rect(rect);
        }
        grid
    }

    fn block_rect(&mut self, rect: &Rect) {
        if rect.w <= 0 || rect.h <= 0 {
            return;
        }
        let left = rect.x.div_euclid(self.cell_size).max(0);
        let right = (rect.right() - 1).div_euclid(self.cell_size).min(self.cols - 1);
        let top = rect.y.div_euclid(self.cell_size).max(0);
        let bottom = (rect.bottom() - 1).div_euclid(self.cell_size).min(self.rows - 1);

        for col in left..=right {
            for row in top..=bottom {
                let index = self.index(Cell::new(col, row));
                self.blocked[index] = true;
            }
        }
    }

    pub fn dimensions(&self) -> (i32, i32) {
        (self.cols, self.rows)
    }

    fn index(&self, cell: Cell) -> usize {
        (cell.row * self.cols + cell.col) as usize
    }

    fn in_bounds(&self, cell: Cell) -> bool {
        (0..self.cols).contains(&cell.col) && (0..self.rows).contains(&cell.row)
    }

    pub fn is_blocked(&self, cell: Cell) -> bool {
        !self.in_bounds(cell) || self.blocked[self.index(cell)]
    }

    /// Maps a world point to its cell, clamping points outside the grid onto
    /// the nearest edge cell.
    pub fn world_to_cell(&self, point: &Vec2) -> Cell {
        let size = self.cell_size as f32;
        let col = ((point.x / size).floor() as i32).clamp(0, self.cols - 1);
        let row = ((point.y / size).floor() as i32).clamp(0, self.rows - 1);
        Cell::new(col, row)
    }

    pub fn cell_center(&self, cell: Cell) -> Vec2 {
        let half = self.cell_size / 2;
        Vec2::new(
            (cell.col * self.cell_size + half) as f32,
            (cell.row * self.cell_size + half) as f32,
        )
    }

    fn free_neighbours(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        NEIGHBOURS
            .iter()
            .map(move |(dc, dr)| Cell::new(cell.col + dc, cell.row + dr))
            .filter(move |next| !self.is_blocked(*next))
    }

    /// Shortest route from `start` to `goal` as cell-centre waypoints,
    /// starting with the start cell's centre. `None` when the goal cell
    /// cannot be reached.
    pub fn find_path(&self, start: &Vec2, goal: &Vec2) -> Option<Vec<Vec2>> {
        let start = self.world_to_cell(start);
        let goal = self.world_to_cell(goal);

        let mut open = BinaryHeap::new();
        let mut came_from: HashMap<Cell, Cell> = HashMap::new();
        let mut g_score: HashMap<Cell, f64> = HashMap::new();
        let mut order = 0u64;

        g_score.insert(start, 0.0);
        open.push(OpenNode {
            f: start.manhattan(&goal),
            order,
            cell: start,
        });

        while let Some(OpenNode { f, cell: current, .. }) = open.pop() {
            if current == goal {
                return Some(self.reconstruct(&came_from, start, goal));
            }

            let current_g = g_score.get(&current).copied().unwrap_or(f64::INFINITY);
            // Stale entry: a cheaper route to this cell was already expanded.
            if f > current_g + current.manhattan(&goal) {
                continue;
            }

            for next in self.free_neighbours(current) {
                let tentative = current_g + current.step_cost(&next);
                if tentative < g_score.get(&next).copied().unwrap_or(f64::INFINITY) {
                    came_from.insert(next, current);
                    g_score.insert(next, tentative);
                    order += 1;
                    open.push(OpenNode {
                        f: tentative + next.manhattan(&goal),
                        order,
                        cell: next,
                    });
                }
            }
        }

        None
    }

    fn reconstruct(&self, came_from: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Vec2> {
        let mut cells = Vec::new();
        let mut current = goal;
        while current != start {
            cells.push(current);
            match came_from.get(&current) {
                Some(previous) => current = *previous,
                None => break,
            }
        }
        cells.push(start);
        cells.reverse();
        cells.into_iter().map(|cell| self.cell_center(cell)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::{generate_obstacles, BASE_POS, HEIGHT, PATH_GRID_SIZE, WIDTH};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arena_grid(obstacles: &[Rect]) -> Pathfinder {
        Pathfinder::from_obstacles(WIDTH, HEIGHT, PATH_GRID_SIZE, obstacles)
    }

    #[test]
    fn test_grid_dimensions() {
        let grid = arena_grid(&[]);
        assert_eq!(grid.dimensions(), (42, 27));
    }

    #[test]
    fn test_blocked_iff_intersecting() {
        // Covers x 24..72, y 48..60: columns 1-2, row 2 only.
        let grid = arena_grid(&[Rect::new(24, 48, 48, 12)]);
        assert!(grid.is_blocked(Cell::new(1, 2)));
        assert!(grid.is_blocked(Cell::new(2, 2)));
        assert!(!grid.is_blocked(Cell::new(3, 2)));
        assert!(!grid.is_blocked(Cell::new(0, 2)));
        assert!(!grid.is_blocked(Cell::new(1, 3)));
        assert!(!grid.is_blocked(Cell::new(1, 1)));
    }

    #[test]
    fn test_world_to_cell_clamps() {
        let grid = arena_grid(&[]);
        assert_eq!(grid.world_to_cell(&Vec2::new(-50.0, 5.0)), Cell::new(0, 0));
        assert_eq!(grid.world_to_cell(&Vec2::new(5000.0, 5000.0)), Cell::new(41, 26));
        assert_eq!(grid.world_to_cell(&Vec2::new(47.9, 48.0)), Cell::new(1, 2));
        assert_eq!(grid.cell_center(Cell::new(1, 2)), Vec2::new(36.0, 60.0));
    }

    #[test]
    fn test_straight_path_on_open_grid() {
        let grid = arena_grid(&[]);
        let path = grid
            .find_path(&Vec2::new(12.0, 12.0), &Vec2::new(12.0 + 24.0 * 4.0, 12.0))
            .unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path[0], Vec2::new(12.0, 12.0));
        assert_eq!(path[4], Vec2::new(108.0, 12.0));
    }

    #[test]
    fn test_start_equals_goal() {
        let grid = arena_grid(&[]);
        let path = grid
            .find_path(&Vec2::new(100.0, 100.0), &Vec2::new(101.0, 99.0))
            .unwrap();
        assert_eq!(path, vec![Vec2::new(108.0, 108.0)]);
    }

    #[test]
    fn test_routes_around_wall() {
        // Vertical wall at column 5 from row 0 to row 9, open below.
        let wall = Rect::new(120, 0, 24, 240);
        let grid = arena_grid(&[wall]);
        let path = grid
            .find_path(&Vec2::new(60.0, 60.0), &Vec2::new(250.0, 60.0))
            .unwrap();

        for waypoint in &path {
            assert!(!grid.is_blocked(grid.world_to_cell(waypoint)));
        }
        assert!(path.iter().any(|p| p.y > 240.0));
        assert_eq!(*path.last().unwrap(), grid.cell_center(Cell::new(10, 2)));
    }

    #[test]
    fn test_enclosed_goal_is_unreachable() {
        // Ring of obstacles around cell (10, 10).
        let ring = [
            Rect::new(216, 216, 72, 24),
            Rect::new(216, 264, 72, 24),
            Rect::new(216, 240, 24, 24),
            Rect::new(264, 240, 24, 24),
        ];
        let grid = arena_grid(&ring);
        assert!(!grid.is_blocked(Cell::new(10, 10)));
        let goal = grid.cell_center(Cell::new(10, 10));
        assert_eq!(grid.find_path(&Vec2::new(12.0, 12.0), &goal), None);
        // And the other way round: an enclosed start cannot get out.
        assert_eq!(grid.find_path(&goal, &Vec2::new(12.0, 12.0)), None);
    }

    #[test]
    fn test_blocked_goal_is_unreachable() {
        let grid = arena_grid(&[Rect::new(480, 240, 48, 48)]);
        assert_eq!(
            grid.find_path(&Vec2::new(12.0, 12.0), &Vec2::new(500.0, 260.0)),
            None
        );
    }

    #[test]
    fn test_diagonal_path_cost() {
        let grid = arena_grid(&[]);
        let path = grid
            .find_path(&Vec2::new(12.0, 12.0), &Vec2::new(12.0 + 24.0 * 3.0, 12.0 + 24.0 * 3.0))
            .unwrap();
        // Pure diagonal: one waypoint per step.
        assert_eq!(path.len(), 4);
        assert_eq!(path[3], Vec2::new(84.0, 84.0));
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let obstacles = generate_obstacles(&mut StdRng::seed_from_u64(21));
        let grid = arena_grid(&obstacles);
        let start = Vec2::new(40.0, 213.0);

        let first = grid.find_path(&start, &BASE_POS);
        let second = grid.find_path(&start, &BASE_POS);
        assert!(first.is_some());
        assert_eq!(first, second);

        let clone = grid.clone();
        assert_eq!(clone.find_path(&start, &BASE_POS), first);
    }

    #[test]
    fn test_consecutive_waypoints_are_adjacent() {
        let obstacles = generate_obstacles(&mut StdRng::seed_from_u64(5));
        let grid = arena_grid(&obstacles);
        let path = grid.find_path(&Vec2::new(40.0, 426.0), &BASE_POS).unwrap();

        for pair in path.windows(2) {
            let a = grid.world_to_cell(&pair[0]);
            let b = grid.world_to_cell(&pair[1]);
            assert!((a.col - b.col).abs() <= 1 && (a.row - b.row).abs() <= 1);
            assert_ne!(a, b);
        }
    }
}
