//! Cell grids and integer rectangles used during generation.

use std::collections::VecDeque;

/// Integer rectangle in grid cells. May extend past the grid before clipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> i32 {
        self.x + self.w
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.h
    }

    pub fn area(&self) -> i32 {
        self.w * self.h
    }

    /// Integer center cell
    pub fn center(&self) -> (i32, i32) {
        (self.x + self.w / 2, self.y + self.h / 2)
    }

    /// Intersection with another rectangle, if non-empty
    pub fn clip(&self, bounds: &Rect) -> Option<Rect> {
        let x0 = self.x.max(bounds.x);
        let y0 = self.y.max(bounds.y);
        let x1 = self.right().min(bounds.right());
        let y1 = self.bottom().min(bounds.bottom());
        if x1 > x0 && y1 > y0 {
            Some(Rect::new(x0, y0, x1 - x0, y1 - y0))
        } else {
            None
        }
    }

    /// True when the two rectangles share a cell or an edge, so their cells
    /// are 4-connected. Diagonal corner contact does not count.
    pub fn connects(&self, other: &Rect) -> bool {
        let overlap_x = self.x < other.right() && other.x < self.right();
        let overlap_y = self.y < other.bottom() && other.y < self.bottom();
        let touch_x = self.x <= other.right() && other.x <= self.right();
        let touch_y = self.y <= other.bottom() && other.y <= self.bottom();
        (overlap_x && touch_y) || (touch_x && overlap_y)
    }
}

/// Walkable/blocked occupancy grid. `true` means floor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl TileGrid {
    /// All-blocked grid
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn cells(&self) -> &[bool] {
        &self.cells
    }

    fn idx(&self, x: i32, y: i32) -> Option<usize> {
        if self.in_bounds(x, y) {
            Some((y as u32 * self.width + x as u32) as usize)
        } else {
            None
        }
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    /// Floor test; out-of-bounds cells are blocked
    pub fn get(&self, x: i32, y: i32) -> bool {
        self.idx(x, y).map(|i| self.cells[i]).unwrap_or(false)
    }

    pub fn set(&mut self, x: i32, y: i32, floor: bool) {
        if let Some(i) = self.idx(x, y) {
            self.cells[i] = floor;
        }
    }

    /// Mark every in-bounds cell of `rect` as floor
    pub fn carve_rect(&mut self, rect: &Rect) {
        let bounds = Rect::new(0, 0, self.width as i32, self.height as i32);
        if let Some(r) = rect.clip(&bounds) {
            for y in r.y..r.bottom() {
                for x in r.x..r.right() {
                    self.set(x, y, true);
                }
            }
        }
    }

    pub fn floor_count(&self) -> usize {
        self.cells.iter().filter(|c| **c).count()
    }

    /// 4-connected flood fill over floor cells. Returns the reached mask.
    pub fn flood_from(&self, x: i32, y: i32) -> Vec<bool> {
        let mut reached = vec![false; self.cells.len()];
        let start = match self.idx(x, y) {
            Some(i) if self.cells[i] => i,
            _ => return reached,
        };

        let mut queue = VecDeque::new();
        reached[start] = true;
        queue.push_back((x, y));

        while let Some((cx, cy)) = queue.pop_front() {
            for (dx, dy) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let (nx, ny) = (cx + dx, cy + dy);
                if let Some(i) = self.idx(nx, ny) {
                    if self.cells[i] && !reached[i] {
                        reached[i] = true;
                        queue.push_back((nx, ny));
                    }
                }
            }
        }

        reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rect_connects_edges_not_corners() {
        let a = Rect::new(0, 0, 4, 4);
        assert!(a.connects(&Rect::new(4, 1, 2, 2)));
        assert!(a.connects(&Rect::new(2, 2, 4, 4)));
        assert!(!a.connects(&Rect::new(4, 4, 2, 2)));
        assert!(!a.connects(&Rect::new(5, 0, 2, 2)));
    }

    #[test]
    fn test_carve_is_clipped() {
        let mut grid = TileGrid::new(5, 5);
        grid.carve_rect(&Rect::new(3, 3, 10, 10));
        assert_eq!(grid.floor_count(), 4);
        assert!(grid.get(4, 4));
        assert!(!grid.get(5, 5));
    }

    #[test]
    fn test_flood_stops_at_walls() {
        let mut grid = TileGrid::new(7, 3);
        grid.carve_rect(&Rect::new(0, 0, 3, 3));
        grid.carve_rect(&Rect::new(4, 0, 3, 3));
        let reached = grid.flood_from(0, 0);
        assert_eq!(reached.iter().filter(|r| **r).count(), 9);
        grid.set(3, 1, true);
        let reached = grid.flood_from(0, 0);
        assert_eq!(reached.iter().filter(|r| **r).count(), 19);
    }
}
