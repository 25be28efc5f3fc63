//! Greedy meshing of wall masks into rectangles.

use arena_shared::WallRect;

/// Cover every `true` cell of `mask` with non-overlapping rectangles.
///
/// Cells are scanned in raster order; each unvisited wall cell starts a
/// rectangle that grows right as far as possible, then down while the whole
/// row span is still wall.
pub fn greedy_mesh(mask: &[bool], width: u32, height: u32) -> Vec<WallRect> {
    let idx = |x: u32, y: u32| (y * width + x) as usize;
    let mut visited = vec![false; mask.len()];
    let mut rects = Vec::new();

    for y in 0..height {
        for x in 0..width {
            let i = idx(x, y);
            if !mask[i] || visited[i] {
                continue;
            }

            let mut w = 1;
            while x + w < width && mask[idx(x + w, y)] && !visited[idx(x + w, y)] {
                w += 1;
            }

            let mut h = 1;
            'grow: while y + h < height {
                for cx in x..x + w {
                    let j = idx(cx, y + h);
                    if !mask[j] || visited[j] {
                        break 'grow;
                    }
                }
                h += 1;
            }

            for cy in y..y + h {
                for cx in x..x + w {
                    visited[idx(cx, cy)] = true;
                }
            }
            rects.push(WallRect::new(x, y, w, h));
        }
    }

    rects
}

/// Paint rectangles back onto a boolean grid
pub fn rasterize(rects: &[WallRect], width: u32, height: u32) -> Vec<bool> {
    let mut mask = vec![false; (width * height) as usize];
    for rect in rects {
        for y in rect.y..(rect.y + rect.h).min(height) {
            for x in rect.x..(rect.x + rect.w).min(width) {
                mask[(y * width + x) as usize] = true;
            }
        }
    }
    mask
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(rows: &[&str]) -> (Vec<bool>, u32, u32) {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let mask = rows
            .iter()
            .flat_map(|row| row.chars().map(|c| c == '#'))
            .collect();
        (mask, width, height)
    }

    #[test]
    fn test_solid_block_is_one_rect() {
        let (mask, w, h) = parse(&["####", "####", "####"]);
        assert_eq!(greedy_mesh(&mask, w, h), vec![WallRect::new(0, 0, 4, 3)]);
    }

    #[test]
    fn test_round_trip_irregular_mask() {
        let (mask, w, h) = parse(&[
            "##..###", //
            "##..#..",
            "#####..",
            "....#.#",
        ]);
        let rects = greedy_mesh(&mask, w, h);
        assert_eq!(rasterize(&rects, w, h), mask);

        // No two rectangles overlap
        let total: u32 = rects.iter().map(|r| r.area()).sum();
        assert_eq!(total as usize, mask.iter().filter(|c| **c).count());
    }

    #[test]
    fn test_empty_mask_has_no_rects() {
        let (mask, w, h) = parse(&["...", "..."]);
        assert!(greedy_mesh(&mask, w, h).is_empty());
    }
}
