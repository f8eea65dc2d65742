use math::{FRACBITS, Fixed};

use crate::level::map_defs::LineDef;

/// Shift from map units to blockmap cells, 128 units per cell
pub const MAPBLOCKSHIFT: i32 = FRACBITS + 7;
pub const MAPBLOCKSIZE: Fixed = 1 << MAPBLOCKSHIFT;

/// Uniform grid of line lists used to bound the movement queries. The thing
/// lists for the same cells live in the `MobjArena`.
#[derive(Debug, Default, Clone)]
pub struct Blockmap {
    pub x_origin: Fixed,
    pub y_origin: Fixed,
    pub columns: i32,
    pub rows: i32,
    lines: Vec<Vec<usize>>,
}

impl Blockmap {
    /// Build from a finished line list. Every line is filed under each cell
    /// its bounding box touches; the exact box test happens at query time.
    pub fn build(lines: &[LineDef], min_x: Fixed, min_y: Fixed, max_x: Fixed, max_y: Fixed) -> Self {
        let columns = ((max_x - min_x) >> MAPBLOCKSHIFT) + 1;
        let rows = ((max_y - min_y) >> MAPBLOCKSHIFT) + 1;
        let mut cells = vec![Vec::new(); (columns * rows) as usize];

        for (i, line) in lines.iter().enumerate() {
            let xl = (line.bbox.left - min_x) >> MAPBLOCKSHIFT;
            let xh = (line.bbox.right - min_x) >> MAPBLOCKSHIFT;
            let yl = (line.bbox.bottom - min_y) >> MAPBLOCKSHIFT;
            let yh = (line.bbox.top - min_y) >> MAPBLOCKSHIFT;
            for by in yl.max(0)..=yh.min(rows - 1) {
                for bx in xl.max(0)..=xh.min(columns - 1) {
                    cells[(by * columns + bx) as usize].push(i);
                }
            }
        }

        Self {
            x_origin: min_x,
            y_origin: min_y,
            columns,
            rows,
            lines: cells,
        }
    }

    /// Assemble from prebuilt cell lists, as a loader would
    pub fn from_cells(x_origin: Fixed, y_origin: Fixed, columns: i32, rows: i32, lines: Vec<Vec<usize>>) -> Self {
        Self {
            x_origin,
            y_origin,
            columns,
            rows,
            lines,
        }
    }

    #[inline]
    pub fn cell_count(&self) -> usize {
        (self.columns * self.rows) as usize
    }

    /// Cell coordinates for a map position; may be off the grid
    #[inline]
    pub fn block_coords(&self, x: Fixed, y: Fixed) -> (i32, i32) {
        (
            x.wrapping_sub(self.x_origin) >> MAPBLOCKSHIFT,
            y.wrapping_sub(self.y_origin) >> MAPBLOCKSHIFT,
        )
    }

    /// Flat cell index, `None` when off the grid
    #[inline]
    pub fn cell_index(&self, bx: i32, by: i32) -> Option<usize> {
        if bx < 0 || by < 0 || bx >= self.columns || by >= self.rows {
            return None;
        }
        Some((by * self.columns + bx) as usize)
    }

    /// Lines filed under a cell, empty off the grid
    pub fn lines_in(&self, bx: i32, by: i32) -> &[usize] {
        self.cell_index(bx, by)
            .map(|i| self.lines[i].as_slice())
            .unwrap_or(&[])
    }

    pub(crate) fn cells(&self) -> &[Vec<usize>] {
        &self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::IVec2;
    use math::int_to_fixed as f;

    fn line(x1: i32, y1: i32, x2: i32, y2: i32) -> LineDef {
        LineDef::new(
            IVec2::new(f(x1), f(y1)),
            IVec2::new(f(x2), f(y2)),
            0,
            0,
            0,
            0,
            None,
            0,
            None,
        )
    }

    #[test]
    fn lines_land_in_touched_cells() {
        let lines = [line(0, 0, 300, 0), line(200, 200, 200, 380)];
        let bm = Blockmap::build(&lines, 0, 0, f(384), f(384));
        assert_eq!(bm.columns, 4);
        assert_eq!(bm.rows, 4);
        assert_eq!(bm.lines_in(0, 0), &[0]);
        assert_eq!(bm.lines_in(2, 0), &[0]);
        assert!(bm.lines_in(3, 0).is_empty());
        assert_eq!(bm.lines_in(1, 1), &[1]);
        assert_eq!(bm.lines_in(1, 2), &[1]);
        assert!(bm.lines_in(-1, 0).is_empty());
        assert!(bm.lines_in(9, 9).is_empty());
    }

    #[test]
    fn coords() {
        let bm = Blockmap::build(&[], f(-64), f(-64), f(512), f(512));
        assert_eq!(bm.block_coords(f(-64), f(-64)), (0, 0));
        assert_eq!(bm.block_coords(f(64), f(63)), (1, 0));
        assert_eq!(bm.block_coords(f(-65), 0), (-1, 0));
        assert_eq!(bm.cell_index(1, 1), Some(bm.columns as usize + 1));
    }
}
