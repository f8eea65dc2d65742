use gameplay::log::debug;

use crate::defs::ClipRange;

/// Sorted, non overlapping runs of screen columns already covered by solid
/// walls. Two sentinel posts sit just off either edge of the screen so every
/// scan terminates.
#[derive(Debug, Clone)]
pub struct ClipList {
    ranges: Vec<ClipRange>,
    max: usize,
    /// Posts that could not be inserted because the list was full
    overflow: u32,
}

impl ClipList {
    pub fn new(max: usize, screen_width: i32) -> Self {
        let mut list = Self {
            ranges: Vec::with_capacity(max),
            max: max.max(3),
            overflow: 0,
        };
        list.clear(screen_width);
        list
    }

    /// R_ClearClipSegs - r_bsp
    pub fn clear(&mut self, screen_width: i32) {
        self.ranges.clear();
        self.ranges.push(ClipRange {
            first: -0x4000,
            last: -1,
        });
        self.ranges.push(ClipRange {
            first: screen_width,
            last: 0x4000,
        });
        self.overflow = 0;
    }

    #[inline]
    pub fn ranges(&self) -> &[ClipRange] {
        &self.ranges
    }

    #[inline]
    pub fn overflow(&self) -> u32 {
        self.overflow
    }

    /// First post that touches or passes `first - 1`
    #[inline]
    fn first_touching(&self, first: i32) -> usize {
        let mut start = 0;
        while self.ranges[start].last < first - 1 {
            start += 1;
        }
        start
    }

    /// Emit every sub range of `[first, last]` not yet covered, then merge
    /// the whole range into the list.
    ///
    /// R_ClipSolidWallSegment - r_bsp
    pub fn clip_solid(&mut self, first: i32, last: i32, mut store: impl FnMut(i32, i32)) {
        let start = self.first_touching(first);

        if first < self.ranges[start].first {
            if last < self.ranges[start].first - 1 {
                // Post is entirely visible (above start), so insert a new
                // clippost.
                store(first, last);
                if self.ranges.len() >= self.max {
                    self.overflow += 1;
                    if self.overflow == 1 {
                        debug!("Solid seg list full at {} posts, dropping {first}..={last}", self.max);
                    }
                } else {
                    self.ranges.insert(start, ClipRange { first, last });
                }
                return;
            }
            // There is a fragment above *start
            store(first, self.ranges[start].first - 1);
            self.ranges[start].first = first;
        }

        // Bottom contained in start?
        if last <= self.ranges[start].last {
            return;
        }

        let mut next = start;
        while last >= self.ranges[next + 1].first - 1 {
            // There is a fragment between two posts.
            store(self.ranges[next].last + 1, self.ranges[next + 1].first - 1);
            next += 1;
            if last <= self.ranges[next].last {
                // Bottom is contained in next. Adjust the clip size.
                self.ranges[start].last = self.ranges[next].last;
                self.crunch(start, next);
                return;
            }
        }

        // There is a fragment after *next.
        store(self.ranges[next].last + 1, last);
        // Adjust the clip size.
        self.ranges[start].last = last;
        self.crunch(start, next);
    }

    /// Remove start+1 to next from the clip list, because start now covers
    /// their area.
    #[inline]
    fn crunch(&mut self, start: usize, next: usize) {
        if next > start {
            self.ranges.drain(start + 1..=next);
        }
    }

    /// Same walk as `clip_solid` without touching the list: geometry behind a
    /// see-through wall is still visible.
    ///
    /// R_ClipPassWallSegment - r_bsp
    pub fn clip_pass(&self, first: i32, last: i32, mut store: impl FnMut(i32, i32)) {
        let mut start = self.first_touching(first);

        if first < self.ranges[start].first {
            if last < self.ranges[start].first - 1 {
                store(first, last);
                return;
            }
            store(first, self.ranges[start].first - 1);
        }

        if last <= self.ranges[start].last {
            return;
        }

        while last >= self.ranges[start + 1].first - 1 {
            store(self.ranges[start].last + 1, self.ranges[start + 1].first - 1);
            if last <= self.ranges[start + 1].last {
                return;
            }
            start += 1;
        }

        store(self.ranges[start].last + 1, last);
    }

    /// True when `[first, last]` sits entirely inside one solid post. Used by
    /// the BSP walk to skip boxes that can't show anything.
    pub fn is_occluded(&self, first: i32, last: i32) -> bool {
        let mut start = 0;
        while self.ranges[start].last < last {
            start += 1;
        }
        first >= self.ranges[start].first && last <= self.ranges[start].last
    }
}
