/// Per-resource occupancy counts over a fixed axis `[0, len)`.
///
/// Array-backed segment tree with lazy range addition. `tree[node]` holds the
/// maximum count in the node's range *including* every delta applied at or
/// below it; `lazy[node]` is the part of that delta not yet pushed to its
/// children. Queries add the pending deltas on the way back up, so they only need
/// `&self`.
///
/// All public operations take half-open `[start, end)` bounds. Out-of-range or
/// empty ranges are ignored (updates) or report zero (queries).
#[derive(Debug, Clone)]
pub struct OccupancyIndex {
    len: usize,
    tree: Vec<i32>,
    lazy: Vec<i32>,
}

impl OccupancyIndex {
    pub fn new(len: usize) -> Self {
        let nodes = 4 * len.max(1);
        Self {
            len,
            tree: vec![0; nodes],
            lazy: vec![0; nodes],
        }
    }

    /// Axis length this index was built for.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// +1 on every position in `[start, end)`.
    pub fn add_interval(&mut self, start: usize, end: usize) {
        if let Some((l, r)) = self.inclusive(start, end) {
            self.update(0, 0, self.len - 1, l, r, 1);
        }
    }

    /// -1 on every position in `[start, end)`. The caller must only remove a
    /// range it previously added; counts are not floored at zero.
    pub fn remove_interval(&mut self, start: usize, end: usize) {
        if let Some((l, r)) = self.inclusive(start, end) {
            self.update(0, 0, self.len - 1, l, r, -1);
        }
    }

    pub fn is_conflict(&self, start: usize, end: usize) -> bool {
        self.query_occupancy(start, end) > 0
    }

    /// Maximum count over `[start, end)`.
    pub fn query_occupancy(&self, start: usize, end: usize) -> i32 {
        match self.inclusive(start, end) {
            Some((l, r)) => self.query(0, 0, self.len - 1, l, r),
            None => 0,
        }
    }

    pub fn clear(&mut self) {
        self.tree.fill(0);
        self.lazy.fill(0);
    }

    /// Half-open → inclusive, rejecting anything outside the axis.
    fn inclusive(&self, start: usize, end: usize) -> Option<(usize, usize)> {
        if start >= end || end > self.len {
            return None;
        }
        Some((start, end - 1))
    }

    fn push_down(&mut self, node: usize) {
        let pending = self.lazy[node];
        if pending != 0 {
            for child in [2 * node + 1, 2 * node + 2] {
                self.tree[child] += pending;
                self.lazy[child] += pending;
            }
            self.lazy[node] = 0;
        }
    }

    fn update(&mut self, node: usize, lo: usize, hi: usize, l: usize, r: usize, delta: i32) {
        if r < lo || hi < l {
            return;
        }
        if l <= lo && hi <= r {
            self.tree[node] += delta;
            if lo != hi {
                self.lazy[node] += delta;
            }
            return;
        }
        self.push_down(node);
        let mid = (lo + hi) / 2;
        self.update(2 * node + 1, lo, mid, l, r, delta);
        self.update(2 * node + 2, mid + 1, hi, l, r, delta);
        self.tree[node] = self.tree[2 * node + 1].max(self.tree[2 * node + 2]);
    }

    fn query(&self, node: usize, lo: usize, hi: usize, l: usize, r: usize) -> i32 {
        if l <= lo && hi <= r {
            return self.tree[node];
        }
        let mid = (lo + hi) / 2;
        let mut best = i32::MIN;
        if l <= mid {
            best = best.max(self.query(2 * node + 1, lo, mid, l, r));
        }
        if r > mid {
            best = best.max(self.query(2 * node + 2, mid + 1, hi, l, r));
        }
        best + self.lazy[node]
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    const DAY: usize = 1440;

    #[test]
    fn empty_index_has_no_conflicts() {
        let idx = OccupancyIndex::new(DAY);
        assert!(!idx.is_conflict(0, DAY));
        assert_eq!(idx.query_occupancy(0, DAY), 0);
    }

    #[test]
    fn basic_add_and_query() {
        // Mirrors the hour-granularity walkthrough: one booking 9..12, one 14..17.
        let mut idx = OccupancyIndex::new(24);
        idx.add_interval(9, 12);
        assert!(idx.is_conflict(8, 11));
        assert!(!idx.is_conflict(12, 15));
        assert!(idx.is_conflict(10, 12));

        idx.add_interval(14, 17);
        assert_eq!(idx.query_occupancy(9, 12), 1);
        assert_eq!(idx.query_occupancy(0, 24), 1);
    }

    #[test]
    fn half_open_boundary() {
        let mut idx = OccupancyIndex::new(DAY);
        idx.add_interval(540, 600);
        assert!(!idx.is_conflict(600, 660));
        assert!(!idx.is_conflict(480, 540));
        assert!(idx.is_conflict(599, 660));
        assert!(idx.is_conflict(480, 541));
    }

    #[test]
    fn stacked_intervals_report_max() {
        let mut idx = OccupancyIndex::new(DAY);
        idx.add_interval(100, 300);
        idx.add_interval(200, 400);
        idx.add_interval(250, 260);
        assert_eq!(idx.query_occupancy(0, DAY), 3);
        assert_eq!(idx.query_occupancy(100, 200), 1);
        assert_eq!(idx.query_occupancy(200, 250), 2);
        assert_eq!(idx.query_occupancy(300, 400), 1);
        assert_eq!(idx.query_occupancy(400, DAY), 0);
    }

    #[test]
    fn remove_restores_zero() {
        let mut idx = OccupancyIndex::new(DAY);
        idx.add_interval(100, 300);
        idx.add_interval(200, 400);
        idx.remove_interval(100, 300);
        assert_eq!(idx.query_occupancy(100, 200), 0);
        assert_eq!(idx.query_occupancy(200, 400), 1);
        idx.remove_interval(200, 400);
        assert_eq!(idx.query_occupancy(0, DAY), 0);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut idx = OccupancyIndex::new(DAY);
        idx.add_interval(1000, DAY + 1);
        idx.add_interval(500, 500);
        idx.add_interval(600, 500);
        assert_eq!(idx.query_occupancy(0, DAY), 0);
        assert_eq!(idx.query_occupancy(0, DAY + 5), 0);
        assert!(!idx.is_conflict(700, 700));
    }

    #[test]
    fn full_axis_and_single_point() {
        let mut idx = OccupancyIndex::new(DAY);
        idx.add_interval(0, DAY);
        idx.add_interval(DAY - 1, DAY);
        assert_eq!(idx.query_occupancy(0, 1), 1);
        assert_eq!(idx.query_occupancy(DAY - 1, DAY), 2);
        assert_eq!(idx.query_occupancy(0, DAY), 2);
    }

    #[test]
    fn clear_is_idempotent() {
        let mut idx = OccupancyIndex::new(DAY);
        idx.add_interval(10, 900);
        idx.add_interval(50, 60);
        idx.clear();
        idx.clear();
        for (s, e) in [(0, DAY), (10, 11), (50, 60), (899, 900)] {
            assert_eq!(idx.query_occupancy(s, e), 0);
        }
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(usize, usize),
        /// Remove one of the live intervals.
        Remove(prop::sample::Index),
    }

    /// Non-empty half-open range inside `[0, len)`.
    fn arb_range(len: usize) -> impl Strategy<Value = (usize, usize)> {
        (0..len).prop_flat_map(move |s| (Just(s), s + 1..=len))
    }

    fn arb_op(len: usize) -> impl Strategy<Value = Op> {
        prop_oneof![
            2 => arb_range(len).prop_map(|(s, e)| Op::Add(s, e)),
            1 => any::<prop::sample::Index>().prop_map(Op::Remove),
        ]
    }

    const LEN: usize = 97;

    proptest! {
        /// After any add/remove sequence the index agrees with per-position counts.
        #[test]
        fn matches_brute_force_counts(
            steps in prop::collection::vec((arb_op(LEN), arb_range(LEN)), 1..200),
        ) {
            let mut idx = OccupancyIndex::new(LEN);
            let mut naive = vec![0i32; LEN];
            let mut live: Vec<(usize, usize)> = Vec::new();

            for (op, (qs, qe)) in steps {
                match op {
                    Op::Add(s, e) => {
                        idx.add_interval(s, e);
                        naive[s..e].iter_mut().for_each(|c| *c += 1);
                        live.push((s, e));
                    }
                    Op::Remove(pick) if !live.is_empty() => {
                        let (s, e) = live.swap_remove(pick.index(live.len()));
                        idx.remove_interval(s, e);
                        naive[s..e].iter_mut().for_each(|c| *c -= 1);
                    }
                    Op::Remove(_) => {}
                }

                let expected = *naive[qs..qe].iter().max().unwrap();
                prop_assert_eq!(idx.query_occupancy(qs, qe), expected, "query [{}, {})", qs, qe);
                prop_assert_eq!(idx.is_conflict(qs, qe), expected > 0);
            }
        }
    }
}
