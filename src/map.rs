use geo::{Coordinate, GeoFloat, Line, Rect};
use log::{debug, trace};
use rand::{seq::SliceRandom, Rng};

use crate::dag::{Dag, Node, NodeKey};
use crate::segment::Segment;
use crate::trapezoid::{TrapKey, Trapezoid, Traps};

/// Construction parameters for a [`TrapMap`].
#[derive(Debug, Clone, Copy)]
pub struct Params<T: GeoFloat> {
    /// Bounding box of the decomposition. Every input segment, and
    /// every query point, must lie strictly inside it.
    pub bounds: Rect<T>,

    /// Near-zero band of the orientation test. The default (`0.1`)
    /// is tuned to the default `[-100, 100]` coordinate domain; it
    /// does not automatically scale, so supply your own for inputs
    /// of a different magnitude.
    pub tolerance: T,
}

impl<T: GeoFloat> Default for Params<T> {
    fn default() -> Self {
        let lim = T::from(100.0).expect("scalar conversion");
        Params {
            bounds: Rect::new(
                Coordinate { x: -lim, y: -lim },
                Coordinate { x: lim, y: lim },
            ),
            tolerance: T::from(0.1).expect("scalar conversion"),
        }
    }
}

/// Trapezoidal decomposition of a set of non-crossing segments, with
/// a search DAG for point location.
///
/// Built incrementally in random order ([Seidel]'s algorithm): each
/// inserted segment locates the trapezoid(s) it crosses through the
/// DAG built so far, then rewrites those trapezoids and their leaves
/// locally. Expected construction time is O(n log n) and expected
/// query time O(log n), by backward analysis over the random
/// insertion order.
///
/// The inputs must be in general position: no two segments cross,
/// overlap or share an end-point, and all of them lie strictly inside
/// [`Params::bounds`]. This is the caller's responsibility and is not
/// validated; violations surface as assertion failures during
/// construction, not as recoverable errors.
///
/// Construction is strictly sequential. Once built, the map is only
/// ever read, so concurrent [`TrapMap::locate`] calls through shared
/// references are safe.
///
/// [Seidel]: //en.wikipedia.org/wiki/Point_location#Trapezoidal_decomposition
#[derive(Debug)]
pub struct TrapMap<T: GeoFloat> {
    segments: Vec<Segment<T>>,
    traps: Traps<T>,
    dag: Dag<T>,
    root: NodeKey,
    params: Params<T>,
}

/// A located trapezoid, borrowed from a [`TrapMap`].
///
/// Exposes the four defining attributes of the cell: the bounding
/// segments above and below, and the points whose vertical extensions
/// bound it left and right.
#[derive(Debug, Clone, Copy)]
pub struct Region<'a, T: GeoFloat> {
    map: &'a TrapMap<T>,
    trap: TrapKey,
}

impl<'a, T: GeoFloat> Region<'a, T> {
    /// The segment immediately above the query point.
    pub fn top(&self) -> Line<T> {
        self.map.segments[self.map.traps[self.trap].top].line()
    }

    /// The segment immediately below the query point.
    pub fn bottom(&self) -> Line<T> {
        self.map.segments[self.map.traps[self.trap].bot].line()
    }

    /// The point whose vertical extension bounds the cell on the left.
    pub fn left(&self) -> Coordinate<T> {
        self.map.traps[self.trap].left
    }

    /// The point whose vertical extension bounds the cell on the right.
    pub fn right(&self) -> Coordinate<T> {
        self.map.traps[self.trap].right
    }
}

impl<T: GeoFloat> TrapMap<T> {
    /// An empty decomposition: a single trapezoid spanning
    /// `params.bounds`, bounded by two synthetic horizontal segments.
    pub fn new(params: Params<T>) -> Self {
        let (min, max) = (params.bounds.min(), params.bounds.max());
        let top_left = Coordinate { x: min.x, y: max.y };
        let top_right = Coordinate { x: max.x, y: max.y };

        let segments = vec![
            Segment::from(Line::new(top_left, top_right)),
            Segment::from(Line::new(
                Coordinate { x: min.x, y: min.y },
                Coordinate { x: max.x, y: min.y },
            )),
        ];

        let mut traps = Traps::new();
        let trap = traps.insert(Trapezoid::span(0, 1, top_left, top_right));

        let mut dag = Dag::new();
        let root = dag.add_leaf(trap);
        traps[trap].leaf = root;

        TrapMap {
            segments,
            traps,
            dag,
            root,
            params,
        }
    }

    /// Build a decomposition with default [`Params`], inserting the
    /// segments in a uniformly random order drawn from `rng`.
    pub fn build<I, R>(lines: I, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = Line<T>>,
        R: Rng,
    {
        Self::build_with_params(lines, Params::default(), rng)
    }

    /// [`TrapMap::build`] with explicit parameters.
    pub fn build_with_params<I, R>(lines: I, params: Params<T>, rng: &mut R) -> Self
    where
        I: IntoIterator<Item = Line<T>>,
        R: Rng,
    {
        let mut lines: Vec<_> = lines.into_iter().collect();
        lines.shuffle(rng);

        let mut map = Self::new(params);
        for line in lines {
            map.add_segment(line);
        }
        map
    }

    /// Insert one segment, splitting the trapezoid(s) it crosses and
    /// rewriting their leaves in the DAG.
    ///
    /// The segment must lie strictly inside the bounds and must not
    /// cross or touch any previously inserted segment.
    pub fn add_segment(&mut self, line: Line<T>) {
        let seg = Segment::from(line);
        let key = self.segments.len();
        self.segments.push(seg);

        let (p, q) = (seg.left(), seg.right());
        // Locate both end-points, each guided by the other: a query
        // landing exactly on an existing segment resolves by where
        // the rest of this segment lies.
        let begin = self.dag.leaf_trap(self.descend(p, q));
        let end = self.dag.leaf_trap(self.descend(q, p));

        debug!("add_segment {}: {:?} -> {:?}", key, p, q);
        if begin == end {
            self.split_single(key, begin);
        } else {
            self.split_spanning(key, begin, end);
        }
    }

    /// Locate the trapezoid containing `pt`.
    ///
    /// `pt` must lie strictly inside the bounds; outside them the
    /// result is meaningless. Under the general-position assumption
    /// (queries do not coincide with map vertices) a bare point needs
    /// no further tie-break information, so it guides itself.
    pub fn locate(&self, pt: Coordinate<T>) -> Region<'_, T> {
        let (min, max) = (self.params.bounds.min(), self.params.bounds.max());
        debug_assert!(
            min.x < pt.x && pt.x < max.x && min.y < pt.y && pt.y < max.y,
            "query point outside the bounding box"
        );
        let leaf = self.descend(pt, pt);
        Region {
            map: self,
            trap: self.dag.leaf_trap(leaf),
        }
    }

    /// Number of live trapezoids.
    pub fn trap_count(&self) -> usize {
        self.traps.len()
    }

    fn descend(&self, target: Coordinate<T>, guide: Coordinate<T>) -> NodeKey {
        let mut cur = self.root;
        loop {
            cur = match self.dag.node(cur) {
                Node::X { x, left, right } => {
                    if target.x < *x {
                        *left
                    } else {
                        *right
                    }
                }
                Node::Y {
                    segment,
                    above,
                    below,
                } => {
                    if self.segments[*segment].is_above(target, guide, self.params.tolerance) {
                        *above
                    } else {
                        *below
                    }
                }
                Node::Leaf { .. } => return cur,
            };
        }
    }

    /// Create a fresh leaf owning `trap` and record the back-reference.
    fn new_leaf(&mut self, trap: TrapKey) -> NodeKey {
        let leaf = self.dag.add_leaf(trap);
        self.traps[trap].leaf = leaf;
        leaf
    }

    /// The segment lies inside a single trapezoid, which splits four
    /// ways: a piece left of the segment, one right of it, and the
    /// halves above and below it.
    fn split_single(&mut self, seg: usize, old_key: TrapKey) {
        let old = self.traps[old_key].clone();
        let s = self.segments[seg];
        let (p, q) = (s.left(), s.right());

        let mut left = old.clone();
        left.right = p;
        let mut right = old.clone();
        right.left = q;
        let mut above = old.clone();
        above.bot = seg;
        above.left = p;
        above.right = q;
        let mut below = old.clone();
        below.top = seg;
        below.left = p;
        below.right = q;

        let left = self.traps.insert(left);
        let right = self.traps.insert(right);
        let above = self.traps.insert(above);
        let below = self.traps.insert(below);

        self.traps[left].upper_right = Some(above);
        self.traps[left].lower_right = Some(below);
        self.traps[right].upper_left = Some(above);
        self.traps[right].lower_left = Some(below);
        self.traps.set_single_left(above, left);
        self.traps.set_single_right(above, right);
        self.traps.set_single_left(below, left);
        self.traps.set_single_right(below, right);

        // The old trapezoid's outer neighbors now border the new
        // left/right pieces (which inherited its slots by the copy).
        self.traps.relink_left(old_key, left);
        self.traps.relink_right(old_key, right);

        let leaf_left = self.new_leaf(left);
        let leaf_right = self.new_leaf(right);
        let leaf_above = self.new_leaf(above);
        let leaf_below = self.new_leaf(below);
        let split = self.dag.add_y(seg, leaf_above, leaf_below);
        let x_right = self.dag.add_x(q.x, split, leaf_right);
        let x_left = self.dag.add_x(p.x, leaf_left, x_right);

        self.dag.replace(old.leaf, x_left, &mut self.root);
        self.traps.remove(old_key);
    }

    /// The segment spans several trapezoids. Walk them left to right;
    /// at every boundary crossed, close off the half (above or below
    /// the segment) that the boundary terminates, and merge the other
    /// half into the next trapezoid.
    fn split_spanning(&mut self, seg: usize, begin: TrapKey, end: TrapKey) {
        let s = self.segments[seg];
        let (p, q) = (s.left(), s.right());

        // Leftmost piece plus the two in-progress halves, still open
        // on the right.
        let first = self.traps[begin].clone();
        let mut leftmost = first.clone();
        leftmost.right = p;
        let mut top_half = first.clone();
        top_half.left = p;
        top_half.bot = seg;
        let mut bot_half = first.clone();
        bot_half.left = p;
        bot_half.top = seg;

        let leftmost = self.traps.insert(leftmost);
        let mut top_half = self.traps.insert(top_half);
        let mut bot_half = self.traps.insert(bot_half);

        self.traps[leftmost].upper_right = Some(top_half);
        self.traps[leftmost].lower_right = Some(bot_half);
        self.traps.relink_left(begin, leftmost);
        self.traps.set_single_left(top_half, leftmost);
        self.traps.set_single_left(bot_half, leftmost);

        let mut leaf_top = self.new_leaf(top_half);
        let mut leaf_bot = self.new_leaf(bot_half);
        let leaf_leftmost = self.new_leaf(leftmost);
        let split = self.dag.add_y(seg, leaf_top, leaf_bot);
        let x_left = self.dag.add_x(p.x, leaf_leftmost, split);
        self.dag.replace(first.leaf, x_left, &mut self.root);

        let mut retired = vec![begin];
        let mut prev = begin;
        let mut cur = self.next_crossing(seg, begin);

        loop {
            trace!("walk: prev={} cur={}", prev, cur);

            // Which half does this boundary terminate? If the segment
            // left `prev` through its lower-right neighbor, the top
            // half closes and restarts; otherwise the bottom half
            // does.
            let renew_top = {
                let pv = &self.traps[prev];
                if pv.lower_right.is_some() && pv.upper_right.is_some() {
                    pv.lower_right == Some(cur)
                } else {
                    self.traps[cur].lower_left == Some(prev)
                }
            };

            if renew_top {
                let cur_trap = self.traps[cur].clone();
                self.traps[top_half].right = cur_trap.left;
                let merged = top_half;
                let mut fresh = cur_trap.clone();
                fresh.bot = seg;
                top_half = self.traps.insert(fresh);
                leaf_top = self.new_leaf(top_half);

                if cur_trap.lower_left.is_some() && cur_trap.upper_left.is_some() {
                    self.traps.set_single_right(merged, top_half);
                    self.traps[top_half].lower_left = Some(merged);
                    self.traps[top_half].upper_left = cur_trap.upper_left;
                    let ul = cur_trap
                        .upper_left
                        .expect("crossed boundary must have an upper-left neighbor");
                    self.traps.set_single_right(ul, top_half);
                } else {
                    let prev_ur = self.traps[prev]
                        .upper_right
                        .expect("closed-off piece must have an upper-right neighbor");
                    self.traps[merged].lower_right = Some(top_half);
                    self.traps[merged].upper_right = Some(prev_ur);
                    self.traps.set_single_left(prev_ur, merged);
                    self.traps.set_single_left(top_half, merged);
                }
            } else {
                debug_assert_eq!(self.traps[prev].upper_right, Some(cur));
                let cur_trap = self.traps[cur].clone();
                self.traps[bot_half].right = cur_trap.left;
                let merged = bot_half;
                let mut fresh = cur_trap.clone();
                fresh.top = seg;
                bot_half = self.traps.insert(fresh);
                leaf_bot = self.new_leaf(bot_half);

                if cur_trap.lower_left.is_some() && cur_trap.upper_left.is_some() {
                    self.traps.set_single_right(merged, bot_half);
                    self.traps[bot_half].upper_left = Some(merged);
                    self.traps[bot_half].lower_left = cur_trap.lower_left;
                    let ll = cur_trap
                        .lower_left
                        .expect("crossed boundary must have a lower-left neighbor");
                    self.traps.set_single_right(ll, bot_half);
                } else {
                    let prev_lr = self.traps[prev]
                        .lower_right
                        .expect("closed-off piece must have a lower-right neighbor");
                    self.traps[merged].upper_right = Some(bot_half);
                    self.traps[merged].lower_right = Some(prev_lr);
                    self.traps.set_single_left(prev_lr, merged);
                    self.traps.set_single_left(bot_half, merged);
                }
            }

            if cur == end {
                retired.push(cur);
                break;
            }

            let split = self.dag.add_y(seg, leaf_top, leaf_bot);
            let cur_leaf = self.traps[cur].leaf;
            self.dag.replace(cur_leaf, split, &mut self.root);
            retired.push(cur);

            prev = cur;
            cur = self.next_crossing(seg, cur);
        }

        // Close both halves at the right end-point and split off the
        // rightmost unaffected piece, symmetric to the leftmost.
        self.traps[top_half].right = q;
        self.traps[bot_half].right = q;

        let last = self.traps[end].clone();
        let mut rightmost = last.clone();
        rightmost.left = q;
        let rightmost = self.traps.insert(rightmost);

        self.traps.set_single_right(top_half, rightmost);
        self.traps.set_single_right(bot_half, rightmost);
        self.traps[rightmost].upper_left = Some(top_half);
        self.traps[rightmost].lower_left = Some(bot_half);
        self.traps.relink_right(end, rightmost);

        let leaf_rightmost = self.new_leaf(rightmost);
        let split = self.dag.add_y(seg, leaf_top, leaf_bot);
        let x_right = self.dag.add_x(q.x, split, leaf_rightmost);
        self.dag.replace(last.leaf, x_right, &mut self.root);

        for trap in retired {
            self.traps.remove(trap);
        }
    }

    /// Of the current trapezoid's right neighbors, the one the
    /// segment passes into: test the segment's y at the upper
    /// neighbor's left boundary against that neighbor's bottom edge,
    /// guiding ties with the segment's own left end-point.
    fn next_crossing(&self, seg: usize, trap: TrapKey) -> TrapKey {
        let t = &self.traps[trap];
        match (t.upper_right, t.lower_right) {
            (Some(up), None) => up,
            (None, Some(down)) => down,
            (Some(up), Some(down)) => {
                let s = &self.segments[seg];
                let at = s.point_at_x(self.traps[up].left.x);
                if self.segments[self.traps[up].bot].is_above(
                    at,
                    s.left(),
                    self.params.tolerance,
                ) {
                    up
                } else {
                    down
                }
            }
            (None, None) => unreachable!("segment walk ran past the last trapezoid"),
        }
    }
}

#[cfg(test)]
impl<T: GeoFloat> TrapMap<T> {
    /// Every neighbor link must have exactly one matching back-link.
    fn assert_neighbor_symmetry(&self) {
        for (key, trap) in self.traps.iter() {
            for nb in [trap.upper_left, trap.lower_left].iter().copied().flatten() {
                let n = &self.traps[nb];
                let back = (n.upper_right == Some(key)) as usize
                    + (n.lower_right == Some(key)) as usize;
                assert_eq!(back, 1, "left link {} -> {} has {} back-links", key, nb, back);
            }
            for nb in [trap.upper_right, trap.lower_right]
                .iter()
                .copied()
                .flatten()
            {
                let n = &self.traps[nb];
                let back =
                    (n.upper_left == Some(key)) as usize + (n.lower_left == Some(key)) as usize;
                assert_eq!(back, 1, "right link {} -> {} has {} back-links", key, nb, back);
            }
        }
    }

    /// Leaves reachable from the root and live trapezoids must be in
    /// bijection, with matching back-references.
    fn assert_leaf_bijection(&self) {
        use std::collections::HashSet;

        let mut seen = HashSet::new();
        let mut stack = vec![self.root];
        let mut leaf_traps = HashSet::new();
        while let Some(key) = stack.pop() {
            if !seen.insert(key) {
                continue;
            }
            match self.dag.node(key) {
                Node::X { left, right, .. } => {
                    stack.push(*left);
                    stack.push(*right);
                }
                Node::Y { above, below, .. } => {
                    stack.push(*above);
                    stack.push(*below);
                }
                Node::Leaf { trap } => {
                    assert_eq!(
                        self.traps[*trap].leaf, key,
                        "trapezoid's leaf back-reference is stale"
                    );
                    assert!(
                        leaf_traps.insert(*trap),
                        "two reachable leaves own trapezoid {}",
                        trap
                    );
                }
            }
        }
        assert_eq!(leaf_traps.len(), self.traps.len());
        for (key, _) in self.traps.iter() {
            assert!(leaf_traps.contains(&key), "trapezoid {} has no leaf", key);
        }
    }

    fn assert_consistent(&self) {
        self.assert_neighbor_symmetry();
        self.assert_leaf_bijection();
    }
}
