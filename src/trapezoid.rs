use std::ops::{Index, IndexMut};

use geo::{Coordinate, GeoFloat};
use slab::Slab;

use crate::dag::{NodeKey, NO_NODE};

/// Stable key of a trapezoid in the [`Traps`] arena.
pub(crate) type TrapKey = usize;

/// A cell of the trapezoidal decomposition.
///
/// Bounded above and below by segments (keys into the map's segment
/// store), and on the left/right by the vertical extensions through
/// two points. A trapezoid has up to four neighbors, one per corner
/// slot; the relation is symmetric and is only ever mutated through
/// the relink primitives on [`Traps`].
///
/// `leaf` back-references the unique DAG leaf currently representing
/// this trapezoid, so an insertion can replace the leaf without
/// re-walking the DAG.
#[derive(Debug, Clone)]
pub(crate) struct Trapezoid<T: GeoFloat> {
    pub top: usize,
    pub bot: usize,
    pub left: Coordinate<T>,
    pub right: Coordinate<T>,
    pub upper_left: Option<TrapKey>,
    pub lower_left: Option<TrapKey>,
    pub upper_right: Option<TrapKey>,
    pub lower_right: Option<TrapKey>,
    pub leaf: NodeKey,
}

impl<T: GeoFloat> Trapezoid<T> {
    /// A trapezoid spanning `left..right` with no neighbors and no
    /// owning leaf yet.
    pub(crate) fn span(top: usize, bot: usize, left: Coordinate<T>, right: Coordinate<T>) -> Self {
        Trapezoid {
            top,
            bot,
            left,
            right,
            upper_left: None,
            lower_left: None,
            upper_right: None,
            lower_right: None,
            leaf: NO_NODE,
        }
    }
}

/// Slab-backed store of the live trapezoids.
///
/// All adjacency mutation goes through the four primitives below;
/// higher-level insertion logic only assigns `top`/`bot`/`left`/
/// `right` and the slots directly on freshly created trapezoids.
#[derive(Debug)]
pub(crate) struct Traps<T: GeoFloat> {
    slab: Slab<Trapezoid<T>>,
}

impl<T: GeoFloat> Traps<T> {
    pub(crate) fn new() -> Self {
        Traps { slab: Slab::new() }
    }

    pub(crate) fn insert(&mut self, trap: Trapezoid<T>) -> TrapKey {
        self.slab.insert(trap)
    }

    /// Retire a trapezoid that is no longer reachable from any leaf.
    pub(crate) fn remove(&mut self, key: TrapKey) {
        self.slab.remove(key);
    }

    pub(crate) fn len(&self) -> usize {
        self.slab.len()
    }

    #[cfg(test)]
    pub(crate) fn iter(&self) -> impl Iterator<Item = (TrapKey, &Trapezoid<T>)> {
        self.slab.iter()
    }

    /// Repoint the left-side neighbors of `old` at `new`: for each
    /// neighbor present on the left, find the one right-side slot
    /// referencing `old` and rewrite it.
    pub(crate) fn relink_left(&mut self, old: TrapKey, new: TrapKey) {
        let (ul, ll) = {
            let t = &self.slab[old];
            (t.upper_left, t.lower_left)
        };
        for nb in [ul, ll].iter().copied().flatten() {
            self.repoint_right_slot(nb, old, new);
        }
    }

    /// Right-side counterpart of [`Traps::relink_left`].
    pub(crate) fn relink_right(&mut self, old: TrapKey, new: TrapKey) {
        let (ur, lr) = {
            let t = &self.slab[old];
            (t.upper_right, t.lower_right)
        };
        for nb in [ur, lr].iter().copied().flatten() {
            self.repoint_left_slot(nb, old, new);
        }
    }

    fn repoint_right_slot(&mut self, of: TrapKey, old: TrapKey, new: TrapKey) {
        let t = &mut self.slab[of];
        if t.upper_right == Some(old) {
            t.upper_right = Some(new);
        } else {
            assert_eq!(
                t.lower_right,
                Some(old),
                "left neighbor has no right slot referencing the relinked trapezoid"
            );
            t.lower_right = Some(new);
        }
    }

    fn repoint_left_slot(&mut self, of: TrapKey, old: TrapKey, new: TrapKey) {
        let t = &mut self.slab[of];
        if t.upper_left == Some(old) {
            t.upper_left = Some(new);
        } else {
            assert_eq!(
                t.lower_left,
                Some(old),
                "right neighbor has no left slot referencing the relinked trapezoid"
            );
            t.lower_left = Some(new);
        }
    }

    /// Collapse the right side of `t` to the single neighbor `nb`.
    pub(crate) fn set_single_right(&mut self, t: TrapKey, nb: TrapKey) {
        let t = &mut self.slab[t];
        t.upper_right = Some(nb);
        t.lower_right = None;
    }

    /// Collapse the left side of `t` to the single neighbor `nb`.
    pub(crate) fn set_single_left(&mut self, t: TrapKey, nb: TrapKey) {
        let t = &mut self.slab[t];
        t.upper_left = Some(nb);
        t.lower_left = None;
    }
}

impl<T: GeoFloat> Index<TrapKey> for Traps<T> {
    type Output = Trapezoid<T>;
    fn index(&self, key: TrapKey) -> &Trapezoid<T> {
        &self.slab[key]
    }
}

impl<T: GeoFloat> IndexMut<TrapKey> for Traps<T> {
    fn index_mut(&mut self, key: TrapKey) -> &mut Trapezoid<T> {
        &mut self.slab[key]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trap(traps: &mut Traps<f64>) -> TrapKey {
        traps.insert(Trapezoid::span(
            0,
            1,
            Coordinate { x: -1., y: 0. },
            Coordinate { x: 1., y: 0. },
        ))
    }

    #[test]
    fn relink_right_rewrites_both_neighbors() {
        let mut traps = Traps::new();
        let a = trap(&mut traps);
        let up = trap(&mut traps);
        let down = trap(&mut traps);
        let b = trap(&mut traps);

        traps[a].upper_right = Some(up);
        traps[a].lower_right = Some(down);
        traps[up].lower_left = Some(a);
        traps[down].upper_left = Some(a);

        traps.relink_right(a, b);
        assert_eq!(traps[up].lower_left, Some(b));
        assert_eq!(traps[down].upper_left, Some(b));
        // Untouched slots stay put.
        assert_eq!(traps[up].upper_left, None);
        assert_eq!(traps[down].lower_left, None);
    }

    #[test]
    fn relink_left_with_single_neighbor() {
        let mut traps = Traps::new();
        let a = trap(&mut traps);
        let nb = trap(&mut traps);
        let b = trap(&mut traps);

        traps[a].upper_left = Some(nb);
        traps[nb].upper_right = Some(a);

        traps.relink_left(a, b);
        assert_eq!(traps[nb].upper_right, Some(b));
    }

    #[test]
    #[should_panic(expected = "no right slot referencing")]
    fn relink_panics_without_back_link() {
        let mut traps = Traps::new();
        let a = trap(&mut traps);
        let nb = trap(&mut traps);
        let b = trap(&mut traps);

        // nb does not point back at a.
        traps[a].upper_left = Some(nb);
        traps.relink_left(a, b);
    }

    #[test]
    fn single_side_collapse() {
        let mut traps = Traps::new();
        let a = trap(&mut traps);
        let up = trap(&mut traps);
        let down = trap(&mut traps);

        traps[a].upper_right = Some(up);
        traps[a].lower_right = Some(down);
        traps.set_single_right(a, down);
        assert_eq!(traps[a].upper_right, Some(down));
        assert_eq!(traps[a].lower_right, None);
    }
}
