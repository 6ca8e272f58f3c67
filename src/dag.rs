use slab::Slab;
use smallvec::SmallVec;

use crate::trapezoid::TrapKey;

/// Stable key of a node in the [`Dag`] arena.
pub(crate) type NodeKey = usize;

/// Sentinel for a trapezoid that has not been handed its leaf yet.
pub(crate) const NO_NODE: NodeKey = usize::MAX;

type Parents = SmallVec<[NodeKey; 4]>;

/// A decision node of the search structure.
///
/// `X` routes on the query's x-coordinate, `Y` routes on the
/// orientation against a segment (key into the map's segment store),
/// and `Leaf` terminates at a live trapezoid. The enum is exhaustive
/// on purpose: descent handles every variant or doesn't compile.
#[derive(Debug, Clone)]
pub(crate) enum Node<T> {
    X { x: T, left: NodeKey, right: NodeKey },
    Y { segment: usize, above: NodeKey, below: NodeKey },
    Leaf { trap: TrapKey },
}

#[derive(Debug)]
struct Entry<T> {
    node: Node<T>,
    parents: Parents,
}

/// Arena of search-DAG nodes.
///
/// Nodes are shared: after a spanning insertion the same leaf is a
/// child of several `Y` nodes, so every node carries the keys of all
/// its parents. A leaf is only ever retired by [`Dag::replace`] --
/// never mutated into an inner node -- and inner nodes are never
/// retired at all.
#[derive(Debug)]
pub(crate) struct Dag<T> {
    arena: Slab<Entry<T>>,
}

impl<T> Dag<T> {
    pub(crate) fn new() -> Self {
        Dag { arena: Slab::new() }
    }

    pub(crate) fn node(&self, key: NodeKey) -> &Node<T> {
        &self.arena[key].node
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.arena.len()
    }

    pub(crate) fn add_leaf(&mut self, trap: TrapKey) -> NodeKey {
        self.add(Node::Leaf { trap })
    }

    pub(crate) fn add_x(&mut self, x: T, left: NodeKey, right: NodeKey) -> NodeKey {
        let key = self.add(Node::X { x, left, right });
        self.arena[left].parents.push(key);
        self.arena[right].parents.push(key);
        key
    }

    pub(crate) fn add_y(&mut self, segment: usize, above: NodeKey, below: NodeKey) -> NodeKey {
        let key = self.add(Node::Y {
            segment,
            above,
            below,
        });
        self.arena[above].parents.push(key);
        self.arena[below].parents.push(key);
        key
    }

    fn add(&mut self, node: Node<T>) -> NodeKey {
        self.arena.insert(Entry {
            node,
            parents: Parents::new(),
        })
    }

    /// The trapezoid owned by a leaf. Panics on a non-leaf node.
    pub(crate) fn leaf_trap(&self, key: NodeKey) -> TrapKey {
        match self.node(key) {
            Node::Leaf { trap } => *trap,
            Node::X { .. } | Node::Y { .. } => panic!("expected a leaf node"),
        }
    }

    /// Replace `old` with `new` in every parent's child slot, making
    /// the edit visible along all root-to-leaf paths that reached
    /// `old`. If `old` is the root, the root reference is updated
    /// instead. `old` is retired from the arena.
    pub(crate) fn replace(&mut self, old: NodeKey, new: NodeKey, root: &mut NodeKey) {
        let parents = std::mem::take(&mut self.arena[old].parents);
        if parents.is_empty() {
            assert_eq!(old, *root, "only the root may have no parents");
        }
        if *root == old {
            *root = new;
        }
        for &parent in &parents {
            let repointed = match &mut self.arena[parent].node {
                Node::X { left, right, .. } => {
                    if *left == old {
                        *left = new;
                        true
                    } else if *right == old {
                        *right = new;
                        true
                    } else {
                        false
                    }
                }
                Node::Y { above, below, .. } => {
                    if *above == old {
                        *above = new;
                        true
                    } else if *below == old {
                        *below = new;
                        true
                    } else {
                        false
                    }
                }
                Node::Leaf { .. } => unreachable!("a leaf cannot be a parent"),
            };
            assert!(repointed, "parent does not reference the replaced node");
        }
        let entry = &mut self.arena[new];
        entry.parents.extend(parents);
        self.arena.remove(old);
    }
}
