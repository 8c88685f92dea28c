use tracing::trace;

use super::arena::Arena;
use super::handle::Handle;
use super::node::{InternalNode, LeafNode, Node};
use crate::Order;

/// The core B+Tree engine backing `MultiKeyBPlusTree`.
///
/// Keys are stored next to their values in the leaves; the key derivation lives
/// in the public wrapper.
pub(crate) struct RawMultiKeyTree<K, V> {
    /// Arena storing all tree nodes.
    nodes: Arena<Node<K, V>>,
    /// The root is a leaf (possibly empty) or an internal node with at least two
    /// children.
    root: Handle,
    order: Order,
    /// Total number of entries in the leaves.
    len: usize,
}

/// What an insertion reports to the parent of the node it reached.
pub(crate) enum InsertResult<K> {
    /// The node absorbed the entry.
    Fit,
    /// The node overflowed and moved its upper half into a new right sibling.
    Split {
        /// Smallest key reachable under `sibling`.
        separator: K,
        sibling: Handle,
    },
}

/// Which node disappeared while an underflow was repaired.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) enum Join {
    /// The node absorbed its right sibling, which is gone.
    AbsorbedRight,
    /// The node was absorbed by its left sibling and is gone.
    IntoLeft,
}

/// What a removal reports to the parent of the node it reached.
#[derive(Debug)]
pub(crate) struct Removal<K> {
    pub(crate) removed: bool,
    pub(crate) join: Option<Join>,
    /// New smallest key of the node, if it changed.
    pub(crate) smallest_key: Option<K>,
    /// New smallest key of the right sibling, if it lent an entry or child.
    pub(crate) right_smallest_key: Option<K>,
}

impl<K> Removal<K> {
    const fn missing() -> Self {
        Self {
            removed: false,
            join: None,
            smallest_key: None,
            right_smallest_key: None,
        }
    }

    const fn removed(smallest_key: Option<K>) -> Self {
        Self {
            removed: true,
            join: None,
            smallest_key,
            right_smallest_key: None,
        }
    }

    const fn joined(join: Join, smallest_key: Option<K>) -> Self {
        Self {
            removed: true,
            join: Some(join),
            smallest_key,
            right_smallest_key: None,
        }
    }
}

/// Siblings an underflowing node may rebalance against.
///
/// Only neighbors under the same parent qualify: touching a cousin would
/// require rewriting a bound in the grandparent.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct CanJoin {
    pub(crate) left: bool,
    pub(crate) right: bool,
}

impl CanJoin {
    pub(crate) const NONE: CanJoin = CanJoin {
        left: false,
        right: false,
    };

    fn for_child(index: usize, child_count: usize) -> Self {
        Self {
            left: index > 0,
            right: index + 1 < child_count,
        }
    }
}

/// How an underflowing node gets back to half occupancy.
enum Rebalance {
    BorrowRight(Handle),
    JoinRight(Handle),
    BorrowLeft(Handle),
    JoinLeft(Handle),
}

/// An entry slot at the leaf level.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(crate) struct Position {
    pub(crate) leaf: Handle,
    pub(crate) index: usize,
}

impl<K, V> RawMultiKeyTree<K, V> {
    /// Creates a tree whose root is a single empty leaf.
    pub(crate) fn new(order: Order) -> Self {
        let mut nodes = Arena::new();
        let root = nodes.alloc(Node::Leaf(LeafNode::new()));
        Self {
            nodes,
            root,
            order,
            len: 0,
        }
    }

    pub(crate) const fn len(&self) -> usize {
        self.len
    }

    pub(crate) const fn order(&self) -> Order {
        self.order
    }

    pub(crate) const fn root(&self) -> Handle {
        self.root
    }

    /// Returns a reference to a node by handle.
    pub(crate) fn node(&self, handle: Handle) -> &Node<K, V> {
        self.nodes.get(handle)
    }

    fn leaf_mut(&mut self, handle: Handle) -> &mut LeafNode<K, V> {
        self.nodes.get_mut(handle).as_leaf_mut()
    }

    fn internal_mut(&mut self, handle: Handle) -> &mut InternalNode<K> {
        self.nodes.get_mut(handle).as_internal_mut()
    }

    /// Number of levels, counting the leaves.
    pub(crate) fn height(&self) -> usize {
        let mut height = 1;
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
            height += 1;
        }
        height
    }

    /// Drops every entry and node, leaving a single empty leaf.
    pub(crate) fn clear(&mut self) {
        self.nodes.clear();
        self.root = self.nodes.alloc(Node::Leaf(LeafNode::new()));
        self.len = 0;
    }

    /// Smallest key reachable under `handle`.
    ///
    /// Only non-root nodes are asked, and those are never empty.
    fn smallest_key(&self, handle: Handle) -> &K {
        let mut current = handle;
        loop {
            match self.nodes.get(current) {
                Node::Internal(internal) => current = internal.child(0),
                Node::Leaf(leaf) => return leaf.smallest_key().expect("non-root leaves are never empty"),
            }
        }
    }

    fn first_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(0);
        }
        current
    }

    fn last_leaf(&self) -> Handle {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.len() - 1);
        }
        current
    }

    /// Links `sibling` into the chain directly right of `handle`.
    fn link_right_of(&mut self, handle: Handle, sibling: Handle) {
        let old_right = self.nodes.get(handle).right();
        let node = self.nodes.get_mut(sibling);
        node.set_left(Some(handle));
        node.set_right(old_right);
        self.nodes.get_mut(handle).set_right(Some(sibling));
        if let Some(old_right) = old_right {
            self.nodes.get_mut(old_right).set_left(Some(sibling));
        }
    }

    /// Repairs the back link of whatever follows `survivor` after it adopted the
    /// right link of an absorbed node.
    fn relink_after_join(&mut self, survivor: Handle, absorbed: Handle) {
        debug_assert!(!self.nodes.contains(absorbed), "absorbed node is still allocated");
        if let Some(next) = self.nodes.get(survivor).right() {
            self.nodes.get_mut(next).set_left(Some(survivor));
        }
    }

    /// Collapses a root with a single child into that child.
    fn trim_root(&mut self) {
        if let Node::Internal(root) = self.nodes.get(self.root)
            && root.len() == 1
        {
            let child = root.child(0);
            self.nodes.free(self.root);
            trace!(old_root = %self.root, new_root = %child, "root trimmed");
            self.root = child;
            debug_assert!(self.nodes.get(child).left().is_none() && self.nodes.get(child).right().is_none());
        }
    }

    // ─── Leaf-level positions ────────────────────────────────────────────────

    /// Returns the entry stored at `position`.
    pub(crate) fn entry(&self, position: Position) -> (&K, &V) {
        self.nodes.get(position.leaf).as_leaf().entry(position.index)
    }

    pub(crate) fn first_position(&self) -> Option<Position> {
        self.forward_from(self.first_leaf(), 0)
    }

    pub(crate) fn last_position(&self) -> Option<Position> {
        let leaf = self.last_leaf();
        self.backward_from(leaf, self.nodes.get(leaf).len())
    }

    pub(crate) fn next_position(&self, position: Position) -> Option<Position> {
        self.forward_from(position.leaf, position.index + 1)
    }

    pub(crate) fn prev_position(&self, position: Position) -> Option<Position> {
        self.backward_from(position.leaf, position.index)
    }

    /// The first entry at or after `index` in `leaf`, following right links.
    fn forward_from(&self, mut leaf: Handle, mut index: usize) -> Option<Position> {
        loop {
            let node = self.nodes.get(leaf);
            if index < node.len() {
                return Some(Position { leaf, index });
            }
            leaf = node.right()?;
            index = 0;
        }
    }

    /// The last entry strictly before `end` in `leaf`, following left links.
    fn backward_from(&self, mut leaf: Handle, mut end: usize) -> Option<Position> {
        loop {
            if end > 0 {
                return Some(Position { leaf, index: end - 1 });
            }
            leaf = self.nodes.get(leaf).left()?;
            end = self.nodes.get(leaf).len();
        }
    }
}

impl<K: Ord + Clone, V: PartialEq> RawMultiKeyTree<K, V> {
    /// Returns true if the exact pair `(key, value)` is stored.
    pub(crate) fn contains(&self, key: &K, value: &V) -> bool {
        self.contains_in(self.root, key, value)
    }

    fn contains_in(&self, handle: Handle, key: &K, value: &V) -> bool {
        match self.nodes.get(handle) {
            Node::Leaf(leaf) => leaf.position(key, value).is_some(),
            Node::Internal(internal) => internal
                .candidate_children(key)
                .any(|i| self.contains_in(internal.child(i), key, value)),
        }
    }

    /// First entry with a key `>= key`.
    pub(crate) fn lower_bound(&self, key: &K) -> Option<Position> {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.lower_child(key));
        }
        let index = self.nodes.get(current).as_leaf().lower_bound(key);
        self.forward_from(current, index)
    }

    /// Last entry with a key `<= key`.
    pub(crate) fn upper_bound(&self, key: &K) -> Option<Position> {
        let mut current = self.root;
        while let Node::Internal(internal) = self.nodes.get(current) {
            current = internal.child(internal.insertion_child(key));
        }
        let end = self.nodes.get(current).as_leaf().upper_bound(key);
        self.backward_from(current, end)
    }

    // ─── Insertion ───────────────────────────────────────────────────────────

    /// Inserts the pair, growing the tree by one level if the root splits.
    pub(crate) fn insert(&mut self, key: K, value: V) {
        if let InsertResult::Split { separator, sibling } = self.insert_into(self.root, key, value) {
            let old_root = self.root;
            self.root = self
                .nodes
                .alloc(Node::Internal(InternalNode::new_root(old_root, separator, sibling)));
            trace!(old_root = %old_root, new_root = %self.root, "root grown");
        }
        self.len += 1;
    }

    fn insert_into(&mut self, handle: Handle, key: K, value: V) -> InsertResult<K> {
        let (index, child) = match self.nodes.get_mut(handle) {
            Node::Leaf(leaf) => {
                if leaf.insert(key, value) <= self.order.get() {
                    return InsertResult::Fit;
                }
                return self.split_leaf(handle);
            }
            Node::Internal(internal) => {
                let index = internal.insertion_child(&key);
                (index, internal.child(index))
            }
        };

        let InsertResult::Split { separator, sibling } = self.insert_into(child, key, value) else {
            return InsertResult::Fit;
        };
        let internal = self.internal_mut(handle);
        internal.insert_child(index, separator, sibling);
        if internal.len() <= self.order.get() {
            return InsertResult::Fit;
        }
        self.split_internal(handle)
    }

    fn split_leaf(&mut self, handle: Handle) -> InsertResult<K> {
        let leaf = self.leaf_mut(handle);
        let right = leaf.split_off(leaf.len() / 2);
        let separator = right.smallest_key().cloned().expect("upper half of a split is never empty");

        let sibling = self.nodes.alloc(Node::Leaf(right));
        self.link_right_of(handle, sibling);
        trace!(node = %handle, sibling = %sibling, "leaf split");

        InsertResult::Split { separator, sibling }
    }

    fn split_internal(&mut self, handle: Handle) -> InsertResult<K> {
        let internal = self.internal_mut(handle);
        let (separator, right) = internal.split_off(internal.len() / 2);

        let sibling = self.nodes.alloc(Node::Internal(right));
        self.link_right_of(handle, sibling);
        trace!(node = %handle, sibling = %sibling, "internal node split");

        InsertResult::Split { separator, sibling }
    }

    // ─── Removal ─────────────────────────────────────────────────────────────

    /// Removes the first stored copy of `(key, value)`. Returns false if there
    /// was none.
    pub(crate) fn remove(&mut self, key: &K, value: &V) -> bool {
        let removal = self.remove_from(self.root, key, value, true, CanJoin::NONE);
        self.trim_root();
        if removal.removed {
            self.len -= 1;
        }
        removal.removed
    }

    fn remove_from(&mut self, handle: Handle, key: &K, value: &V, is_root: bool, can_join: CanJoin) -> Removal<K> {
        if self.nodes.get(handle).is_leaf() {
            self.remove_from_leaf(handle, key, value, is_root, can_join)
        } else {
            self.remove_from_internal(handle, key, value, is_root, can_join)
        }
    }

    fn remove_from_leaf(&mut self, handle: Handle, key: &K, value: &V, is_root: bool, can_join: CanJoin) -> Removal<K> {
        let half = self.order.half();
        let leaf = self.leaf_mut(handle);
        let Some(index) = leaf.position(key, value) else {
            return Removal::missing();
        };
        leaf.remove(index);

        let smallest_key = if index == 0 { leaf.smallest_key().cloned() } else { None };
        if is_root || leaf.len() >= half {
            return Removal::removed(smallest_key);
        }
        self.rebalance_leaf(handle, can_join, smallest_key)
    }

    fn remove_from_internal(
        &mut self,
        handle: Handle,
        key: &K,
        value: &V,
        is_root: bool,
        can_join: CanJoin,
    ) -> Removal<K> {
        let internal = self.nodes.get(handle).as_internal();
        let child_count = internal.len();

        for index in internal.candidate_children(key) {
            let child = self.nodes.get(handle).as_internal().child(index);
            let removal = self.remove_from(child, key, value, false, CanJoin::for_child(index, child_count));
            if removal.removed {
                return self.absorb_child_removal(handle, index, removal, is_root, can_join);
            }
        }
        Removal::missing()
    }

    /// Applies what `children[index]` reported after a removal below it, then
    /// repairs this node if it lost a child and fell under half occupancy.
    fn absorb_child_removal(
        &mut self,
        handle: Handle,
        index: usize,
        removal: Removal<K>,
        is_root: bool,
        can_join: CanJoin,
    ) -> Removal<K> {
        let half = self.order.half();
        let internal = self.internal_mut(handle);

        if let Some(key) = removal.right_smallest_key {
            internal.set_bound(index, key);
        }

        // The first child's smallest key is ours; it has no bound here.
        let mut smallest_key = removal.smallest_key;
        if index > 0
            && let Some(key) = smallest_key.take()
        {
            internal.set_bound(index - 1, key);
        }

        let Some(join) = removal.join else {
            return Removal::removed(smallest_key);
        };
        match join {
            Join::AbsorbedRight => internal.remove_child(index + 1),
            Join::IntoLeft => internal.remove_child(index),
        };

        if is_root || internal.len() >= half {
            return Removal::removed(smallest_key);
        }
        self.rebalance_internal(handle, can_join, smallest_key)
    }

    /// Picks how an underflowing node recovers: lend from the right, join the
    /// right, lend from the left, join the left, in that order of preference.
    fn plan_rebalance(&self, handle: Handle, can_join: CanJoin) -> Rebalance {
        let half = self.order.half();
        let node = self.nodes.get(handle);
        let right = node.right().filter(|_| can_join.right);
        let left = node.left().filter(|_| can_join.left);

        if let Some(right) = right {
            if self.nodes.get(right).len() > half {
                return Rebalance::BorrowRight(right);
            }
            if left.is_none_or(|left| self.nodes.get(left).len() <= half) {
                return Rebalance::JoinRight(right);
            }
        }

        let Some(left) = left else {
            unreachable!("underflowing node {handle} has no sibling under its parent");
        };
        if self.nodes.get(left).len() > half {
            Rebalance::BorrowLeft(left)
        } else {
            Rebalance::JoinLeft(left)
        }
    }

    fn rebalance_leaf(&mut self, handle: Handle, can_join: CanJoin, smallest_key: Option<K>) -> Removal<K> {
        match self.plan_rebalance(handle, can_join) {
            Rebalance::BorrowRight(right) => {
                let donor = self.leaf_mut(right);
                let (key, value) = donor.pop_front();
                let right_smallest_key = donor.smallest_key().cloned();
                self.leaf_mut(handle).push_back(key, value);
                trace!(node = %handle, donor = %right, "leaf borrowed from right");
                Removal {
                    removed: true,
                    join: None,
                    smallest_key,
                    right_smallest_key,
                }
            }
            Rebalance::JoinRight(right) => {
                let absorbed = self.nodes.take(right).into_leaf();
                self.leaf_mut(handle).append(absorbed);
                self.relink_after_join(handle, right);
                trace!(node = %handle, absorbed = %right, "leaf joined right sibling");
                Removal::joined(Join::AbsorbedRight, smallest_key)
            }
            Rebalance::BorrowLeft(left) => {
                let (key, value) = self.leaf_mut(left).pop_back();
                let smallest_key = key.clone();
                self.leaf_mut(handle).push_front(key, value);
                trace!(node = %handle, donor = %left, "leaf borrowed from left");
                Removal::removed(Some(smallest_key))
            }
            Rebalance::JoinLeft(left) => {
                let absorbed = self.nodes.take(handle).into_leaf();
                self.leaf_mut(left).append(absorbed);
                self.relink_after_join(left, handle);
                trace!(node = %left, absorbed = %handle, "leaf joined into left sibling");
                Removal::joined(Join::IntoLeft, None)
            }
        }
    }

    fn rebalance_internal(&mut self, handle: Handle, can_join: CanJoin, smallest_key: Option<K>) -> Removal<K> {
        match self.plan_rebalance(handle, can_join) {
            Rebalance::BorrowRight(right) => {
                let (child, right_smallest_key) = self.internal_mut(right).pop_front();
                let bound = self.smallest_key(child).clone();
                self.internal_mut(handle).push_back(bound, child);
                trace!(node = %handle, donor = %right, "internal node borrowed from right");
                Removal {
                    removed: true,
                    join: None,
                    smallest_key,
                    right_smallest_key: Some(right_smallest_key),
                }
            }
            Rebalance::JoinRight(right) => {
                let absorbed = self.nodes.take(right).into_internal();
                let separator = self.smallest_key(absorbed.child(0)).clone();
                self.internal_mut(handle).append(separator, absorbed);
                self.relink_after_join(handle, right);
                trace!(node = %handle, absorbed = %right, "internal node joined right sibling");
                Removal::joined(Join::AbsorbedRight, smallest_key)
            }
            Rebalance::BorrowLeft(left) => {
                let (moved_smallest_key, child) = self.internal_mut(left).pop_back();
                let bound = self.smallest_key(self.nodes.get(handle).as_internal().child(0)).clone();
                self.internal_mut(handle).push_front(child, bound);
                trace!(node = %handle, donor = %left, "internal node borrowed from left");
                Removal::removed(Some(moved_smallest_key))
            }
            Rebalance::JoinLeft(left) => {
                let absorbed = self.nodes.take(handle).into_internal();
                let separator = self.smallest_key(absorbed.child(0)).clone();
                self.internal_mut(left).append(separator, absorbed);
                self.relink_after_join(left, handle);
                trace!(node = %left, absorbed = %handle, "internal node joined into left sibling");
                Removal::joined(Join::IntoLeft, None)
            }
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use alloc::format;
    use alloc::string::String;
    use alloc::vec::Vec;
    use core::fmt::Debug;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    impl<K: Ord + Clone + Debug, V> RawMultiKeyTree<K, V> {
        /// Validates every structural invariant. Panics with a list of the
        /// violations found.
        pub(crate) fn check_invariants(&self) {
            let mut errors: Vec<String> = Vec::new();
            let mut levels: Vec<Vec<Handle>> = Vec::new();
            let mut leaf_depth: Option<usize> = None;

            let root = self.nodes.get(self.root);
            if root.left().is_some() || root.right().is_some() {
                errors.push(format!("root {} has sibling links", self.root));
            }
            if let Node::Internal(internal) = root
                && internal.len() < 2
            {
                errors.push(format!("internal root {} has {} child", self.root, internal.len()));
            }

            let count = self.check_node(self.root, 0, &mut leaf_depth, &mut levels, &mut errors);
            if count != self.len {
                errors.push(format!("len mismatch: self.len={}, actual count={count}", self.len));
            }

            for (depth, level) in levels.iter().enumerate() {
                for (i, &handle) in level.iter().enumerate() {
                    let node = self.nodes.get(handle);
                    let expected_left = i.checked_sub(1).map(|j| level[j]);
                    let expected_right = level.get(i + 1).copied();
                    if node.left() != expected_left {
                        errors.push(format!(
                            "left link of {handle} at depth {depth}: expected {expected_left:?}, got {:?}",
                            node.left()
                        ));
                    }
                    if node.right() != expected_right {
                        errors.push(format!(
                            "right link of {handle} at depth {depth}: expected {expected_right:?}, got {:?}",
                            node.right()
                        ));
                    }
                }
            }

            let reachable: usize = levels.iter().map(Vec::len).sum();
            if reachable != self.nodes.len() {
                errors.push(format!("{} nodes allocated but {reachable} reachable", self.nodes.len()));
            }

            let mut previous: Option<&K> = None;
            let mut position = self.first_position();
            while let Some(current) = position {
                let (key, _) = self.entry(current);
                if previous.is_some_and(|previous| previous > key) {
                    errors.push(format!("leaf walk out of order at {current:?}: {previous:?} > {key:?}"));
                }
                previous = Some(key);
                position = self.next_position(current);
            }

            assert!(errors.is_empty(), "Tree invariant violations:\n{}", errors.join("\n"));
        }

        /// Returns the number of entries under `handle`.
        fn check_node(
            &self,
            handle: Handle,
            depth: usize,
            leaf_depth: &mut Option<usize>,
            levels: &mut Vec<Vec<Handle>>,
            errors: &mut Vec<String>,
        ) -> usize {
            if levels.len() == depth {
                levels.push(Vec::new());
            }
            levels[depth].push(handle);

            let node = self.nodes.get(handle);
            let lower = if handle == self.root { 0 } else { self.order.half() };
            if !(lower..=self.order.get()).contains(&node.len()) {
                errors.push(format!(
                    "node {handle} at depth {depth} holds {} (allowed {lower}..={})",
                    node.len(),
                    self.order
                ));
            }

            match node {
                Node::Leaf(leaf) => {
                    match *leaf_depth {
                        None => *leaf_depth = Some(depth),
                        Some(expected) if expected != depth => {
                            errors.push(format!("leaf {handle} at depth {depth}, expected {expected}"));
                        }
                        Some(_) => {}
                    }
                    if leaf.keys().len() != leaf.values().len() {
                        errors.push(format!("leaf {handle} has mismatched key/value buffers"));
                    }
                    if !leaf.keys().is_sorted() {
                        errors.push(format!("leaf {handle} keys not sorted: {:?}", leaf.keys()));
                    }
                    leaf.len()
                }
                Node::Internal(internal) => {
                    if internal.bounds().len() + 1 != internal.len() {
                        errors.push(format!(
                            "internal {handle} has {} bounds for {} children",
                            internal.bounds().len(),
                            internal.len()
                        ));
                        return 0;
                    }
                    let mut total = 0;
                    for (i, &child) in internal.children().iter().enumerate() {
                        total += self.check_node(child, depth + 1, leaf_depth, levels, errors);
                        if i > 0 {
                            let bound = &internal.bounds()[i - 1];
                            let smallest = self.smallest_key(child);
                            if bound != smallest {
                                errors.push(format!(
                                    "bound {} of {handle} is {bound:?}, child {child} starts at {smallest:?}",
                                    i - 1
                                ));
                            }
                        }
                    }
                    total
                }
            }
        }

        fn entries(&self) -> Vec<(K, V)>
        where
            V: Clone,
        {
            let mut entries = Vec::new();
            let mut position = self.first_position();
            while let Some(current) = position {
                let (key, value) = self.entry(current);
                entries.push((key.clone(), value.clone()));
                position = self.next_position(current);
            }
            entries
        }
    }

    fn tree(order: usize) -> RawMultiKeyTree<i32, char> {
        RawMultiKeyTree::new(Order::new(order).unwrap())
    }

    #[test]
    fn new_tree_is_a_single_empty_leaf() {
        let tree = tree(4);
        tree.check_invariants();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);
        assert!(tree.node(tree.root()).is_leaf());
        assert_eq!(tree.first_position(), None);
        assert_eq!(tree.last_position(), None);
    }

    #[test]
    fn equal_keys_are_stacked_newest_first() {
        let mut tree = tree(4);
        tree.insert(5, 'a');
        tree.insert(5, 'b');
        tree.insert(5, 'c');

        assert_eq!(tree.entries(), [(5, 'c'), (5, 'b'), (5, 'a')]);
        assert!(tree.remove(&5, &'b'));
        assert!(!tree.contains(&5, &'b'));
        assert!(tree.contains(&5, &'a'));
        assert!(tree.contains(&5, &'c'));
        tree.check_invariants();
    }

    #[test]
    fn first_split_grows_a_root() {
        let mut tree = tree(4);
        for (key, value) in [(1, 'a'), (2, 'b'), (3, 'c'), (4, 'd')] {
            tree.insert(key, value);
        }
        assert_eq!(tree.height(), 1);

        tree.insert(5, 'e');
        tree.check_invariants();
        assert_eq!(tree.height(), 2);

        let root = tree.node(tree.root()).as_internal();
        assert_eq!(root.bounds(), &[3]);
        assert_eq!(tree.node(root.child(0)).as_leaf().keys(), &[1, 2]);
        assert_eq!(tree.node(root.child(1)).as_leaf().keys(), &[3, 4, 5]);
    }

    #[test]
    fn join_after_split_restores_a_single_leaf() {
        let mut tree = tree(4);
        for (key, value) in [(1, 'a'), (2, 'b'), (3, 'c'), (4, 'd'), (5, 'e')] {
            tree.insert(key, value);
        }
        assert!(tree.remove(&1, &'a'));
        tree.check_invariants();
        // Left leaf underflowed with a right sibling holding more than half.
        assert_eq!(tree.height(), 2);

        assert!(tree.remove(&2, &'b'));
        tree.check_invariants();
        assert_eq!(tree.height(), 1);
        assert_eq!(tree.entries(), [(3, 'c'), (4, 'd'), (5, 'e')]);
    }

    #[test]
    fn run_of_equal_keys_spanning_many_leaves() {
        let mut tree = tree(4);
        let values: Vec<char> = ('a'..='z').collect();
        for &value in &values {
            tree.insert(7, value);
        }
        tree.check_invariants();
        assert!(tree.height() > 2);

        for &value in &values {
            assert!(tree.contains(&7, &value), "missing (7, {value:?})");
        }
        for &value in values.iter().step_by(3).chain(values.iter().rev()) {
            let expected = tree.contains(&7, &value);
            assert_eq!(tree.remove(&7, &value), expected);
            assert!(!tree.contains(&7, &value));
            tree.check_invariants();
        }
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);
    }

    #[test]
    fn draining_from_either_end_keeps_the_tree_balanced() {
        for order in [4, 6] {
            let mut from_left = tree(order);
            let mut from_right = tree(order);
            for key in 0..300 {
                from_left.insert(key, 'x');
                from_right.insert(key, 'x');
            }

            for key in 0..300 {
                assert!(from_left.remove(&key, &'x'));
                assert!(from_right.remove(&(299 - key), &'x'));
                from_left.check_invariants();
                from_right.check_invariants();
            }
            assert_eq!(from_left.height(), 1);
            assert_eq!(from_right.height(), 1);
        }
    }

    #[test]
    fn removing_a_missing_pair_changes_nothing() {
        let mut tree = tree(4);
        for key in 0..20 {
            tree.insert(key, 'x');
        }
        let before = tree.entries();

        assert!(!tree.remove(&5, &'y'));
        assert!(!tree.remove(&100, &'x'));
        tree.check_invariants();
        assert_eq!(tree.entries(), before);
        assert_eq!(tree.len(), 20);
    }

    #[test]
    fn bounds_search_across_leaves() {
        let mut tree = tree(4);
        for key in (0..40).step_by(2) {
            tree.insert(key, 'x');
        }

        let key_at = |position: Option<Position>| position.map(|p| *tree.entry(p).0);
        assert_eq!(key_at(tree.lower_bound(&-1)), Some(0));
        assert_eq!(key_at(tree.lower_bound(&7)), Some(8));
        assert_eq!(key_at(tree.lower_bound(&8)), Some(8));
        assert_eq!(key_at(tree.lower_bound(&39)), None);

        assert_eq!(key_at(tree.upper_bound(&-1)), None);
        assert_eq!(key_at(tree.upper_bound(&7)), Some(6));
        assert_eq!(key_at(tree.upper_bound(&8)), Some(8));
        assert_eq!(key_at(tree.upper_bound(&100)), Some(38));

        assert_eq!(key_at(tree.first_position()), Some(0));
        assert_eq!(key_at(tree.last_position()), Some(38));
    }

    #[test]
    fn clear_resets_to_an_empty_leaf() {
        let mut tree = tree(4);
        for key in 0..50 {
            tree.insert(key, 'x');
        }
        tree.clear();
        tree.check_invariants();
        assert_eq!(tree.len(), 0);
        assert_eq!(tree.height(), 1);

        tree.insert(1, 'y');
        assert!(tree.contains(&1, &'y'));
    }

    #[derive(Clone, Debug)]
    enum Op {
        Insert(i16, u8),
        Remove(i16, u8),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        // A narrow key range with several values per key keeps equal-key runs
        // long enough to straddle bounds.
        prop_oneof![
            3 => (0i16..48, 0u8..4).prop_map(|(k, v)| Op::Insert(k, v)),
            2 => (0i16..48, 0u8..4).prop_map(|(k, v)| Op::Remove(k, v)),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn invariants_hold_after_every_operation(
            order in prop_oneof![Just(4usize), Just(6), Just(8)],
            ops in prop::collection::vec(op_strategy(), 0..400),
        ) {
            let mut tree: RawMultiKeyTree<i16, u8> = RawMultiKeyTree::new(Order::new(order).unwrap());
            let mut model: Vec<(i16, u8)> = Vec::new();

            for op in ops {
                match op {
                    Op::Insert(key, value) => {
                        tree.insert(key, value);
                        model.push((key, value));
                    }
                    Op::Remove(key, value) => {
                        let expected = model
                            .iter()
                            .position(|&entry| entry == (key, value))
                            .map(|index| model.swap_remove(index))
                            .is_some();
                        prop_assert_eq!(tree.remove(&key, &value), expected, "remove({}, {})", key, value);
                    }
                }
                tree.check_invariants();
            }

            let mut stored = tree.entries();
            stored.sort_unstable();
            model.sort_unstable();
            prop_assert_eq!(stored, model);
        }
    }
}
