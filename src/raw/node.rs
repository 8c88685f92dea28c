use core::ops::RangeInclusive;

use smallvec::SmallVec;

use super::handle::Handle;

/// Entries (or children) kept inline before a node buffer spills to the heap.
///
/// The order is chosen at runtime, so this only sizes the inline buffer; nodes of
/// wider trees allocate.
#[cfg(test)]
pub(crate) const INLINE: usize = 4;
#[cfg(not(test))]
pub(crate) const INLINE: usize = 8;

type Keys<K> = SmallVec<[K; INLINE]>;
type Values<V> = SmallVec<[V; INLINE]>;
type Children = SmallVec<[Handle; INLINE]>;

#[allow(clippy::large_enum_variant)]
pub(crate) enum Node<K, V> {
    Internal(InternalNode<K>),
    Leaf(LeafNode<K, V>),
}

// Internal nodes: `bounds[i]` is the smallest key reachable under `children[i + 1]`.
pub(crate) struct InternalNode<K> {
    left: Option<Handle>,
    right: Option<Handle>,
    bounds: Keys<K>,
    children: Children,
}

// Leaves: parallel key/value buffers, sorted by key.
pub(crate) struct LeafNode<K, V> {
    left: Option<Handle>,
    right: Option<Handle>,
    keys: Keys<K>,
    values: Values<V>,
}

impl<K, V> Node<K, V> {
    pub(crate) fn is_leaf(&self) -> bool {
        matches!(self, Node::Leaf(_))
    }

    /// Returns the leaf node, panicking if this is not a leaf.
    pub(crate) fn as_leaf(&self) -> &LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the leaf node mutably, panicking if this is not a leaf.
    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    /// Returns the internal node, panicking if this is not internal.
    pub(crate) fn as_internal(&self) -> &InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Returns the internal node mutably, panicking if this is not internal.
    pub(crate) fn as_internal_mut(&mut self) -> &mut InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    pub(crate) fn into_leaf(self) -> LeafNode<K, V> {
        match self {
            Node::Leaf(leaf) => leaf,
            Node::Internal(_) => panic!("expected leaf node"),
        }
    }

    pub(crate) fn into_internal(self) -> InternalNode<K> {
        match self {
            Node::Internal(internal) => internal,
            Node::Leaf(_) => panic!("expected internal node"),
        }
    }

    /// Entries of a leaf, children of an internal node.
    pub(crate) fn len(&self) -> usize {
        match self {
            Node::Internal(internal) => internal.len(),
            Node::Leaf(leaf) => leaf.len(),
        }
    }

    pub(crate) fn left(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.left,
            Node::Leaf(leaf) => leaf.left,
        }
    }

    pub(crate) fn right(&self) -> Option<Handle> {
        match self {
            Node::Internal(internal) => internal.right,
            Node::Leaf(leaf) => leaf.right,
        }
    }

    pub(crate) fn set_left(&mut self, left: Option<Handle>) {
        match self {
            Node::Internal(internal) => internal.left = left,
            Node::Leaf(leaf) => leaf.left = left,
        }
    }

    pub(crate) fn set_right(&mut self, right: Option<Handle>) {
        match self {
            Node::Internal(internal) => internal.right = right,
            Node::Leaf(leaf) => leaf.right = right,
        }
    }
}

impl<K> InternalNode<K> {
    /// Creates a root-level node over two halves of a split.
    pub(crate) fn new_root(left: Handle, separator: K, right: Handle) -> Self {
        let mut bounds = Keys::new();
        bounds.push(separator);
        let mut children = Children::new();
        children.push(left);
        children.push(right);
        Self {
            left: None,
            right: None,
            bounds,
            children,
        }
    }

    /// Returns the number of children.
    pub(crate) fn len(&self) -> usize {
        self.children.len()
    }

    pub(crate) fn bounds(&self) -> &[K] {
        &self.bounds
    }

    pub(crate) fn children(&self) -> &[Handle] {
        &self.children
    }

    #[inline]
    pub(crate) fn child(&self, index: usize) -> Handle {
        self.children[index]
    }

    /// The single child an insertion of `key` descends into: the one before the
    /// first bound strictly greater than `key`.
    #[inline]
    pub(crate) fn insertion_child(&self, key: &K) -> usize
    where
        K: Ord,
    {
        self.bounds.partition_point(|bound| bound <= key)
    }

    /// The first child that may hold an entry with a key `>= key`.
    #[inline]
    pub(crate) fn lower_child(&self, key: &K) -> usize
    where
        K: Ord,
    {
        self.bounds.partition_point(|bound| bound < key)
    }

    /// Every child that may hold an entry with exactly `key`.
    ///
    /// Duplicate keys can straddle a bound after a split, so a run of equal keys
    /// may span several children.
    pub(crate) fn candidate_children(&self, key: &K) -> RangeInclusive<usize>
    where
        K: Ord,
    {
        self.lower_child(key)..=self.insertion_child(key)
    }

    /// Inserts `child` right after `children[index]`, separated by `separator`.
    pub(crate) fn insert_child(&mut self, index: usize, separator: K, child: Handle) {
        self.bounds.insert(index, separator);
        self.children.insert(index + 1, child);
    }

    /// Drops `children[index]` together with the bound on its left.
    pub(crate) fn remove_child(&mut self, index: usize) -> Handle {
        debug_assert!(index > 0, "the first child has no bound on its left");
        self.bounds.remove(index - 1);
        self.children.remove(index)
    }

    pub(crate) fn set_bound(&mut self, index: usize, bound: K) {
        self.bounds[index] = bound;
    }

    pub(crate) fn push_back(&mut self, bound: K, child: Handle) {
        self.bounds.push(bound);
        self.children.push(child);
    }

    pub(crate) fn push_front(&mut self, child: Handle, bound: K) {
        self.bounds.insert(0, bound);
        self.children.insert(0, child);
    }

    /// Removes the last child and the bound that led to it.
    pub(crate) fn pop_back(&mut self) -> (K, Handle) {
        let bound = self.bounds.pop().expect("internal node has at least two children");
        let child = self.children.pop().expect("internal node has at least two children");
        (bound, child)
    }

    /// Removes the first child. The returned bound is the new smallest key of
    /// this node.
    pub(crate) fn pop_front(&mut self) -> (Handle, K) {
        let child = self.children.remove(0);
        let bound = self.bounds.remove(0);
        (child, bound)
    }

    /// Moves `children[at..]` into a new node without links. The bound between
    /// the halves is returned and kept by neither.
    pub(crate) fn split_off(&mut self, at: usize) -> (K, InternalNode<K>) {
        debug_assert!(at > 0 && at < self.children.len());
        let children: Children = self.children.drain(at..).collect();
        let bounds: Keys<K> = self.bounds.drain(at..).collect();
        let separator = self.bounds.pop().expect("split point leaves a bound on the left");
        let right = InternalNode {
            left: None,
            right: None,
            bounds,
            children,
        };
        (separator, right)
    }

    /// Appends every child of `right`, using `separator` as the bound between
    /// the two runs, and adopts its right link.
    pub(crate) fn append(&mut self, separator: K, right: InternalNode<K>) {
        self.bounds.push(separator);
        self.bounds.extend(right.bounds);
        self.children.extend(right.children);
        self.right = right.right;
    }
}

impl<K, V> LeafNode<K, V> {
    pub(crate) fn new() -> Self {
        Self {
            left: None,
            right: None,
            keys: Keys::new(),
            values: Values::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.keys.len()
    }

    pub(crate) fn keys(&self) -> &[K] {
        &self.keys
    }

    pub(crate) fn values(&self) -> &[V] {
        &self.values
    }

    #[inline]
    pub(crate) fn entry(&self, index: usize) -> (&K, &V) {
        (&self.keys[index], &self.values[index])
    }

    pub(crate) fn smallest_key(&self) -> Option<&K> {
        self.keys.first()
    }

    /// Index of the first entry with a key `>= key`.
    #[inline]
    pub(crate) fn lower_bound(&self, key: &K) -> usize
    where
        K: Ord,
    {
        self.keys.partition_point(|k| k < key)
    }

    /// Index of the first entry with a key `> key`.
    #[inline]
    pub(crate) fn upper_bound(&self, key: &K) -> usize
    where
        K: Ord,
    {
        self.keys.partition_point(|k| k <= key)
    }

    /// Index of the first entry equal to the pair `(key, value)`.
    pub(crate) fn position(&self, key: &K, value: &V) -> Option<usize>
    where
        K: Ord,
        V: PartialEq,
    {
        let start = self.lower_bound(key);
        self.keys[start..]
            .iter()
            .zip(&self.values[start..])
            .take_while(|(k, _)| *k == key)
            .position(|(_, v)| v == value)
            .map(|offset| start + offset)
    }

    /// Inserts in front of every entry with an equal key and returns the new
    /// entry count.
    pub(crate) fn insert(&mut self, key: K, value: V) -> usize
    where
        K: Ord,
    {
        let index = self.lower_bound(&key);
        self.keys.insert(index, key);
        self.values.insert(index, value);
        self.keys.len()
    }

    pub(crate) fn remove(&mut self, index: usize) -> (K, V) {
        let key = self.keys.remove(index);
        let value = self.values.remove(index);
        (key, value)
    }

    pub(crate) fn push_back(&mut self, key: K, value: V) {
        self.keys.push(key);
        self.values.push(value);
    }

    pub(crate) fn push_front(&mut self, key: K, value: V) {
        self.keys.insert(0, key);
        self.values.insert(0, value);
    }

    pub(crate) fn pop_back(&mut self) -> (K, V) {
        let key = self.keys.pop().expect("donor leaf is not empty");
        let value = self.values.pop().expect("donor leaf is not empty");
        (key, value)
    }

    pub(crate) fn pop_front(&mut self) -> (K, V) {
        self.remove(0)
    }

    /// Moves entries `at..` into a new leaf without links.
    pub(crate) fn split_off(&mut self, at: usize) -> LeafNode<K, V> {
        LeafNode {
            left: None,
            right: None,
            keys: self.keys.drain(at..).collect(),
            values: self.values.drain(at..).collect(),
        }
    }

    /// Appends every entry of `right` and adopts its right link.
    pub(crate) fn append(&mut self, right: LeafNode<K, V>) {
        self.keys.extend(right.keys);
        self.values.extend(right.values);
        self.right = right.right;
    }
}
