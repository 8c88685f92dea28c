use core::fmt;

use crate::raw::RawMultiKeyTree;
use crate::{Order, OrderError};

mod range;
mod render;

pub use range::{AllBiggerThan, AllLessThan, Iter};

/// An ordered index of values under derived, possibly repeated keys, based on
/// a [B+ tree].
///
/// Each value's key is computed by the `keygen` function given at construction.
/// Values are kept in key order. A new value goes in front of the values
/// sharing its key in the leaf it lands in.
/// Because keys repeat, a value is addressed by the exact `(key, value)` pair:
/// [`has`](Self::has) and [`remove`](Self::remove) compare candidates with
/// [`PartialEq`] after narrowing them down by key.
///
/// The key function must be pure: a value must derive the same key every time
/// it is asked. A key function that changes its answer while a value is stored
/// is a logic error; the tree will not find or remove that value, but will
/// stay memory safe.
///
/// # Examples
///
/// ```
/// use multikey_bptree::MultiKeyBPlusTree;
///
/// // Index words by their length.
/// let mut words = MultiKeyBPlusTree::new(4, |word: &&str| word.len());
/// words.extend(["tree", "leaf", "root", "node", "branch", "key"]);
///
/// assert_eq!(words.len(), 6);
/// assert!(words.has(&"leaf"));
///
/// // Every other word at most as long as "node", shortest first.
/// let short: Vec<_> = words.all_less_than(&"node").copied().collect();
/// assert_eq!(short, ["key", "root", "leaf", "tree"]);
///
/// assert!(words.remove(&"leaf"));
/// assert!(!words.remove(&"leaf"));
/// ```
///
/// [B+ tree]: https://en.wikipedia.org/wiki/B%2B_tree
pub struct MultiKeyBPlusTree<K, V, F> {
    raw: RawMultiKeyTree<K, V>,
    keygen: F,
}

impl<K, V, F> MultiKeyBPlusTree<K, V, F>
where
    F: Fn(&V) -> K,
{
    /// Makes a new, empty tree whose nodes hold at most `order` entries.
    ///
    /// # Panics
    ///
    /// Panics if `order` is odd or not greater than two.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let tree = MultiKeyBPlusTree::new(16, |v: &i32| v.abs());
    /// assert!(tree.is_empty());
    /// ```
    #[must_use]
    pub fn new(order: usize, keygen: F) -> Self {
        match Self::try_new(order, keygen) {
            Ok(tree) => tree,
            Err(error) => panic!("{error}"),
        }
    }

    /// Makes a new, empty tree, rejecting an invalid `order`.
    ///
    /// # Errors
    ///
    /// Returns an [`OrderError`] if `order` is odd or not greater than two.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::{MultiKeyBPlusTree, OrderError};
    ///
    /// assert!(MultiKeyBPlusTree::try_new(8, |v: &u8| *v).is_ok());
    /// assert_eq!(MultiKeyBPlusTree::try_new(7, |v: &u8| *v).err(), Some(OrderError::Odd(7)));
    /// ```
    pub fn try_new(order: usize, keygen: F) -> Result<Self, OrderError> {
        Ok(Self::with_order(Order::new(order)?, keygen))
    }

    /// Makes a new, empty tree with an already validated order.
    #[must_use]
    pub fn with_order(order: Order, keygen: F) -> Self {
        Self {
            raw: RawMultiKeyTree::new(order),
            keygen,
        }
    }

    /// Makes a new, empty tree with [`Order::DEFAULT`].
    #[must_use]
    pub fn with_default_order(keygen: F) -> Self {
        Self::with_order(Order::DEFAULT, keygen)
    }
}

impl<K, V, F> MultiKeyBPlusTree<K, V, F> {
    /// Returns the number of values in the tree.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &u32| *v / 10);
    /// assert_eq!(tree.len(), 0);
    /// tree.insert(11);
    /// tree.insert(11);
    /// assert_eq!(tree.len(), 2);
    /// ```
    #[must_use]
    pub const fn len(&self) -> usize {
        self.raw.len()
    }

    /// Returns `true` if the tree contains no values.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the order the tree was built with.
    #[must_use]
    pub const fn order(&self) -> Order {
        self.raw.order()
    }

    /// Returns the number of levels, counting the leaf level. An empty tree has
    /// height 1.
    #[must_use]
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// Removes every value, keeping the order and key function.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &u32| *v);
    /// tree.extend(0..100);
    /// tree.clear();
    /// assert!(tree.is_empty());
    /// assert_eq!(tree.height(), 1);
    /// ```
    pub fn clear(&mut self) {
        self.raw.clear();
    }

    /// Gets an iterator over every `(key, value)` entry, in key order.
    ///
    /// Values sharing a key come out in storage order, which puts the newest
    /// value of a leaf before the older ones.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &char| v.is_uppercase());
    /// tree.extend(['a', 'B', 'c']);
    ///
    /// let entries: Vec<_> = tree.iter().collect();
    /// assert_eq!(entries, [(&false, &'c'), (&false, &'a'), (&true, &'B')]);
    /// ```
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter::new(&self.raw)
    }
}

impl<K, V, F> MultiKeyBPlusTree<K, V, F>
where
    K: Ord + Clone,
    V: PartialEq,
    F: Fn(&V) -> K,
{
    /// Inserts a value under its derived key.
    ///
    /// Inserting a value that is already stored keeps both copies.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &(u8, char)| v.0);
    /// tree.insert((5, 'a'));
    /// tree.insert((5, 'b'));
    /// tree.insert((5, 'c'));
    ///
    /// let values: Vec<_> = tree.iter().map(|(_, v)| v.1).collect();
    /// assert_eq!(values, ['c', 'b', 'a']);
    /// ```
    pub fn insert(&mut self, value: V) {
        let key = (self.keygen)(&value);
        self.raw.insert(key, value);
    }

    /// Removes one stored copy of `value`. Returns whether a copy was found.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &(u8, char)| v.0);
    /// tree.extend([(5, 'a'), (5, 'b'), (5, 'c')]);
    ///
    /// assert!(tree.remove(&(5, 'b')));
    /// assert!(!tree.remove(&(5, 'b')));
    /// assert!(tree.has(&(5, 'a')));
    /// assert!(tree.has(&(5, 'c')));
    /// ```
    pub fn remove(&mut self, value: &V) -> bool {
        let key = (self.keygen)(value);
        self.raw.remove(&key, value)
    }

    /// Returns `true` if `value` is stored.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &(u8, char)| v.0);
    /// tree.insert((1, 'x'));
    /// assert!(tree.has(&(1, 'x')));
    /// assert!(!tree.has(&(1, 'y')));
    /// ```
    #[must_use]
    pub fn has(&self, value: &V) -> bool {
        let key = (self.keygen)(value);
        self.raw.contains(&key, value)
    }

    /// Gets an iterator over every stored value whose key is greater than or
    /// equal to the key of `value`, except copies of `value` itself.
    ///
    /// Values come out in ascending key order; iterate from the back for the
    /// descending view. `value` does not have to be stored.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &(u8, char)| v.0);
    /// tree.extend([(3, 'x'), (3, 'y'), (5, 'z')]);
    ///
    /// let bigger: Vec<_> = tree.all_bigger_than(&(3, 'x')).collect();
    /// assert_eq!(bigger, [&(3, 'y'), &(5, 'z')]);
    ///
    /// let bigger: Vec<_> = tree.all_bigger_than(&(4, 'q')).collect();
    /// assert_eq!(bigger, [&(5, 'z')]);
    /// ```
    pub fn all_bigger_than<'a>(&'a self, value: &'a V) -> AllBiggerThan<'a, K, V> {
        let key = (self.keygen)(value);
        AllBiggerThan::new(&self.raw, key, value)
    }

    /// Gets an iterator over every stored value whose key is less than or equal
    /// to the key of `value`, except copies of `value` itself.
    ///
    /// Values come out in ascending key order; iterate from the back for the
    /// descending view. `value` does not have to be stored.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &(u8, char)| v.0);
    /// tree.extend([(3, 'x'), (3, 'y'), (5, 'z')]);
    ///
    /// let less: Vec<_> = tree.all_less_than(&(5, 'z')).collect();
    /// assert_eq!(less, [&(3, 'y'), &(3, 'x')]);
    ///
    /// let less: Vec<_> = tree.all_less_than(&(3, 'y')).rev().collect();
    /// assert_eq!(less, [&(3, 'x')]);
    /// ```
    pub fn all_less_than<'a>(&'a self, value: &'a V) -> AllLessThan<'a, K, V> {
        let key = (self.keygen)(value);
        AllLessThan::new(&self.raw, key, value)
    }
}

impl<K, V, F> Extend<V> for MultiKeyBPlusTree<K, V, F>
where
    K: Ord + Clone,
    V: PartialEq,
    F: Fn(&V) -> K,
{
    fn extend<I: IntoIterator<Item = V>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<'a, K, V, F> IntoIterator for &'a MultiKeyBPlusTree<K, V, F> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

impl<K: fmt::Debug, V: fmt::Debug, F> fmt::Debug for MultiKeyBPlusTree<K, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
