use core::fmt;
use core::iter::FusedIterator;

use crate::raw::{Position, RawMultiKeyTree};

/// A run of consecutive leaf entries, consumed from either end.
struct Span<'a, K, V> {
    tree: &'a RawMultiKeyTree<K, V>,
    front: Option<Position>,
    back: Option<Position>,
}

impl<K, V> Clone for Span<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            front: self.front,
            back: self.back,
        }
    }
}

impl<'a, K, V> Span<'a, K, V> {
    /// `front` and `back` are inclusive; either being `None` makes the span empty.
    fn new(tree: &'a RawMultiKeyTree<K, V>, front: Option<Position>, back: Option<Position>) -> Self {
        let (front, back) = front.zip(back).unzip();
        Self { tree, front, back }
    }

    fn pop_front(&mut self) -> Option<(&'a K, &'a V)> {
        let front = self.front?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.front = self.tree.next_position(front);
        }
        Some(self.tree.entry(front))
    }

    fn pop_back(&mut self) -> Option<(&'a K, &'a V)> {
        let back = self.back?;
        if self.front == self.back {
            self.front = None;
            self.back = None;
        } else {
            self.back = self.tree.prev_position(back);
        }
        Some(self.tree.entry(back))
    }
}

/// An iterator over the entries of a `MultiKeyBPlusTree`, in key order.
///
/// This `struct` is created by the [`iter`] method on [`MultiKeyBPlusTree`].
/// See its documentation for more.
///
/// [`iter`]: crate::MultiKeyBPlusTree::iter
/// [`MultiKeyBPlusTree`]: crate::MultiKeyBPlusTree
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct Iter<'a, K, V> {
    span: Span<'a, K, V>,
    remaining: usize,
}

impl<'a, K, V> Iter<'a, K, V> {
    pub(super) fn new(tree: &'a RawMultiKeyTree<K, V>) -> Self {
        Self {
            span: Span::new(tree, tree.first_position(), tree.last_position()),
            remaining: tree.len(),
        }
    }
}

impl<'a, K: 'a, V: 'a> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        let entry = self.span.pop_front()?;
        self.remaining -= 1;
        Some(entry)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }

    fn count(self) -> usize {
        self.remaining
    }
}

impl<'a, K: 'a, V: 'a> DoubleEndedIterator for Iter<'a, K, V> {
    fn next_back(&mut self) -> Option<(&'a K, &'a V)> {
        let entry = self.span.pop_back()?;
        self.remaining -= 1;
        Some(entry)
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}

impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            span: self.span.clone(),
            remaining: self.remaining,
        }
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Iter<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// Values of a span, minus every copy of one exact pair.
struct Excluding<'a, K, V> {
    span: Span<'a, K, V>,
    key: K,
    value: &'a V,
}

impl<'a, K: PartialEq, V: PartialEq> Excluding<'a, K, V> {
    fn is_excluded(&self, key: &K, value: &V) -> bool {
        *key == self.key && value == self.value
    }

    fn pop_front(&mut self) -> Option<&'a V> {
        loop {
            let (key, value) = self.span.pop_front()?;
            if !self.is_excluded(key, value) {
                return Some(value);
            }
        }
    }

    fn pop_back(&mut self) -> Option<&'a V> {
        loop {
            let (key, value) = self.span.pop_back()?;
            if !self.is_excluded(key, value) {
                return Some(value);
            }
        }
    }
}

impl<K: Clone, V> Clone for Excluding<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            span: self.span.clone(),
            key: self.key.clone(),
            value: self.value,
        }
    }
}

/// An iterator over the values whose key is at least the key of a given value,
/// except that value itself.
///
/// This `struct` is created by the [`all_bigger_than`] method on
/// [`MultiKeyBPlusTree`]. See its documentation for more.
///
/// [`all_bigger_than`]: crate::MultiKeyBPlusTree::all_bigger_than
/// [`MultiKeyBPlusTree`]: crate::MultiKeyBPlusTree
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct AllBiggerThan<'a, K, V> {
    inner: Excluding<'a, K, V>,
}

impl<'a, K: Ord + Clone, V: PartialEq> AllBiggerThan<'a, K, V> {
    pub(super) fn new(tree: &'a RawMultiKeyTree<K, V>, key: K, value: &'a V) -> Self {
        let span = Span::new(tree, tree.lower_bound(&key), tree.last_position());
        Self {
            inner: Excluding { span, key, value },
        }
    }
}

impl<'a, K: PartialEq, V: PartialEq> Iterator for AllBiggerThan<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.pop_front()
    }
}

impl<'a, K: PartialEq, V: PartialEq> DoubleEndedIterator for AllBiggerThan<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.pop_back()
    }
}

impl<K: PartialEq, V: PartialEq> FusedIterator for AllBiggerThan<'_, K, V> {}

impl<K: Clone, V> Clone for AllBiggerThan<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: PartialEq + Clone, V: PartialEq + fmt::Debug> fmt::Debug for AllBiggerThan<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

/// An iterator over the values whose key is at most the key of a given value,
/// except that value itself.
///
/// This `struct` is created by the [`all_less_than`] method on
/// [`MultiKeyBPlusTree`]. See its documentation for more.
///
/// [`all_less_than`]: crate::MultiKeyBPlusTree::all_less_than
/// [`MultiKeyBPlusTree`]: crate::MultiKeyBPlusTree
#[must_use = "iterators are lazy and do nothing unless consumed"]
pub struct AllLessThan<'a, K, V> {
    inner: Excluding<'a, K, V>,
}

impl<'a, K: Ord + Clone, V: PartialEq> AllLessThan<'a, K, V> {
    pub(super) fn new(tree: &'a RawMultiKeyTree<K, V>, key: K, value: &'a V) -> Self {
        let span = Span::new(tree, tree.first_position(), tree.upper_bound(&key));
        Self {
            inner: Excluding { span, key, value },
        }
    }
}

impl<'a, K: PartialEq, V: PartialEq> Iterator for AllLessThan<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.inner.pop_front()
    }
}

impl<'a, K: PartialEq, V: PartialEq> DoubleEndedIterator for AllLessThan<'a, K, V> {
    fn next_back(&mut self) -> Option<&'a V> {
        self.inner.pop_back()
    }
}

impl<K: PartialEq, V: PartialEq> FusedIterator for AllLessThan<'_, K, V> {}

impl<K: Clone, V> Clone for AllLessThan<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<K: PartialEq + Clone, V: PartialEq + fmt::Debug> fmt::Debug for AllLessThan<'_, K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.clone()).finish()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use crate::MultiKeyBPlusTree;
    use alloc::format;
    use alloc::vec::Vec;
    use pretty_assertions::assert_eq;

    fn by_first(v: &(i32, char)) -> i32 {
        v.0
    }

    #[test]
    fn iter_meets_in_the_middle() {
        let mut tree = MultiKeyBPlusTree::new(4, by_first);
        tree.extend((0..30).map(|k| (k, 'x')));

        let mut iter = tree.iter();
        assert_eq!(iter.len(), 30);
        let mut front = Vec::new();
        let mut back = Vec::new();
        while let Some((k, _)) = iter.next() {
            front.push(*k);
            if let Some((k, _)) = iter.next_back() {
                back.push(*k);
            }
        }
        assert_eq!(iter.len(), 0);
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next_back(), None);

        back.reverse();
        front.extend(back);
        assert_eq!(front, (0..30).collect::<Vec<_>>());
    }

    #[test]
    fn empty_tree_yields_nothing() {
        let tree = MultiKeyBPlusTree::new(4, by_first);
        assert_eq!(tree.iter().next(), None);
        assert_eq!(tree.all_bigger_than(&(0, 'x')).next(), None);
        assert_eq!(tree.all_less_than(&(0, 'x')).next_back(), None);
    }

    #[test]
    fn ranges_cross_leaf_boundaries() {
        let mut tree = MultiKeyBPlusTree::new(4, by_first);
        tree.extend((0..40).map(|k| (k, 'x')));
        assert!(tree.height() > 2);

        let bigger: Vec<_> = tree.all_bigger_than(&(25, 'x')).map(|v| v.0).collect();
        assert_eq!(bigger, (26..40).collect::<Vec<_>>());

        let less: Vec<_> = tree.all_less_than(&(25, 'x')).map(|v| v.0).collect();
        assert_eq!(less, (0..25).collect::<Vec<_>>());

        let descending: Vec<_> = tree.all_less_than(&(3, 'y')).rev().map(|v| v.0).collect();
        assert_eq!(descending, [3, 2, 1, 0]);
    }

    #[test]
    fn range_past_either_end() {
        let mut tree = MultiKeyBPlusTree::new(4, by_first);
        tree.extend((10..20).map(|k| (k, 'x')));

        assert_eq!(tree.all_bigger_than(&(20, 'x')).count(), 0);
        assert_eq!(tree.all_less_than(&(9, 'x')).count(), 0);
        assert_eq!(tree.all_bigger_than(&(0, 'x')).count(), 10);
        assert_eq!(tree.all_less_than(&(99, 'x')).count(), 10);
    }

    #[test]
    fn debug_lists_remaining_values() {
        let mut tree = MultiKeyBPlusTree::new(4, by_first);
        tree.extend([(3, 'x'), (3, 'y'), (5, 'z')]);

        let bigger = tree.all_bigger_than(&(3, 'y'));
        assert_eq!(format!("{bigger:?}"), "[(3, 'x'), (5, 'z')]");
        assert_eq!(format!("{:?}", tree.iter()), "[(3, (3, 'y')), (3, (3, 'x')), (5, (5, 'z'))]");
    }
}
