use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::fmt;

use super::MultiKeyBPlusTree;
use crate::raw::{Handle, Node};

const INDENT: usize = 4;

impl<K, V, F> MultiKeyBPlusTree<K, V, F> {
    /// Renders the tree structure for debugging.
    ///
    /// Every leaf entry becomes a `key: value` line, in key order. Each level of
    /// internal nodes adds four spaces of indentation to the lines below it, and
    /// every separator key is printed on its own line, at its node's
    /// indentation, between the two subtrees it divides. An empty tree renders
    /// as an empty string.
    ///
    /// # Examples
    ///
    /// ```
    /// use multikey_bptree::MultiKeyBPlusTree;
    ///
    /// let mut tree = MultiKeyBPlusTree::new(4, |v: &u8| *v);
    /// tree.extend([1, 2, 3, 4, 5]);
    ///
    /// let rendered = tree.to_str(|k| format!("k{k}"), |v| format!("v{v}"));
    /// assert_eq!(
    ///     rendered,
    ///     "    k1: v1\n    k2: v2\nk3\n    k3: v3\n    k4: v4\n    k5: v5"
    /// );
    /// ```
    #[must_use]
    pub fn to_str<KF, VF>(&self, key_fmt: KF, value_fmt: VF) -> String
    where
        KF: Fn(&K) -> String,
        VF: Fn(&V) -> String,
    {
        let mut lines = Vec::new();
        self.render(self.raw.root(), 0, &key_fmt, &value_fmt, &mut lines);
        lines.join("\n")
    }

    fn render<KF, VF>(&self, handle: Handle, indent: usize, key_fmt: &KF, value_fmt: &VF, lines: &mut Vec<String>)
    where
        KF: Fn(&K) -> String,
        VF: Fn(&V) -> String,
    {
        match self.raw.node(handle) {
            Node::Leaf(leaf) => {
                for (key, value) in leaf.keys().iter().zip(leaf.values()) {
                    lines.push(format!("{:indent$}{}: {}", "", key_fmt(key), value_fmt(value)));
                }
            }
            Node::Internal(internal) => {
                let (first, rest) = internal
                    .children()
                    .split_first()
                    .expect("internal nodes have at least two children");
                self.render(*first, indent + INDENT, key_fmt, value_fmt, lines);
                for (bound, &child) in internal.bounds().iter().zip(rest) {
                    lines.push(format!("{:indent$}{}", "", key_fmt(bound)));
                    self.render(child, indent + INDENT, key_fmt, value_fmt, lines);
                }
            }
        }
    }
}

/// Renders with [`MultiKeyBPlusTree::to_str`], formatting keys and values with
/// their `Display` implementations.
impl<K: fmt::Display, V: fmt::Display, F> fmt::Display for MultiKeyBPlusTree<K, V, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_str(ToString::to_string, ToString::to_string))
    }
}
