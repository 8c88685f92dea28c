//! An in-memory B+ tree index over values with derived, non-unique keys.
//!
//! [`MultiKeyBPlusTree`] stores values under a key computed from each value by a
//! caller-supplied function. Several values may share a key, so lookups and
//! removals address an exact `(key, value)` pair, and range queries exclude
//! only that pair:
//!
//! - [`has`](MultiKeyBPlusTree::has) - Is this exact value stored?
//! - [`all_bigger_than`](MultiKeyBPlusTree::all_bigger_than) - Every other value whose key is `>=` the value's key
//! - [`all_less_than`](MultiKeyBPlusTree::all_less_than) - Every other value whose key is `<=` the value's key
//!
//! # Example
//!
//! ```
//! use multikey_bptree::MultiKeyBPlusTree;
//!
//! let mut people = MultiKeyBPlusTree::new(4, |person: &(&str, u32)| person.1);
//! people.insert(("Alice", 31));
//! people.insert(("Bob", 27));
//! people.insert(("Carol", 31));
//! people.insert(("Dave", 45));
//!
//! assert!(people.has(&("Bob", 27)));
//! assert!(!people.has(&("Bob", 28)));
//!
//! // Everyone at least as old as Alice, except Alice herself.
//! let older: Vec<_> = people.all_bigger_than(&("Alice", 31)).map(|p| p.0).collect();
//! assert_eq!(older, ["Carol", "Dave"]);
//!
//! assert!(people.remove(&("Carol", 31)));
//! assert_eq!(people.len(), 3);
//! ```
//!
//! # Features
//!
//! - **`no_std` compatible** - Only requires `alloc`, no standard library dependency
//! - **Duplicate keys** - Equal keys are kept in insertion-reversed order and may span leaves
//! - **Linked leaves** - Range queries walk the sibling chain in either direction
//!
//! # Implementation
//!
//! Nodes live in an arena and refer to each other by handle. Every level of the
//! tree is threaded into a doubly-linked list, which keeps range scans cheap and
//! lets an underflowing node find the neighbors it borrows from or joins with.

#![no_std]
// These forbid rules and lint groups are meant to be very restrictive.
#![forbid(unsafe_code)]
#![forbid(keyword_idents)]
#![forbid(non_ascii_idents)]
#![forbid(unreachable_pub)]
#![warn(clippy::all)]
#![warn(clippy::cargo)]
#![warn(clippy::pedantic)]
// Enable coverage attributes for nightly builds.
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

extern crate alloc;

mod order;
mod raw;

pub mod multikey_tree;
pub mod names;

pub use multikey_tree::MultiKeyBPlusTree;
pub use names::name_key;
pub use order::{Order, OrderError};
