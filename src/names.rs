//! Order-preserving 64-bit keys for personal names.
//!
//! [`name_key`] packs the first [`SYMBOLS`] characters of a name into a `u64`
//! so that comparing keys compares name prefixes. It is meant as the key
//! function of a [`MultiKeyBPlusTree`](crate::MultiKeyBPlusTree) holding
//! records that are looked up by name: names sharing a prefix share a key, and
//! the tree disambiguates them by value.
//!
//! ```
//! use multikey_bptree::{MultiKeyBPlusTree, name_key};
//!
//! let mut people = MultiKeyBPlusTree::new(8, |name: &&str| name_key(name));
//! people.extend(["Taras", "Olena", "Bohdan", "Oleksandr"]);
//!
//! let after: Vec<_> = people.all_bigger_than(&"Oleksandr").copied().collect();
//! assert_eq!(after, ["Olena", "Taras"]);
//! ```

/// Ukrainian letters, then the Latin ones. A letter listed twice takes its
/// last position.
const ALPHABET: &str = "абвгґдеєжзиіїйклмнопрстуфчцчшщьюяabcdefghijklmnopqrstuvwxyz";

/// Number of distinct letters in [`ALPHABET`]. Characters outside it weigh this
/// much.
const UNKNOWN: u64 = 58;

/// Bits per symbol: enough to tell every letter and [`UNKNOWN`] apart.
const BITS: u32 = u64::BITS - (UNKNOWN - 1).leading_zeros();

const RADIX: u64 = 1 << BITS;

/// Number of leading characters that contribute to a key.
pub const SYMBOLS: usize = (u64::BITS / BITS) as usize;

fn weight(c: char) -> u64 {
    (0u64..)
        .zip(ALPHABET.chars())
        .filter_map(|(position, letter)| (letter == c).then_some(position))
        .last()
        .unwrap_or(UNKNOWN)
}

/// Computes the key of `name`.
///
/// The first [`SYMBOLS`] characters are lower-cased and read as digits of a
/// base-64 number, most significant first; names shorter than that are padded
/// with zero digits on the right, so a prefix sorts before its extensions.
/// Letters rank in alphabet order with Cyrillic before Latin; any other
/// character weighs the same as `z`.
///
/// # Examples
///
/// ```
/// use multikey_bptree::name_key;
///
/// assert!(name_key("ann") < name_key("anna"));
/// assert!(name_key("anna") < name_key("anton"));
/// assert_eq!(name_key("Anna"), name_key("anna"));
/// assert_eq!(name_key("Maximilian"), name_key("Maximiliana"));
/// ```
#[must_use]
pub fn name_key(name: &str) -> u64 {
    let prefix = name.chars().take(SYMBOLS);
    let key = prefix
        .clone()
        .flat_map(char::to_lowercase)
        .fold(0u64, |key, c| key.wrapping_mul(RADIX).wrapping_add(weight(c)));
    (prefix.count()..SYMBOLS).fold(key, |key, _| key.wrapping_mul(RADIX))
}
