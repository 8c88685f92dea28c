use core::fmt;

/// Why an order was rejected by [`Order::new`].
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
pub enum OrderError {
    /// Splitting a node must leave two equally sized halves.
    #[error("order of the B+ tree must be an even number, got {0}")]
    Odd(usize),
    /// Half a node must still be able to hold two entries.
    #[error("order of the B+ tree must be bigger than 2, got {0}")]
    TooSmall(usize),
}

/// The branching order of a [`MultiKeyBPlusTree`](crate::MultiKeyBPlusTree).
///
/// A leaf holds at most `order` entries and an internal node at most `order`
/// children; every node except the root holds at least [`Order::half`]. The
/// order is even and greater than two.
///
/// # Examples
///
/// ```
/// use multikey_bptree::{Order, OrderError};
///
/// let order = Order::new(6)?;
/// assert_eq!(order.get(), 6);
/// assert_eq!(order.half(), 3);
///
/// assert_eq!(Order::new(5), Err(OrderError::Odd(5)));
/// assert_eq!(Order::new(2), Err(OrderError::TooSmall(2)));
/// # Ok::<(), OrderError>(())
/// ```
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Order(usize);

impl Order {
    /// The order used by [`Order::default`].
    pub const DEFAULT: Order = Order(128);

    /// Validates `order`.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Odd`] for odd values and [`OrderError::TooSmall`]
    /// for values not greater than two.
    pub const fn new(order: usize) -> Result<Order, OrderError> {
        if order % 2 != 0 {
            return Err(OrderError::Odd(order));
        }
        if order <= 2 {
            return Err(OrderError::TooSmall(order));
        }
        Ok(Order(order))
    }

    /// Maximum entries per leaf and children per internal node.
    #[must_use]
    pub const fn get(self) -> usize {
        self.0
    }

    /// Minimum occupancy of a non-root node.
    #[must_use]
    pub const fn half(self) -> usize {
        self.0 / 2
    }
}

impl Default for Order {
    fn default() -> Self {
        Order::DEFAULT
    }
}

impl TryFrom<usize> for Order {
    type Error = OrderError;

    fn try_from(order: usize) -> Result<Self, Self::Error> {
        Order::new(order)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
