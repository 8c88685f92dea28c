use core::fmt;
use core::num::NonZero;

#[cfg(test)]
type Slot = u16;
#[cfg(not(test))]
type Slot = u32;

/// Stable address of a node slot in the tree's [`Arena`](super::arena::Arena).
///
/// Parent nodes own their children through handles, and sibling links are plain
/// copies of the neighbor's handle. A handle never keeps its node alive: it is
/// only meaningful while the arena slot it names is occupied.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub(crate) struct Handle(NonZero<Slot>);

impl Handle {
    pub(crate) const MAX: usize = (Slot::MAX - 1) as usize;

    #[inline]
    pub(crate) const fn from_index(index: usize) -> Self {
        assert!(index <= Self::MAX, "`Handle::from_index()` - `index` > `Handle::MAX`!");
        // `index + 1` is never zero and fits after the check above.
        #[allow(clippy::cast_possible_truncation)]
        match NonZero::new((index + 1) as Slot) {
            Some(raw) => Self(raw),
            None => unreachable!(),
        }
    }

    #[inline]
    pub(crate) const fn to_index(self) -> usize {
        (self.0.get() - 1) as usize
    }
}

impl fmt::Display for Handle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.to_index())
    }
}
