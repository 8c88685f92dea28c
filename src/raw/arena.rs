use alloc::vec::Vec;

use super::handle::Handle;

/// Slot storage for tree nodes.
///
/// Released slots are recycled, so a handle to a node that was absorbed by a
/// join may later name an unrelated node. The tree splices absorbed nodes out of
/// their sibling chain before releasing them; [`Arena::try_get`] lets callers
/// revalidate a link instead of trusting it.
pub(crate) struct Arena<T> {
    cells: Vec<Option<T>>,
    vacant: Vec<Handle>,
}

impl<T> Arena<T> {
    pub(crate) const fn new() -> Self {
        Self {
            cells: Vec::new(),
            vacant: Vec::new(),
        }
    }

    /// Number of live nodes.
    #[cfg(test)]
    pub(crate) const fn len(&self) -> usize {
        self.cells.len() - self.vacant.len()
    }

    pub(crate) fn alloc(&mut self, node: T) -> Handle {
        match self.vacant.pop() {
            Some(handle) => {
                self.cells[handle.to_index()] = Some(node);
                handle
            }
            None => {
                let handle = Handle::from_index(self.cells.len());
                self.cells.push(Some(node));
                handle
            }
        }
    }

    #[inline]
    pub(crate) fn get(&self, handle: Handle) -> &T {
        self.try_get(handle).expect("`Arena::get()` - `handle` is invalid!")
    }

    #[inline]
    pub(crate) fn get_mut(&mut self, handle: Handle) -> &mut T {
        self.cells
            .get_mut(handle.to_index())
            .and_then(Option::as_mut)
            .expect("`Arena::get_mut()` - `handle` is invalid!")
    }

    /// Returns the node behind `handle`, or `None` if its slot was released or
    /// never allocated.
    #[inline]
    pub(crate) fn try_get(&self, handle: Handle) -> Option<&T> {
        self.cells.get(handle.to_index()).and_then(Option::as_ref)
    }

    pub(crate) fn contains(&self, handle: Handle) -> bool {
        self.try_get(handle).is_some()
    }

    /// Moves the node out and makes its slot available to [`Arena::alloc`].
    pub(crate) fn take(&mut self, handle: Handle) -> T {
        let node = self
            .cells
            .get_mut(handle.to_index())
            .and_then(Option::take)
            .expect("`Arena::take()` - `handle` is invalid!");
        self.vacant.push(handle);
        node
    }

    pub(crate) fn free(&mut self, handle: Handle) {
        self.take(handle);
    }

    pub(crate) fn clear(&mut self) {
        self.cells.clear();
        self.vacant.clear();
    }
}
