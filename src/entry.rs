use core::{borrow::Borrow, pin::Pin, ptr::NonNull};

use crate::{Links, SearchTree, Slot, TreeNode};

/// A view into a single entry in a [`SearchTree`], which may be either vacant or occupied.
pub enum Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    Vacant(VacantEntry<'tree, 'key, T, Q>),
    Occupied(OccupiedEntry<'tree, T>),
}

impl<'tree, 'key, T, Q> Entry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    pub(crate) unsafe fn vacant(
        tree: &'tree mut SearchTree<T>,
        key: &'key Q,
        slot: Slot<T>,
    ) -> Self {
        Entry::Vacant(VacantEntry { tree, key, slot })
    }

    pub(crate) unsafe fn occupied(tree: &'tree mut SearchTree<T>, node: NonNull<T>) -> Self {
        Entry::Occupied(OccupiedEntry { tree, node })
    }
}

/// A view into a vacant entry in a [`SearchTree`]: the empty slot where an element with the
/// entry's key belongs.
pub struct VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    tree: &'tree mut SearchTree<T>,
    key: &'key Q,
    slot: Slot<T>,
}

impl<'tree, 'key, T, Q> VacantEntry<'tree, 'key, T, Q>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: Borrow<Q>,
    Q: Ord + ?Sized,
{
    /// Returns the key this entry was looked up with.
    pub fn key(&self) -> &'key Q {
        self.key
    }

    /// Inserts `item` at the key associated with this entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key returned by `item.key()` is equal to the key used to
    /// retrieve this entry.
    pub unsafe fn insert(self, item: T::Handle) -> Pin<&'tree mut T> {
        let mut ptr = T::into_ptr(item);

        debug_assert!(
            <T::Key as Borrow<Q>>::borrow(unsafe { ptr.as_ref() }.key()) == self.key,
            "item key does not match the entry key"
        );

        unsafe {
            self.tree.insert_at(ptr, self.slot);
            Pin::new_unchecked(ptr.as_mut())
        }
    }

    /// Builds an item with `make` and inserts it at the key associated with this entry.
    ///
    /// If `make` fails, its error is returned and the tree is not modified.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key of the item returned by `make` is equal to the key used
    /// to retrieve this entry.
    pub unsafe fn try_insert_with<F, E>(self, make: F) -> Result<Pin<&'tree mut T>, E>
    where
        F: FnOnce() -> Result<T::Handle, E>,
    {
        let item = make()?;
        Ok(unsafe { self.insert(item) })
    }
}

/// A view into an occupied entry in a [`SearchTree`].
pub struct OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    tree: &'tree mut SearchTree<T>,
    node: NonNull<T>,
}

impl<'tree, T> OccupiedEntry<'tree, T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a reference to the item in the entry.
    pub fn get(&self) -> &T {
        // SAFETY: `self.tree` is mutably borrowed for `'tree`
        unsafe { self.node.as_ref() }
    }

    /// Returns a pinned mutable reference to the item in the entry.
    ///
    /// # Safety
    ///
    /// The caller must ensure that neither the links nor the key of the mutably borrowed item are
    /// modified, as doing so may result in undefined behavior.
    pub unsafe fn get_mut(&mut self) -> Pin<&mut T> {
        // SAFETY: `self.tree` is mutably borrowed for `'tree`, and `self.node` is guaranteed pinned
        // by contract with `Linked`.
        unsafe { Pin::new_unchecked(self.node.as_mut()) }
    }

    /// Converts the entry into a pinned mutable reference to its item, bound to the tree borrow.
    ///
    /// # Safety
    ///
    /// Same as [`get_mut`](Self::get_mut).
    pub unsafe fn into_mut(mut self) -> Pin<&'tree mut T> {
        unsafe { Pin::new_unchecked(self.node.as_mut()) }
    }

    /// Removes and returns the item pointed to by this entry.
    pub fn remove(self) -> T::Handle {
        unsafe { self.tree.remove_at(self.node) }
    }
}
