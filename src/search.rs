use core::{borrow::Borrow, cmp::Ordering, pin::Pin, ptr::NonNull};

use cordyceps::Linked;

use crate::{
    entry::Entry,
    tracing_helpers::trace_log,
    AvlTree, Dir, InsertError, Link, Links, Slot, WalkError,
};

/// An element of a [`SearchTree`], ordered by its key.
pub trait TreeNode<L>: Linked<L> {
    type Key: Ord;

    fn key(&self) -> &Self::Key;
}

/// An intrusive AVL search tree that owns its elements.
///
/// Elements are ordered by [`TreeNode::key`]; keys are unique. The tree takes ownership of each
/// element's [`Linked::Handle`] on insertion and gives it back on removal. Dropping the tree drops
/// every element still in it.
pub struct SearchTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    pub(crate) tree: AvlTree<T>,
    pub(crate) len: usize,
}

// Where a descent by key ended.
pub(crate) enum Found<T: ?Sized> {
    Occupied(NonNull<T>),
    Vacant(Slot<T>),
}

impl<T> SearchTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> SearchTree<T> {
        SearchTree {
            tree: AvlTree::new(),
            len: 0,
        }
    }

    /// Returns `true` if the tree contains no elements.
    pub const fn is_empty(&self) -> bool {
        let empty = self.len() == 0;

        if cfg!(debug_assertions) {
            // Can't use assert_eq!() in const fn.
            assert!(empty == self.tree.is_empty());
        }

        empty
    }

    /// Returns the number of elements in the tree.
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns the balancing core of this tree, for traversal and inspection.
    pub const fn as_avl(&self) -> &AvlTree<T> {
        &self.tree
    }

    #[doc(hidden)]
    pub fn assert_invariants(&self) -> usize {
        let height = self.tree.assert_invariants();

        let count = self
            .tree
            .try_fold_in_order((0usize, None::<&T::Key>), |(count, prev), node| {
                if let Some(prev) = prev {
                    assert!(prev < node.key(), "keys out of order");
                }
                (count + 1, Some(node.key()))
            })
            .expect("traversal stack exhausted")
            .0;
        assert_eq!(count, self.len, "element count does not match the tree");

        height
    }

    /// Returns `true` if the tree contains an element with key `key`.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get_raw(key).is_some()
    }

    /// Returns a reference to the element corresponding to `key`.
    pub fn get<Q>(&self, key: &Q) -> Option<Pin<&T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_ref())) }
    }

    /// Returns a pinned mutable reference to the element corresponding to `key`.
    ///
    /// # Safety
    ///
    /// The caller must not modify the element's links or change its key's ordering relative to the
    /// other keys in the tree.
    pub unsafe fn get_mut<Q>(&mut self, key: &Q) -> Option<Pin<&mut T>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut ptr = self.get_raw(key)?;
        unsafe { Some(Pin::new_unchecked(ptr.as_mut())) }
    }

    pub(crate) fn get_raw<Q>(&self, key: &Q) -> Link<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find(key) {
            Found::Occupied(node) => Some(node),
            Found::Vacant(_) => None,
        }
    }

    // Descends from the root, returning either the node with key `key` or the empty slot where
    // such a node belongs.
    pub(crate) fn find<Q>(&self, key: &Q) -> Found<T>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(mut cur) = self.tree.root() else {
            return Found::Vacant(Slot::Root);
        };

        loop {
            let dir = match key.cmp(unsafe { cur.as_ref() }.key().borrow()) {
                Ordering::Less => Dir::Left,
                Ordering::Equal => return Found::Occupied(cur),
                Ordering::Greater => Dir::Right,
            };

            match unsafe { T::links(cur).as_ref().child(dir) } {
                Some(child) => cur = child,
                None => return Found::Vacant(Slot::Child { parent: cur, dir }),
            }
        }
    }

    /// Returns the minimum element of the tree.
    pub fn first(&self) -> Option<Pin<&T>> {
        let root = self.tree.root()?;

        unsafe {
            let first = self.tree.min_in_subtree(root);
            Some(Pin::new_unchecked(first.as_ref()))
        }
    }

    /// Returns the maximum element of the tree.
    pub fn last(&self) -> Option<Pin<&T>> {
        let root = self.tree.root()?;

        unsafe {
            let last = self.tree.max_in_subtree(root);
            Some(Pin::new_unchecked(last.as_ref()))
        }
    }

    /// Returns the entry for `key`, which is either an existing element or the position where an
    /// element with that key would be inserted.
    pub fn entry<'tree, 'key, Q>(&'tree mut self, key: &'key Q) -> Entry<'tree, 'key, T, Q>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.find(key) {
            Found::Occupied(node) => unsafe { Entry::occupied(self, node) },
            Found::Vacant(slot) => unsafe { Entry::vacant(self, key, slot) },
        }
    }

    /// Inserts an item into the tree.
    ///
    /// If an element with an equal key is already present, the tree is left unchanged and `item`
    /// is handed back.
    ///
    /// This operation completes in _O(log(n))_ time.
    pub fn insert(&mut self, item: T::Handle) -> Option<T::Handle> {
        let ptr = T::into_ptr(item);

        match self.find(unsafe { ptr.as_ref() }.key()) {
            Found::Occupied(_) => Some(unsafe { T::from_ptr(ptr) }),
            Found::Vacant(slot) => {
                unsafe { self.insert_at(ptr, slot) };
                None
            }
        }
    }

    /// Inserts the item built by `make` under `key`.
    ///
    /// The insertion position is located before `make` is called, and `make` is not called if
    /// `key` is already present. A failure of `make` is returned as [`InsertError::Alloc`]; the tree
    /// is unchanged in that case.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the key of the item returned by `make` is equal to `key`.
    pub unsafe fn try_insert_with<Q, F, E>(
        &mut self,
        key: &Q,
        make: F,
    ) -> Result<Pin<&mut T>, InsertError<E>>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
        F: FnOnce() -> Result<T::Handle, E>,
    {
        match self.entry(key) {
            Entry::Occupied(_) => Err(InsertError::Occupied),
            Entry::Vacant(vacant) => {
                unsafe { vacant.try_insert_with(make) }.map_err(InsertError::Alloc)
            }
        }
    }

    // Links `ptr` into `slot` and rebalances.
    pub(crate) unsafe fn insert_at(&mut self, ptr: NonNull<T>, slot: Slot<T>) {
        trace_log!(?ptr, ?slot, "insert");

        unsafe {
            self.tree.link_node(ptr, slot);
            self.tree.insert_rebalance(ptr);
        }

        self.len += 1;
    }

    /// Removes the element with key `key`, if present.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<T::Handle>
    where
        T::Key: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let node = self.get_raw(key)?;
        unsafe { Some(self.remove_at(node)) }
    }

    /// Removes an arbitrary node from the tree.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn remove_at(&mut self, node: NonNull<T>) -> T::Handle {
        trace_log!(?node, "remove");

        unsafe {
            self.tree.erase(node);
            self.len -= 1;

            T::from_ptr(node)
        }
    }

    /// Removes and returns the minimum element of the tree.
    pub fn pop_first(&mut self) -> Option<T::Handle> {
        let root = self.tree.root()?;

        unsafe {
            let first = self.tree.min_in_subtree(root);
            Some(self.remove_at(first))
        }
    }

    /// Removes and returns the maximum element of the tree.
    pub fn pop_last(&mut self) -> Option<T::Handle> {
        let root = self.tree.root()?;

        unsafe {
            let last = self.tree.max_in_subtree(root);
            Some(self.remove_at(last))
        }
    }

    /// Clears the tree, dropping all elements.
    pub fn clear(&mut self) {
        // Tear the tree down without rebalancing: repeatedly unlink the minimum node, which has at
        // most a right child.
        let mut opt_cur = self.tree.root();

        while let Some(cur) = opt_cur {
            unsafe {
                let cur = self.tree.min_in_subtree(cur);
                let parent = T::links(cur).as_ref().parent();
                let right = T::links(cur).as_ref().right();

                // Elevate the node's right child (which may be None).
                self.tree.replace_child_or_set_root(parent, cur, right);

                T::links(cur).as_mut().clear();
                drop(T::from_ptr(cur));
                self.len -= 1;

                // If the node had no right child, climb to the parent. If the node had no parent,
                // the tree is empty.
                opt_cur = right.or(parent);
            }
        }

        debug_assert!(self.tree.is_empty());
        debug_assert_eq!(self.len(), 0);
    }

    /// Calls `f` on every element in key order.
    pub fn try_for_each<'a, F>(&'a self, mut f: F) -> Result<(), WalkError>
    where
        F: FnMut(&'a T),
    {
        self.tree.try_fold_in_order((), |(), node| f(node))
    }
}

impl<T> Default for SearchTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Drop for SearchTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
{
    fn drop(&mut self) {
        self.clear();
    }
}
