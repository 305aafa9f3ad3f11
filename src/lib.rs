//! An intrusive AVL tree.
//!
//! The balancing core, [`AvlTree`], works on tree topology alone: it never compares keys and never
//! allocates or frees memory. Elements embed a [`Links`] record and expose it through
//! [`cordyceps::Linked`]; the core only rewires those links and keeps the per-node balance factors
//! up to date.
//!
//! Ordering is supplied from the outside. [`SearchTree`] is such a consumer: it descends by key to
//! find an insertion slot or an existing element and then calls into the core. [`AvlMap`] is an
//! ordered map built on top of it.
//!
//! The core consists of four entry points:
//!
//! - [`AvlTree::link_node`] places a fresh node into an empty child slot (or at the root).
//! - [`AvlTree::insert_rebalance`] restores the balance invariant after a link.
//! - [`AvlTree::erase`] detaches a node and rebalances.
//! - [`AvlTree::erase_rebalance`] rebalances from an explicit point, for custom removal sequences.
//!
//! # Invariants
//!
//! After every completed insertion or erase, for every node:
//!
//! 1. The heights of the left and right subtrees differ by at most one.
//! 2. The stored [`Balance`] names the taller side, or is [`Balance::Balanced`] if there is none.
//! 3. Each child's parent link points back at the node, and the root has no parent.

use core::{cell::UnsafeCell, fmt, marker::PhantomPinned, mem, ops::Not, ptr::NonNull};

use cordyceps::Linked;

mod boxed;
mod debug;
mod entry;
mod erase;
mod error;
mod insert;
mod map;
mod rotate;
mod search;
mod tracing_helpers;
mod walk;

#[cfg(any(test, feature = "model"))]
pub mod model;

#[cfg(test)]
mod tests;

pub use crate::{
    boxed::try_box,
    entry::{Entry, OccupiedEntry, VacantEntry},
    error::{AllocError, InsertError, PrintError, WalkError},
    map::AvlMap,
    search::{SearchTree, TreeNode},
    tracing_helpers::init_logging,
};

/// The balancing core of an intrusive AVL tree.
///
/// An `AvlTree` is nothing more than a reference to the topmost node. It does not own its nodes
/// and does not free them when dropped; see [`SearchTree`] for a handle that does.
pub struct AvlTree<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    root: Link<T>,
}

/// Intrusive links embedded in every tree element.
pub struct Links<T: ?Sized> {
    inner: UnsafeCell<LinksInner<T>>,
}

#[repr(C)]
struct LinksInner<T: ?Sized> {
    parent: Link<T>,
    children: [Link<T>; 2],
    balance: Balance,
    _unpin: PhantomPinned,
}

pub(crate) type Link<T> = Option<NonNull<T>>;

/// A side of a node.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Dir {
    Left = 0,
    Right = 1,
}

impl Not for Dir {
    type Output = Dir;

    fn not(self) -> Self::Output {
        match self {
            Dir::Left => Dir::Right,
            Dir::Right => Dir::Left,
        }
    }
}

/// The balance factor of a node: which of its subtrees, if any, is one level taller.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Balance {
    #[default]
    Balanced,
    LeftHeavy,
    RightHeavy,
}

impl Balance {
    /// Returns the balance factor of a node whose `dir` subtree is the taller one.
    #[inline]
    pub const fn heavy(dir: Dir) -> Balance {
        match dir {
            Dir::Left => Balance::LeftHeavy,
            Dir::Right => Balance::RightHeavy,
        }
    }

    #[inline]
    pub fn is_heavy(self, dir: Dir) -> bool {
        self == Balance::heavy(dir)
    }

    /// Returns `height(right) - height(left)` as implied by this balance factor.
    #[inline]
    pub const fn as_i8(self) -> i8 {
        match self {
            Balance::Balanced => 0,
            Balance::LeftHeavy => -1,
            Balance::RightHeavy => 1,
        }
    }
}

/// An empty position in the tree that a new node can be linked into.
pub enum Slot<T: ?Sized> {
    /// The tree is empty and the node becomes its root.
    Root,
    /// The `dir` child of `parent` is empty.
    Child { parent: NonNull<T>, dir: Dir },
}

impl<T: ?Sized> fmt::Debug for Slot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Root => f.write_str("Root"),
            Slot::Child { parent, dir } => f
                .debug_struct("Child")
                .field("parent", parent)
                .field("dir", dir)
                .finish(),
        }
    }
}

impl<T> AvlTree<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    /// Returns a new empty tree.
    pub const fn new() -> AvlTree<T> {
        AvlTree { root: None }
    }

    /// Returns `true` if the tree has no nodes.
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the topmost node of the tree.
    pub const fn root(&self) -> Option<NonNull<T>> {
        self.root
    }

    /// Links `node` into the empty position `slot`.
    ///
    /// The node's links are reset: it becomes a balanced leaf. No rebalancing is performed; call
    /// [`insert_rebalance`](Self::insert_rebalance) right after.
    ///
    /// # Safety
    ///
    /// The caller must ensure that the following conditions hold:
    /// - `node` is valid, pinned, and not linked into any tree.
    /// - If `slot` is [`Slot::Root`], the tree is empty.
    /// - If `slot` is [`Slot::Child`], `parent` is a node of this tree whose `dir` child is empty.
    pub unsafe fn link_node(&mut self, node: NonNull<T>, slot: Slot<T>) {
        unsafe {
            let links = T::links(node).as_mut();
            links.clear();

            match slot {
                Slot::Root => {
                    debug_assert!(self.root.is_none(), "tree must be empty to link a root");
                    self.root = Some(node);
                }

                Slot::Child { parent, dir } => {
                    let parent_links = T::links(parent).as_mut();
                    debug_assert!(
                        parent_links.child(dir).is_none(),
                        "slot {dir:?} of the parent is occupied"
                    );
                    parent_links.set_child(dir, Some(node));
                    links.set_parent(Some(parent));
                }
            }
        }
    }

    /// Returns the height of the tree; an empty tree has height 0.
    pub fn height(&self) -> usize {
        let mut height = 0;
        let mut opt_cur = self.root;

        // The taller side is always recorded, so following it reaches the deepest leaf.
        while let Some(cur) = opt_cur {
            height += 1;
            let links = unsafe { T::links(cur).as_ref() };
            opt_cur = match links.balance() {
                Balance::RightHeavy => links.right(),
                _ => links.left(),
            };
        }

        height
    }

    /// Checks every structural invariant of the tree and returns its height.
    ///
    /// # Panics
    ///
    /// Panics if any node is out of balance, carries a wrong balance factor, or has a parent link
    /// that does not match the tree structure.
    #[doc(hidden)]
    pub fn assert_invariants(&self) -> usize {
        match self.root {
            Some(root) => unsafe {
                assert_eq!(
                    T::links(root).as_ref().parent(),
                    None,
                    "root must not have a parent"
                );
                self.assert_invariants_at(root)
            },
            None => 0,
        }
    }

    #[allow(clippy::only_used_in_recursion)]
    unsafe fn assert_invariants_at(&self, node: NonNull<T>) -> usize {
        unsafe {
            let mut heights = [0usize; 2];

            for dir in [Dir::Left, Dir::Right] {
                if let Some(child) = T::links(node).as_ref().child(dir) {
                    // Checked before descending, so a cycle trips this instead of recursing forever.
                    let parent = T::links(child)
                        .as_ref()
                        .parent()
                        .expect("child parent pointer not set");
                    assert_eq!(node, parent, "{dir:?} child's parent pointer is wrong");

                    heights[dir as usize] = self.assert_invariants_at(child);
                }
            }

            let [left, right] = heights;
            let expected = match right as isize - left as isize {
                0 => Balance::Balanced,
                -1 => Balance::LeftHeavy,
                1 => Balance::RightHeavy,
                diff => panic!("subtree heights differ by {diff}"),
            };
            assert_eq!(T::links(node).as_ref().balance(), expected);

            left.max(right) + 1
        }
    }

    // Support methods ========================================================

    #[inline]
    pub(crate) unsafe fn which_child(&self, parent: NonNull<T>, child: NonNull<T>) -> Dir {
        unsafe {
            if T::links(parent).as_ref().left() == Some(child) {
                Dir::Left
            } else {
                debug_assert_eq!(T::links(parent).as_ref().right(), Some(child));
                Dir::Right
            }
        }
    }

    // Points the slot that held `old_child` (under `parent`, or the root) at `new_child`, and sets
    // `new_child`'s parent link.
    //
    // # Safety
    //
    // `old_child` must be a child of `parent`, or the root if `parent` is `None`.
    #[inline]
    pub(crate) unsafe fn replace_child_or_set_root(
        &mut self,
        parent: Link<T>,
        old_child: NonNull<T>,
        new_child: Link<T>,
    ) {
        unsafe {
            match parent {
                Some(parent) => {
                    let dir = self.which_child(parent, old_child);
                    T::links(parent).as_mut().set_child(dir, new_child);
                }
                None => self.root = new_child,
            }

            if let Some(new_child) = new_child {
                T::links(new_child).as_mut().set_parent(parent);
            }
        }
    }

    // Returns the leftmost node of the subtree rooted at `root`.
    #[inline]
    pub(crate) unsafe fn min_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        unsafe { self.extreme_in_subtree(root, Dir::Left) }
    }

    #[inline]
    pub(crate) unsafe fn max_in_subtree(&self, root: NonNull<T>) -> NonNull<T> {
        unsafe { self.extreme_in_subtree(root, Dir::Right) }
    }

    unsafe fn extreme_in_subtree(&self, root: NonNull<T>, dir: Dir) -> NonNull<T> {
        let mut cur = root;

        while let Some(next) = unsafe { T::links(cur).as_ref().child(dir) } {
            cur = next;
        }

        cur
    }
}

impl<T> Default for AvlTree<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> Links<T> {
    /// Returns links for a node that is not in any tree.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            inner: UnsafeCell::new(LinksInner {
                parent: None,
                children: [None; 2],
                balance: Balance::Balanced,
                _unpin: PhantomPinned,
            }),
        }
    }

    /// Resets the links to the state returned by [`Links::new`].
    ///
    /// Required before a node that has been erased is linked again.
    pub fn clear(&mut self) {
        let inner = self.inner.get_mut();
        inner.parent = None;
        inner.children = [None; 2];
        inner.balance = Balance::Balanced;
    }

    #[inline]
    pub fn balance(&self) -> Balance {
        unsafe { (*self.inner.get()).balance }
    }

    #[inline]
    pub fn set_balance(&mut self, balance: Balance) {
        self.inner.get_mut().balance = balance;
    }

    #[inline]
    pub fn parent(&self) -> Option<NonNull<T>> {
        unsafe { (*self.inner.get()).parent }
    }

    /// Sets the parent link, returning the previous one.
    #[inline]
    pub fn set_parent(&mut self, parent: Option<NonNull<T>>) -> Option<NonNull<T>> {
        mem::replace(&mut self.inner.get_mut().parent, parent)
    }

    #[inline]
    pub fn child(&self, dir: Dir) -> Option<NonNull<T>> {
        unsafe { (*self.inner.get()).children[dir as usize] }
    }

    #[inline]
    pub fn left(&self) -> Option<NonNull<T>> {
        self.child(Dir::Left)
    }

    #[inline]
    pub fn right(&self) -> Option<NonNull<T>> {
        self.child(Dir::Right)
    }

    #[inline]
    pub(crate) fn is_leaf(&self) -> bool {
        self.left().is_none() && self.right().is_none()
    }

    #[inline]
    pub(crate) fn set_child(&mut self, dir: Dir, child: Link<T>) -> Link<T> {
        mem::replace(&mut self.inner.get_mut().children[dir as usize], child)
    }

    #[inline]
    pub(crate) fn set_left(&mut self, left: Link<T>) -> Link<T> {
        self.set_child(Dir::Left, left)
    }

    #[inline]
    pub(crate) fn set_right(&mut self, right: Link<T>) -> Link<T> {
        self.set_child(Dir::Right, right)
    }
}

impl<T: ?Sized> Default for Links<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: ?Sized> fmt::Debug for Links<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Links")
            .field("parent", &self.parent())
            .field("left", &self.left())
            .field("right", &self.right())
            .field("balance", &self.balance())
            .finish()
    }
}
