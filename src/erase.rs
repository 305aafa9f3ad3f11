use core::ptr::NonNull;

use cordyceps::Linked;

use crate::{
    rotate::rotate_toward,
    tracing_helpers::{debug_log, trace_log},
    AvlTree, Balance, Dir, Links,
};

impl<T> AvlTree<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    /// Detaches `node` from the tree and restores the balance invariant.
    ///
    /// The node is not freed; ownership returns to the caller. Its links are reset, but it must not
    /// be linked into a tree again without going through [`link_node`](Self::link_node).
    ///
    /// This operation completes in _O(log(n))_ time.
    ///
    /// # Safety
    ///
    /// It is the caller's responsibility to ensure that `node` is an element of `self`, and not any
    /// other tree.
    pub unsafe fn erase(&mut self, node: NonNull<T>) {
        // If `node` has two children, its successor (the least node of its right subtree) takes its
        // place, links and balance factor. The successor has no left child, so detaching it from its
        // old position is the same splice as removing a node with at most one child.
        //
        // Either way exactly one subtree lost one level of height before rebalancing: the side of
        // the start node that the splice happened on.

        unsafe {
            let parent = T::links(node).as_ref().parent();
            let left = T::links(node).as_ref().left();
            let right = T::links(node).as_ref().right();

            let start = match (left, right) {
                (Some(left), Some(right)) => {
                    let successor = self.min_in_subtree(right);
                    let successor_right = T::links(successor).as_ref().right();

                    let start = if successor == right {
                        // The successor keeps its right subtree, which is one level shorter than
                        // the one it replaces.
                        (successor, Dir::Right)
                    } else {
                        let successor_parent = T::links(successor)
                            .as_ref()
                            .parent()
                            .expect("successor below the right child has a parent");

                        // Elevate the successor's right child to replace it.
                        T::links(successor_parent)
                            .as_mut()
                            .set_left(successor_right);
                        if let Some(successor_right) = successor_right {
                            T::links(successor_right)
                                .as_mut()
                                .set_parent(Some(successor_parent));
                        }

                        T::links(successor).as_mut().set_right(Some(right));
                        T::links(right).as_mut().set_parent(Some(successor));

                        (successor_parent, Dir::Left)
                    };

                    self.replace_child_or_set_root(parent, node, Some(successor));

                    let successor_links = T::links(successor).as_mut();
                    successor_links.set_left(Some(left));
                    successor_links.set_balance(T::links(node).as_ref().balance());
                    T::links(left).as_mut().set_parent(Some(successor));

                    Some(start)
                }

                (Some(child), None) | (None, Some(child)) => {
                    let dir = parent.map(|p| self.which_child(p, node));
                    self.replace_child_or_set_root(parent, node, Some(child));
                    parent.zip(dir)
                }

                (None, None) => {
                    let dir = parent.map(|p| self.which_child(p, node));
                    self.replace_child_or_set_root(parent, node, None);
                    parent.zip(dir)
                }
            };

            T::links(node).as_mut().clear();

            let Some((mut start, mut shrunk)) = start else {
                // `node` was the root and had at most one child; its child is a valid AVL tree.
                return;
            };

            debug_log!(?node, ?start, ?shrunk, "erase spliced");

            if T::links(start).as_ref().is_leaf() {
                // The start node lost its only child. A childless node is balanced by definition,
                // and its own height dropped by one, so rebalancing continues one level up.
                T::links(start).as_mut().set_balance(Balance::Balanced);

                let Some(start_parent) = T::links(start).as_ref().parent() else {
                    return;
                };

                shrunk = self.which_child(start_parent, start);
                start = start_parent;
            }

            self.erase_rebalance(start, shrunk);
        }
    }

    /// Restores the balance invariant after the `shrunk` subtree of `parent` lost one level of
    /// height.
    ///
    /// Balance factors at and above `parent` must not have been updated yet. Walks toward the root
    /// and stops as soon as a subtree keeps its height. Completes in _O(log(n))_ time.
    ///
    /// [`erase`](Self::erase) calls this internally; it is exposed for callers that sequence their
    /// own structural removals.
    ///
    /// # Safety
    ///
    /// `parent` must be a node of this tree, and every node other than `parent` and its ancestors
    /// must satisfy the balance invariant.
    pub unsafe fn erase_rebalance(&mut self, parent: NonNull<T>, shrunk: Dir) {
        let mut parent = parent;
        let mut shrunk = shrunk;

        unsafe {
            loop {
                let parent_links = T::links(parent).as_mut();
                let grand_parent = parent_links.parent();

                let subtree = match parent_links.balance() {
                    // The shrunk side was the taller one; now `parent` is balanced but one level
                    // shorter.
                    b if b.is_heavy(shrunk) => {
                        parent_links.set_balance(Balance::Balanced);
                        parent
                    }

                    // The other side is now taller, but the height of `parent` is unchanged.
                    Balance::Balanced => {
                        parent_links.set_balance(Balance::heavy(!shrunk));
                        trace_log!(?parent, "erase absorbed");
                        return;
                    }

                    // The other side is now two levels taller.
                    _ => {
                        let sibling = parent_links
                            .child(!shrunk)
                            .expect("the taller side of a node cannot be empty");
                        let sibling_balance = T::links(sibling).as_ref().balance();

                        let sub = rotate_toward(parent, sibling, !shrunk);
                        self.replace_child_or_set_root(grand_parent, parent, Some(sub));
                        debug_log!(?parent, ?sub, ?sibling_balance, "erase rotated");

                        // Rotating around a balanced sibling leaves the subtree height unchanged.
                        if sibling_balance == Balance::Balanced {
                            return;
                        }

                        sub
                    }
                };

                // `subtree` is one level shorter than before; ascend.
                let Some(grand_parent) = grand_parent else {
                    return;
                };

                shrunk = self.which_child(grand_parent, subtree);
                parent = grand_parent;
            }
        }
    }
}
