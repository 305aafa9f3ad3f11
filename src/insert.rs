use core::ptr::NonNull;

use cordyceps::Linked;

use crate::{
    rotate::rotate_toward,
    tracing_helpers::{debug_log, trace_log},
    AvlTree, Balance, Links,
};

impl<T> AvlTree<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    /// Restores the balance invariant after `node` was linked as a new leaf.
    ///
    /// Walks from `node` toward the root updating balance factors, and stops as soon as the height
    /// increase is absorbed or a single rotation has been made. Completes in _O(log(n))_ time.
    ///
    /// # Safety
    ///
    /// `node` must have just been linked into this tree with [`link_node`](Self::link_node), and
    /// no other modification may have happened since.
    pub unsafe fn insert_rebalance(&mut self, node: NonNull<T>) {
        unsafe {
            debug_assert!(T::links(node).as_ref().is_leaf());
            debug_assert_eq!(T::links(node).as_ref().balance(), Balance::Balanced);

            let mut x = node;

            while let Some(parent) = T::links(x).as_ref().parent() {
                let dir = self.which_child(parent, x);
                let parent_links = T::links(parent).as_mut();

                match parent_links.balance() {
                    // The other side was taller; now both are equal and the height is unchanged.
                    b if b.is_heavy(!dir) => {
                        parent_links.set_balance(Balance::Balanced);
                        trace_log!(?parent, "insert absorbed");
                        return;
                    }

                    // `parent` grew by one level. Keep ascending.
                    Balance::Balanced => {
                        parent_links.set_balance(Balance::heavy(dir));
                        x = parent;
                    }

                    // `parent` is now two levels taller on the `dir` side.
                    _ => {
                        debug_assert_ne!(
                            T::links(x).as_ref().balance(),
                            Balance::Balanced,
                            "an ascending node that grew cannot be balanced"
                        );

                        let grand_parent = parent_links.parent();
                        let sub = rotate_toward(parent, x, dir);
                        self.replace_child_or_set_root(grand_parent, parent, Some(sub));

                        debug_log!(?parent, ?sub, "insert rotated");
                        return;
                    }
                }
            }
        }
    }
}
