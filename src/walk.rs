//! Stack-based traversals.
//!
//! Both walks keep their pending nodes on a heap-allocated stack instead of recursing. The stack
//! grows a few entries at a time through [`Vec::try_reserve_exact`], so running out of memory is
//! reported as a [`WalkError`] rather than aborting. The tree is only read.

use core::ptr::NonNull;

use cordyceps::Linked;

use crate::{AvlTree, Links, WalkError};

// Number of entries the traversal stack grows by.
const STACK_CHUNK: usize = 10;

impl<T> AvlTree<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    /// Visits every node in reverse order (right subtree, node, left subtree), passing each node's
    /// depth; the root has depth 0.
    ///
    /// If `visit_missing` is `true`, every empty child slot is also visited, as `None`, with the
    /// depth a node in that slot would have. Printing each visit on its own line, indented by
    /// depth, draws the tree rotated a quarter turn counterclockwise.
    pub fn walk_reverse<'a, F>(&'a self, visit_missing: bool, mut visit: F) -> Result<(), WalkError>
    where
        F: FnMut(Option<&'a T>, usize),
    {
        let mut stack: Vec<(NonNull<T>, usize)> = Vec::new();
        let mut opt_cur = self.root;
        let mut depth = 0;

        loop {
            if let Some(cur) = opt_cur {
                // Defer the node until its right subtree is done.
                push(&mut stack, (cur, depth))?;
                opt_cur = unsafe { T::links(cur).as_ref().right() };
                depth += 1;
                continue;
            }

            if visit_missing {
                visit(None, depth);
            }

            let Some((cur, cur_depth)) = stack.pop() else {
                break;
            };

            visit(Some(unsafe { cur.as_ref() }), cur_depth);
            opt_cur = unsafe { T::links(cur).as_ref().left() };
            depth = cur_depth + 1;
        }

        Ok(())
    }

    /// Folds every node in order (left subtree, node, right subtree) into an accumulator.
    pub fn try_fold_in_order<'a, B, F>(&'a self, init: B, mut f: F) -> Result<B, WalkError>
    where
        F: FnMut(B, &'a T) -> B,
    {
        let mut stack: Vec<NonNull<T>> = Vec::new();
        let mut acc = init;
        let mut opt_cur = self.root;

        loop {
            while let Some(cur) = opt_cur {
                push(&mut stack, cur)?;
                opt_cur = unsafe { T::links(cur).as_ref().left() };
            }

            let Some(cur) = stack.pop() else {
                break;
            };

            acc = f(acc, unsafe { cur.as_ref() });
            opt_cur = unsafe { T::links(cur).as_ref().right() };
        }

        Ok(acc)
    }
}

fn push<E>(stack: &mut Vec<E>, entry: E) -> Result<(), WalkError> {
    if stack.len() == stack.capacity() {
        stack
            .try_reserve_exact(STACK_CHUNK)
            .map_err(|source| WalkError::StackExhausted {
                depth: stack.len(),
                source,
            })?;
    }

    stack.push(entry);
    Ok(())
}
