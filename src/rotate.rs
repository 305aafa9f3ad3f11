// Rotation primitives.
//
// Each primitive takes an out-of-balance node `parent` and its child `heavy` on the taller side,
// rewires the three or four nodes involved, and returns the new root of the subtree. Balance
// factors are assigned from a fixed table rather than recomputed from heights.
//
// The new subtree root's parent link and the slot above `parent` (in the grandparent or at the
// tree root) are NOT updated; reattaching the returned node is the caller's job.

use core::ptr::NonNull;

use cordyceps::Linked;

use crate::{tracing_helpers::trace_log, Balance, Dir, Links};

/// Single rotation lifting the right child of `parent`.
#[inline]
pub(crate) unsafe fn rotate_left<T>(parent: NonNull<T>, right_child: NonNull<T>) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe { rotate_single(parent, right_child, Dir::Right) }
}

/// Single rotation lifting the left child of `parent`.
#[inline]
pub(crate) unsafe fn rotate_right<T>(parent: NonNull<T>, left_child: NonNull<T>) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe { rotate_single(parent, left_child, Dir::Left) }
}

/// Double rotation lifting the left child of the right child of `parent`.
#[inline]
pub(crate) unsafe fn rotate_right_left<T>(parent: NonNull<T>, right_child: NonNull<T>) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe { rotate_double(parent, right_child, Dir::Right) }
}

/// Double rotation lifting the right child of the left child of `parent`.
#[inline]
pub(crate) unsafe fn rotate_left_right<T>(parent: NonNull<T>, left_child: NonNull<T>) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe { rotate_double(parent, left_child, Dir::Left) }
}

/// Rotates the subtree at `parent`, whose taller side is `dir`, choosing single or double rotation
/// from the balance of `heavy`.
///
/// A double rotation is needed exactly when `heavy` leans away from `dir`.
pub(crate) unsafe fn rotate_toward<T>(parent: NonNull<T>, heavy: NonNull<T>, dir: Dir) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe {
        let zig_zag = T::links(heavy).as_ref().balance().is_heavy(!dir);

        match (dir, zig_zag) {
            (Dir::Right, false) => rotate_left(parent, heavy),
            (Dir::Left, false) => rotate_right(parent, heavy),
            (Dir::Right, true) => rotate_right_left(parent, heavy),
            (Dir::Left, true) => rotate_left_right(parent, heavy),
        }
    }
}

// Lifts `heavy`, the `dir` child of `parent`:
//
//         parent                heavy
//         /    \                /    \
//       (a)   heavy   ==>   parent   (c)
//             /   \         /   \
//           (b)   (c)     (a)   (b)
//
// (drawn for `dir == Right`)
unsafe fn rotate_single<T>(parent: NonNull<T>, heavy: NonNull<T>, dir: Dir) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    trace_log!(?parent, ?heavy, ?dir, "rotate single");

    unsafe {
        let parent_links = T::links(parent).as_mut();
        let heavy_links = T::links(heavy).as_mut();

        let across = heavy_links.child(!dir);
        parent_links.set_child(dir, across);
        if let Some(across) = across {
            T::links(across).as_mut().set_parent(Some(parent));
        }

        heavy_links.set_child(!dir, Some(parent));
        parent_links.set_parent(Some(heavy));

        if heavy_links.balance() == Balance::Balanced {
            // Only reachable while rebalancing after an erase; the subtree keeps its height.
            parent_links.set_balance(Balance::heavy(dir));
            heavy_links.set_balance(Balance::heavy(!dir));
        } else {
            parent_links.set_balance(Balance::Balanced);
            heavy_links.set_balance(Balance::Balanced);
        }
    }

    heavy
}

// Lifts `grand`, the `!dir` child of `heavy`, which is itself the `dir` child of `parent`:
//
//         parent                    grand
//         /    \                  /       \
//       (a)   heavy   ==>    parent       heavy
//             /   \          /   \        /   \
//          grand  (d)      (a)   (b)    (c)   (d)
//          /   \
//        (b)   (c)
//
// (drawn for `dir == Right`)
unsafe fn rotate_double<T>(parent: NonNull<T>, heavy: NonNull<T>, dir: Dir) -> NonNull<T>
where
    T: Linked<Links<T>> + ?Sized,
{
    unsafe {
        let parent_links = T::links(parent).as_mut();
        let heavy_links = T::links(heavy).as_mut();

        let grand = heavy_links
            .child(!dir)
            .expect("double rotation requires a grandchild");
        let grand_links = T::links(grand).as_mut();

        trace_log!(?parent, ?heavy, ?grand, ?dir, "rotate double");

        let inner = grand_links.child(dir);
        heavy_links.set_child(!dir, inner);
        if let Some(inner) = inner {
            T::links(inner).as_mut().set_parent(Some(heavy));
        }
        grand_links.set_child(dir, Some(heavy));
        heavy_links.set_parent(Some(grand));

        let outer = grand_links.child(!dir);
        parent_links.set_child(dir, outer);
        if let Some(outer) = outer {
            T::links(outer).as_mut().set_parent(Some(parent));
        }
        grand_links.set_child(!dir, Some(parent));
        parent_links.set_parent(Some(grand));

        let (parent_balance, heavy_balance) = match grand_links.balance() {
            b if b.is_heavy(dir) => (Balance::heavy(!dir), Balance::Balanced),
            Balance::Balanced => (Balance::Balanced, Balance::Balanced),
            _ => (Balance::Balanced, Balance::heavy(dir)),
        };
        parent_links.set_balance(parent_balance);
        heavy_links.set_balance(heavy_balance);
        grand_links.set_balance(Balance::Balanced);

        grand
    }
}
