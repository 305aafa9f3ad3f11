use std::alloc::{self, Layout};

use crate::AllocError;

/// Moves `value` into a new heap allocation, reporting allocation failure instead of aborting.
///
/// Lets a caller build a tree node before touching the tree, so that running out of memory can
/// never leave a half-linked node behind.
pub fn try_box<T>(value: T) -> Result<Box<T>, AllocError> {
    let layout = Layout::new::<T>();

    if layout.size() == 0 {
        return Ok(Box::new(value));
    }

    // SAFETY: `layout` has a non-zero size.
    let ptr = unsafe { alloc::alloc(layout) }.cast::<T>();

    if ptr.is_null() {
        return Err(AllocError {
            size: layout.size(),
        });
    }

    // SAFETY: `ptr` was allocated by the global allocator with the layout of `T`, which is the
    // allocation `Box` expects to own.
    unsafe {
        ptr.write(value);
        Ok(Box::from_raw(ptr))
    }
}
