use std::{fmt::Write as _, ptr::NonNull};

use cordyceps::Linked;
use cordyceps_avl::{init_logging, Links, PrintError, SearchTree, TreeNode};

#[derive(Debug)]
#[repr(C)]
struct TestNode {
    links: Links<TestNode>,
    key: u32,
}

impl TestNode {
    fn new(key: u32) -> Box<TestNode> {
        Box::new(TestNode {
            links: Links::new(),
            key,
        })
    }
}

unsafe impl Linked<Links<TestNode>> for TestNode {
    type Handle = Box<TestNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<TestNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<TestNode>> for TestNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

const KEYS: [u32; 9] = [1, 40, 33, 60, 9, 75, 29, 5, 8];

fn print(tree: &SearchTree<TestNode>, heading: &str) -> Result<(), PrintError> {
    let mut out = String::new();
    writeln!(out, "{heading}")?;
    tree.write_sideways(&mut out)?;
    println!("{out}");
    Ok(())
}

fn main() -> Result<(), PrintError> {
    init_logging();

    let mut tree: SearchTree<TestNode> = SearchTree::new();

    for key in KEYS {
        if tree.insert(TestNode::new(key)).is_some() {
            println!("{key} is already in the tree");
            continue;
        }
        tree.assert_invariants();
        print(&tree, &format!("insert {key}:"))?;
    }

    for key in KEYS {
        if tree.remove(&key).is_none() {
            println!("{key} is not in the tree");
            continue;
        }
        tree.assert_invariants();
        print(&tree, &format!("delete {key}:"))?;
    }

    Ok(())
}
