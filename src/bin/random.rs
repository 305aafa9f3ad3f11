//! Inserts random keys while deleting some of them again, then checks that the tree is still
//! sorted and balanced.
//!
//! Usage: `random [COUNT] [SEED]`. `COUNT` defaults to 2048; without `SEED` a random one is picked
//! and logged so that a failing run can be repeated.

use std::{env, process::ExitCode, ptr::NonNull};

use cordyceps::Linked;
use cordyceps_avl::{init_logging, try_box, InsertError, Links, SearchTree, TreeNode};
use rand::{rngs::StdRng, Rng, SeedableRng};

const DEFAULT_COUNT: usize = 2048;

// Capacity of the deletion stack.
const DELETE_STACK: usize = 20;

#[repr(C)]
struct RandomNode {
    links: Links<RandomNode>,
    key: u32,
}

unsafe impl Linked<Links<RandomNode>> for RandomNode {
    type Handle = Box<RandomNode>;

    fn into_ptr(r: Self::Handle) -> NonNull<Self> {
        NonNull::from(Box::leak(r))
    }

    unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
        unsafe { Box::from_raw(ptr.as_ptr()) }
    }

    unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<RandomNode>> {
        // SAFETY: Self is #[repr(C)] and `links` is first field
        ptr.cast()
    }
}

impl TreeNode<Links<RandomNode>> for RandomNode {
    type Key = u32;

    fn key(&self) -> &Self::Key {
        &self.key
    }
}

fn parse_arg<T: std::str::FromStr>(arg: Option<String>, name: &str) -> Result<Option<T>, ExitCode> {
    match arg.map(|a| a.parse()) {
        None => Ok(None),
        Some(Ok(value)) => Ok(Some(value)),
        Some(Err(_)) => {
            tracing::error!(name, "invalid argument");
            Err(ExitCode::from(2))
        }
    }
}

fn main() -> ExitCode {
    init_logging();

    let mut args = env::args().skip(1);
    let count = match parse_arg(args.next(), "count") {
        Ok(count) => count.unwrap_or(DEFAULT_COUNT),
        Err(code) => return code,
    };
    let seed = match parse_arg(args.next(), "seed") {
        Ok(seed) => seed.unwrap_or_else(rand::random::<u64>),
        Err(code) => return code,
    };

    tracing::info!(count, seed, "inserting random keys");
    let mut rng = StdRng::seed_from_u64(seed);

    let mut tree: SearchTree<RandomNode> = SearchTree::new();
    let mut to_delete = Vec::with_capacity(DELETE_STACK);

    for _ in 0..count {
        let key: u32 = rng.gen();

        let inserted = unsafe {
            tree.try_insert_with(&key, || {
                try_box(RandomNode {
                    links: Links::new(),
                    key,
                })
            })
        };

        match inserted {
            Ok(_) => {
                if to_delete.len() < DELETE_STACK && rng.gen_ratio(1, 6) {
                    to_delete.push(key);
                }
            }
            Err(InsertError::Occupied) => tracing::debug!(key, "duplicate key"),
            Err(InsertError::Alloc(error)) => {
                tracing::error!(%error, "insert failed");
                return ExitCode::FAILURE;
            }
        }

        if !to_delete.is_empty() && rng.gen_ratio(1, 3) {
            if let Some(key) = to_delete.pop() {
                tree.remove(&key);
            }
        }
    }

    let sorted = tree
        .as_avl()
        .try_fold_in_order((true, None), |(sorted, prev), node| {
            (sorted && prev < Some(node.key), Some(node.key))
        });

    match sorted {
        Ok((true, _)) => {}
        Ok((false, _)) => {
            tracing::error!("not sorted");
            return ExitCode::FAILURE;
        }
        Err(error) => {
            tracing::error!(%error, "traversal failed");
            return ExitCode::FAILURE;
        }
    }

    let height = tree.assert_invariants();
    tracing::info!(len = tree.len(), height, "tree is sorted and balanced");

    ExitCode::SUCCESS
}
