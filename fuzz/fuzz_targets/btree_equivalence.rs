#![no_main]
use libfuzzer_sys::fuzz_target;

use cordyceps_avl::model::{run_btree_equivalence, Op};

// Each run replays an arbitrary sequence of operations against both an AVL tree and a `BTreeSet`.
fuzz_target!(|ops: Vec<Op>| run_btree_equivalence(ops));
