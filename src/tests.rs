use std::{ops::Range, pin::Pin, ptr::NonNull};

use cordyceps::Linked;
use proptest::prelude::*;

use crate::model::{self, TestNode};

use super::*;

fn tree_of(keys: &[u32]) -> SearchTree<TestNode> {
    let mut tree: SearchTree<TestNode> = SearchTree::new();

    for &key in keys {
        assert!(tree.insert(TestNode::new(key)).is_none(), "duplicate {key}");
        tree.assert_invariants();
    }

    tree
}

fn sideways(tree: &SearchTree<TestNode>) -> String {
    let mut out = String::new();
    tree.write_sideways(&mut out).expect("print failed");
    out
}

fn key_of(node: Option<NonNull<TestNode>>) -> Option<u32> {
    node.map(|n| unsafe { n.as_ref() }.key)
}

fn links_of(tree: &SearchTree<TestNode>, key: u32) -> &Links<TestNode> {
    let node = tree.get(&key).expect("key not found");
    &Pin::get_ref(node).links
}

// Calls `f` with every permutation of `0..n`.
fn for_each_permutation(n: u32, mut f: impl FnMut(&[u32])) {
    fn permute(keys: &mut Vec<u32>, k: usize, f: &mut dyn FnMut(&[u32])) {
        if k == keys.len() {
            f(keys);
            return;
        }

        for i in k..keys.len() {
            keys.swap(k, i);
            permute(keys, k + 1, f);
            keys.swap(k, i);
        }
    }

    permute(&mut (0..n).collect(), 0, &mut f);
}

fn insert_find_all(keys: &[u32]) {
    let tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        assert_eq!(unsafe { node.as_ref().key() }, key);
    }
}

fn insert_remove_all(keys: &[u32]) {
    let mut tree = tree_of(keys);

    for key in keys {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }
    assert!(tree.is_empty());

    for &key in keys {
        tree.insert(TestNode::new(key));
        tree.assert_invariants();
    }

    for key in keys.iter().rev() {
        let node = tree.get_raw(key).expect("item not found");
        unsafe { tree.remove_at(node) };
        tree.assert_invariants();
    }
    assert!(tree.is_empty());
}

#[test]
fn zero_elems_find() {
    insert_find_all(&[]);
}

#[test]
fn single_elem_find() {
    insert_find_all(&[0]);
}

#[test]
fn up_to_six_elems_find() {
    for n in 2..=6 {
        for_each_permutation(n, insert_find_all);
    }
}

#[test]
fn remove_one() {
    insert_remove_all(&[0]);
}

#[test]
fn remove_up_to_six() {
    for n in 2..=6 {
        for_each_permutation(n, insert_remove_all);
    }
}

#[test]
fn remove_each_from_full_tree() {
    // Every node of a 31-node tree, including two-child nodes whose successor sits at various
    // depths.
    let keys: Vec<u32> = (0..31).collect();

    for removed in &keys {
        let mut tree = tree_of(&keys);
        assert!(tree.remove(removed).is_some());
        tree.assert_invariants();
        assert!(!tree.contains_key(removed));
        assert_eq!(tree.len(), keys.len() - 1);
    }
}

#[test]
fn ascending_triple_rotates_once() {
    let tree = tree_of(&[1, 2, 3]);

    let root = tree.as_avl().root();
    assert_eq!(key_of(root), Some(2));
    assert_eq!(key_of(links_of(&tree, 2).left()), Some(1));
    assert_eq!(key_of(links_of(&tree, 2).right()), Some(3));

    for key in 1..=3 {
        assert_eq!(links_of(&tree, key).balance(), Balance::Balanced);
    }
}

#[test]
fn zig_zag_triple_rotates_twice() {
    let straight = tree_of(&[1, 2, 3]);
    let zig_zag = tree_of(&[3, 1, 2]);

    assert_eq!(key_of(zig_zag.as_avl().root()), Some(2));
    assert_eq!(sideways(&straight), sideways(&zig_zag));

    for key in 1..=3 {
        assert_eq!(links_of(&zig_zag, key).balance(), Balance::Balanced);
    }
}

const ILLUSTRATED: [u32; 9] = [1, 40, 33, 60, 9, 75, 29, 5, 8];

#[test]
fn illustrated_sequence_shape() {
    let tree = tree_of(&ILLUSTRATED);

    let expected = [
        "               -",
        "          75",
        "               -",
        "     60",
        "               -",
        "          40",
        "               -",
        "33",
        "               -",
        "          29",
        "               -",
        "     9",
        "                    -",
        "               8",
        "                    -",
        "          5",
        "                    -",
        "               1",
        "                    -",
    ];
    assert_eq!(sideways(&tree).lines().collect::<Vec<_>>(), expected);

    assert_eq!(links_of(&tree, 33).balance(), Balance::LeftHeavy);
    assert_eq!(links_of(&tree, 9).balance(), Balance::LeftHeavy);
    assert_eq!(links_of(&tree, 5).balance(), Balance::Balanced);
    assert_eq!(links_of(&tree, 60).balance(), Balance::Balanced);
}

#[test]
fn illustrated_sequence_erases_to_empty() {
    let mut tree = tree_of(&ILLUSTRATED);

    for key in ILLUSTRATED {
        let removed = tree.remove(&key).expect("key not found");
        assert_eq!(removed.key, key);
        tree.assert_invariants();
    }

    assert!(tree.as_avl().root().is_none());
    assert_eq!(tree.len(), 0);
}

#[test]
fn removing_absent_key_keeps_shape() {
    let mut tree = tree_of(&ILLUSTRATED);
    let before = sideways(&tree);

    assert!(tree.remove(&34).is_none());
    assert!(tree.remove(&0).is_none());

    assert_eq!(sideways(&tree), before);
    assert_eq!(tree.len(), ILLUSTRATED.len());
}

#[test]
fn insert_then_erase_round_trip() {
    let mut tree = tree_of(&ILLUSTRATED);
    let mut expected: Vec<u32> = ILLUSTRATED.to_vec();
    expected.sort_unstable();

    for key in [0, 7, 30, 41, 100] {
        assert!(tree.insert(TestNode::new(key)).is_none());
        assert_eq!(tree.remove(&key).map(|node| node.key), Some(key));
        tree.assert_invariants();

        let keys = tree
            .as_avl()
            .try_fold_in_order(Vec::new(), |mut keys, node| {
                keys.push(node.key);
                keys
            })
            .unwrap();
        assert_eq!(keys, expected);
    }
}

#[test]
fn duplicate_insert_is_rejected() {
    let mut tree = tree_of(&[5, 3, 8]);
    let before = sideways(&tree);

    let rejected = tree.insert(TestNode::new(3)).expect("duplicate accepted");
    assert_eq!(rejected.key, 3);
    assert_eq!(tree.len(), 3);
    assert_eq!(sideways(&tree), before);
}

#[test]
fn failed_construction_leaves_tree_untouched() {
    let mut tree = tree_of(&[5, 3, 8]);
    let before = sideways(&tree);

    let err = unsafe {
        tree.try_insert_with(&4, || {
            Err::<Box<TestNode>, _>(AllocError {
                size: core::mem::size_of::<TestNode>(),
            })
        })
    }
    .unwrap_err();
    assert!(matches!(err, InsertError::Alloc(AllocError { .. })));
    assert_eq!(sideways(&tree), before);
    assert_eq!(tree.len(), 3);

    let mut called = false;
    let err = unsafe {
        tree.try_insert_with(&5, || {
            called = true;
            try_box(TestNode {
                links: Links::new(),
                key: 5,
            })
        })
    }
    .unwrap_err();
    assert!(matches!(err, InsertError::Occupied));
    assert!(!called, "constructor must not run for an occupied key");

    let node = unsafe {
        tree.try_insert_with(&4, || {
            try_box(TestNode {
                links: Links::new(),
                key: 4,
            })
        })
    }
    .expect("insert failed");
    assert_eq!(node.key, 4);
    tree.assert_invariants();
    assert_eq!(tree.len(), 4);
}

#[test]
fn entry_api() {
    let mut tree = tree_of(&[10, 20]);

    match tree.entry(&15) {
        Entry::Vacant(vacant) => {
            assert_eq!(vacant.key(), &15);
            unsafe { vacant.insert(TestNode::new(15)) };
        }
        Entry::Occupied(_) => panic!("15 is not in the tree"),
    }
    tree.assert_invariants();

    match tree.entry(&20) {
        Entry::Occupied(occupied) => {
            assert_eq!(occupied.get().key, 20);
            assert_eq!(occupied.remove().key, 20);
        }
        Entry::Vacant(_) => panic!("20 is in the tree"),
    }
    tree.assert_invariants();

    assert_eq!(tree.len(), 2);
    assert!(tree.contains_key(&15));
    assert!(!tree.contains_key(&20));
}

#[test]
fn first_last_pop() {
    let mut tree = tree_of(&ILLUSTRATED);

    assert_eq!(tree.first().map(|n| n.key), Some(1));
    assert_eq!(tree.last().map(|n| n.key), Some(75));

    assert_eq!(tree.pop_first().map(|n| n.key), Some(1));
    assert_eq!(tree.pop_last().map(|n| n.key), Some(75));
    tree.assert_invariants();

    tree.clear();
    assert!(tree.is_empty());
    assert!(tree.first().is_none());
    assert!(tree.pop_last().is_none());
}

#[test]
fn sequential_inserts_respect_height_bound() {
    let mut tree: SearchTree<TestNode> = SearchTree::new();

    for key in 0..2048 {
        tree.insert(TestNode::new(key));
        let height = tree.as_avl().height();
        assert!(height <= model::max_height(tree.len()));
    }

    assert_eq!(tree.assert_invariants(), tree.as_avl().height());
}

#[test]
fn walk_reverse_depths() {
    let tree = tree_of(&[2, 1, 3]);
    let mut visits = Vec::new();

    tree.as_avl()
        .walk_reverse(false, |node, depth| visits.push((node.map(|n| n.key), depth)))
        .unwrap();

    assert_eq!(visits, [(Some(3), 1), (Some(2), 0), (Some(1), 1)]);
}

#[test]
fn empty_tree_prints() {
    let tree: SearchTree<TestNode> = SearchTree::new();
    assert_eq!(sideways(&tree), "-\n");

    let mut dot = String::new();
    tree.dotgraph("empty", &mut dot).unwrap();
    assert_eq!(dot, "digraph \"graph-empty\" {}");
}

#[test]
fn dotgraph_labels_balance() {
    let tree = tree_of(&[2, 1]);

    let mut dot = String::new();
    tree.dotgraph("t", &mut dot).unwrap();

    assert!(dot.contains("\"t-2\" [label=\"2:-1\"]"));
    assert!(dot.contains("\"t-1\" [label=\"1:0\"]"));
    assert!(dot.contains("\"t-2\" -> \"t-1\";"));
}

// The core never looks at keys; these tests drive it with explicit slots only.
mod core_api {
    use super::*;

    #[repr(C)]
    struct Bare {
        links: Links<Bare>,
        id: char,
    }

    unsafe impl Linked<Links<Bare>> for Bare {
        type Handle = Box<Bare>;

        fn into_ptr(r: Self::Handle) -> NonNull<Self> {
            NonNull::from(Box::leak(r))
        }

        unsafe fn from_ptr(ptr: NonNull<Self>) -> Self::Handle {
            unsafe { Box::from_raw(ptr.as_ptr()) }
        }

        unsafe fn links(ptr: NonNull<Self>) -> NonNull<Links<Bare>> {
            // SAFETY: Self is #[repr(C)] and `links` is first field
            ptr.cast()
        }
    }

    // Owns the nodes of a test tree and frees them on drop.
    struct Nodes(Vec<NonNull<Bare>>);

    impl Nodes {
        fn new(ids: &str) -> Nodes {
            Nodes(
                ids.chars()
                    .map(|id| {
                        Bare::into_ptr(Box::new(Bare {
                            links: Links::new(),
                            id,
                        }))
                    })
                    .collect(),
            )
        }

        fn get(&self, id: char) -> NonNull<Bare> {
            *self
                .0
                .iter()
                .find(|n| unsafe { n.as_ref() }.id == id)
                .expect("no such node")
        }
    }

    impl Drop for Nodes {
        fn drop(&mut self) {
            for &node in &self.0 {
                drop(unsafe { Bare::from_ptr(node) });
            }
        }
    }

    fn id(node: Option<NonNull<Bare>>) -> Option<char> {
        node.map(|n| unsafe { n.as_ref() }.id)
    }

    fn links(node: NonNull<Bare>) -> &'static Links<Bare> {
        unsafe { Bare::links(node).as_ref() }
    }

    unsafe fn link(tree: &mut AvlTree<Bare>, node: NonNull<Bare>, slot: Slot<Bare>) {
        unsafe {
            tree.link_node(node, slot);
            tree.insert_rebalance(node);
        }
        tree.assert_invariants();
    }

    fn child(parent: NonNull<Bare>, dir: Dir) -> Slot<Bare> {
        Slot::Child { parent, dir }
    }

    #[test]
    fn right_chain_rotates_left() {
        let nodes = Nodes::new("abc");
        let (a, b, c) = (nodes.get('a'), nodes.get('b'), nodes.get('c'));
        let mut tree = AvlTree::new();

        unsafe {
            link(&mut tree, a, Slot::Root);
            link(&mut tree, b, child(a, Dir::Right));
            assert_eq!(links(a).balance(), Balance::RightHeavy);
            link(&mut tree, c, child(b, Dir::Right));
        }

        assert_eq!(id(tree.root()), Some('b'));
        assert_eq!(id(links(b).left()), Some('a'));
        assert_eq!(id(links(b).right()), Some('c'));
        assert_eq!(links(b).parent(), None);
        assert_eq!(links(a).parent(), Some(b));
    }

    #[test]
    fn left_zig_zag_rotates_twice() {
        let nodes = Nodes::new("abc");
        let (a, b, c) = (nodes.get('a'), nodes.get('b'), nodes.get('c'));
        let mut tree = AvlTree::new();

        unsafe {
            link(&mut tree, c, Slot::Root);
            link(&mut tree, a, child(c, Dir::Left));
            link(&mut tree, b, child(a, Dir::Right));
        }

        assert_eq!(id(tree.root()), Some('b'));
        assert_eq!(id(links(b).left()), Some('a'));
        assert_eq!(id(links(b).right()), Some('c'));
        assert_eq!(tree.height(), 2);
    }

    #[test]
    fn erase_through_childless_start() {
        // b has a left leaf and a right child c with a single right leaf d:
        //
        //     b
        //    / \
        //   a   c
        //        \
        //         d
        let nodes = Nodes::new("abcd");
        let (a, b, c, d) = (nodes.get('a'), nodes.get('b'), nodes.get('c'), nodes.get('d'));
        let mut tree = AvlTree::new();

        unsafe {
            link(&mut tree, b, Slot::Root);
            link(&mut tree, a, child(b, Dir::Left));
            link(&mut tree, c, child(b, Dir::Right));
            link(&mut tree, d, child(c, Dir::Right));
        }
        assert_eq!(links(c).balance(), Balance::RightHeavy);
        assert_eq!(links(b).balance(), Balance::RightHeavy);

        // Removing d leaves c childless; c must read as balanced before b is examined.
        unsafe { tree.erase(d) };
        tree.assert_invariants();

        assert_eq!(links(c).balance(), Balance::Balanced);
        assert_eq!(links(b).balance(), Balance::Balanced);
        assert_eq!(id(links(b).right()), Some('c'));
        assert!(links(d).parent().is_none());
    }

    #[test]
    fn erase_root_with_two_children_uses_successor() {
        //       b
        //      / \
        //     a   d
        //        /
        //       c
        let nodes = Nodes::new("abcd");
        let (a, b, c, d) = (nodes.get('a'), nodes.get('b'), nodes.get('c'), nodes.get('d'));
        let mut tree = AvlTree::new();

        unsafe {
            link(&mut tree, b, Slot::Root);
            link(&mut tree, a, child(b, Dir::Left));
            link(&mut tree, d, child(b, Dir::Right));
            link(&mut tree, c, child(d, Dir::Left));

            tree.erase(b);
        }
        tree.assert_invariants();

        // c is the successor of b and takes over the root, along with b's balance.
        assert_eq!(id(tree.root()), Some('c'));
        assert_eq!(id(links(c).left()), Some('a'));
        assert_eq!(id(links(c).right()), Some('d'));
        assert_eq!(links(c).balance(), Balance::Balanced);
    }

    #[test]
    fn erase_rebalance_from_explicit_start() {
        let nodes = Nodes::new("abc");
        let (a, b, c) = (nodes.get('a'), nodes.get('b'), nodes.get('c'));
        let mut tree = AvlTree::new();

        unsafe {
            link(&mut tree, b, Slot::Root);
            link(&mut tree, a, child(b, Dir::Left));
            link(&mut tree, c, child(b, Dir::Right));

            // Detach the right leaf by hand, then let the core fix up the balance factors.
            Bare::links(b).as_mut().set_right(None);
            Bare::links(c).as_mut().clear();
            tree.erase_rebalance(b, Dir::Right);
        }
        tree.assert_invariants();

        assert_eq!(links(b).balance(), Balance::LeftHeavy);
    }

    #[test]
    fn erase_rebalance_rotates_around_balanced_sibling() {
        //     b               d
        //    / \             / \
        //   a   d    ==>    b   e
        //      / \           \
        //     c   e           c
        let nodes = Nodes::new("abcde");
        let [a, b, c, d, e] = ['a', 'b', 'c', 'd', 'e'].map(|id| nodes.get(id));
        let mut tree = AvlTree::new();

        unsafe {
            link(&mut tree, b, Slot::Root);
            link(&mut tree, a, child(b, Dir::Left));
            link(&mut tree, d, child(b, Dir::Right));
            link(&mut tree, c, child(d, Dir::Left));
            link(&mut tree, e, child(d, Dir::Right));

            tree.erase(a);
        }
        tree.assert_invariants();

        assert_eq!(id(tree.root()), Some('d'));
        assert_eq!(links(d).balance(), Balance::LeftHeavy);
        assert_eq!(links(b).balance(), Balance::RightHeavy);
        assert_eq!(id(links(b).right()), Some('c'));
    }

    #[test]
    fn links_accessors() {
        let nodes = Nodes::new("ab");
        let (a, b) = (nodes.get('a'), nodes.get('b'));

        unsafe {
            let la = Bare::links(a).as_mut();
            assert_eq!(la.balance(), Balance::Balanced);
            la.set_balance(Balance::LeftHeavy);
            assert_eq!(la.balance(), Balance::LeftHeavy);
            assert_eq!(la.set_parent(Some(b)), None);
            assert_eq!(la.parent(), Some(b));

            la.clear();
            assert_eq!(la.balance(), Balance::Balanced);
            assert_eq!(la.parent(), None);
        }
    }
}

#[cfg(miri)]
const FUZZ_RANGE: Range<usize> = 0..10;

#[cfg(not(miri))]
const FUZZ_RANGE: Range<usize> = 0..1000;

proptest::proptest! {
    #![proptest_config(ProptestConfig {
        max_shrink_iters: 65536,
        .. ProptestConfig::default()
    })]

    #[test]
    fn btree_equivalence(ops in proptest::collection::vec(model::op_strategy(), FUZZ_RANGE)) {
        model::run_btree_equivalence(ops);
    }

    #[test]
    fn random_keys_stay_sorted(keys in proptest::collection::vec(any::<u32>(), 0..500)) {
        let mut tree: SearchTree<TestNode> = SearchTree::new();
        for key in keys {
            tree.insert(TestNode::new(key));
        }

        let (sorted, _) = tree
            .as_avl()
            .try_fold_in_order((true, None), |(sorted, prev), node| {
                (sorted && prev.map_or(true, |p| p <= node.key), Some(node.key))
            })
            .unwrap();
        prop_assert!(sorted);
        prop_assert!(tree.as_avl().height() <= model::max_height(tree.len()));
    }
}
