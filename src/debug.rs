use core::{
    fmt::{self, Write as _},
    mem,
};

use cordyceps::Linked;

use crate::{Links, PrintError, SearchTree, TreeNode};

// Indentation per level of depth in `write_sideways`.
const INDENT: usize = 5;

impl<T> SearchTree<T>
where
    T: TreeNode<Links<T>> + ?Sized,
    T::Key: fmt::Display,
{
    /// Draws the tree rotated a quarter turn counterclockwise: the root in the first column, right
    /// subtrees above their parents and left subtrees below, one line per node. Empty child slots
    /// are drawn as `-`.
    ///
    /// ```text
    ///           3
    ///                -
    ///                -
    ///      2
    ///                -
    ///                -
    ///           1
    /// ```
    pub fn write_sideways<W: fmt::Write>(&self, mut w: W) -> Result<(), PrintError> {
        let mut result = Ok(());

        self.tree.walk_reverse(true, |node, depth| {
            if result.is_err() {
                return;
            }

            let pad = depth * INDENT;
            result = match node {
                Some(node) => writeln!(w, "{:pad$}{}", "", node.key()),
                None => writeln!(w, "{:pad$}-", ""),
            };
        })?;

        Ok(result?)
    }

    /// Writes the tree in Graphviz `dot` format. Nodes are labeled `key:balance`, where the balance
    /// is `-1`, `0` or `1`.
    pub fn dotgraph<W: fmt::Write>(&self, name: &str, mut w: W) -> fmt::Result {
        let root = match self.tree.root() {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        let mut level = vec![root];

        writeln!(w, "digraph \"graph-{name}\" {{")?;

        let mut missing = 0;
        let mut edges = String::new();

        while !level.is_empty() {
            // One breadth-first level per `rank=same` group.
            write!(w, "  {{rank=same; ")?;

            for node in mem::take(&mut level) {
                let links = unsafe { T::links(node).as_ref() };
                let key = unsafe { node.as_ref() }.key();
                let balance = links.balance().as_i8();
                write!(w, "\"{name}-{key}\" [label=\"{key}:{balance}\"]; ")?;

                for child in [links.left(), links.right()] {
                    match child {
                        Some(child) => {
                            let child_key = unsafe { child.as_ref() }.key();
                            level.push(child);
                            writeln!(edges, "  \"{name}-{key}\" -> \"{name}-{child_key}\";")?;
                        }
                        None => {
                            write!(w, "\"{name}-missing{missing}\" [shape=point]; ")?;
                            writeln!(edges, "  \"{name}-{key}\" -> \"{name}-missing{missing}\";")?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;
        w.write_str("}\n")
    }
}
