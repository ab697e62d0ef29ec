use core::ptr::NonNull;
use std::{
    collections::VecDeque,
    fmt::{self, Write},
};

use crate::{links, AvlTree, Node};

/// Lists the tree in order, one `(key,secondary)height` line per node.
impl fmt::Display for AvlTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.iter() {
            writeln!(f, "{}{}", node.pair(), node.height())?;
        }

        Ok(())
    }
}

impl AvlTree {
    /// Writes the tree as a Graphviz digraph, one rank per level.
    pub fn dotgraph<W>(&self, name: &str, mut w: W) -> fmt::Result
    where
        W: fmt::Write,
    {
        let root = match self.root {
            Some(r) => r,
            None => return write!(w, "digraph \"graph-{name}\" {{}}"),
        };

        enum Item {
            Node(NonNull<Node>),
            Missing(u32),
        }

        fn node_id(name: &str, node: &Node) -> String {
            format!("graph{name}-{}_{}", node.key(), node.secondary())
        }

        let mut queue = VecDeque::new();
        queue.push_back(Item::Node(root));

        write!(
            w,
            "digraph \"graph-{name}\" {{\n subgraph \"subgraph-{name}\" {{"
        )?;

        let mut missing = 0;
        let mut edges = String::new();

        while !queue.is_empty() {
            write!(w, "{{rank=same; ")?;

            for _ in 0..queue.len() {
                let node = match queue.pop_front() {
                    Some(Item::Node(node)) => unsafe { node.as_ref() },
                    Some(Item::Missing(id)) => {
                        write!(w, "\"graph{name}-missing{id}\" [shape=point]; ")?;
                        continue;
                    }
                    None => break,
                };

                let id = node_id(name, node);
                write!(
                    w,
                    "\"{id}\" [label=\"{},{}:{}\"]; ",
                    node.key(),
                    node.secondary(),
                    node.height()
                )?;

                let ptr = NonNull::from(node);
                for child in unsafe { [links(ptr).left(), links(ptr).right()] } {
                    match child {
                        Some(child) => {
                            let child_id = node_id(name, unsafe { child.as_ref() });
                            queue.push_back(Item::Node(child));
                            writeln!(edges, "\"{id}\" -> \"{child_id}\";")?;
                        }
                        None => {
                            queue.push_back(Item::Missing(missing));
                            writeln!(edges, "\"{id}\" -> \"graph{name}-missing{missing}\";")?;
                            missing += 1;
                        }
                    }
                }
            }

            writeln!(w, "}}")?;
        }

        w.write_str(&edges)?;

        w.write_str(" }\n}")
    }
}
