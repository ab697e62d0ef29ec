use std::{
    fs::File,
    io::{self, BufReader},
    path::{Path, PathBuf},
};

use anyhow::Context;
use avl_pairs::{AvlTree, Pair};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Builds AVL trees of `(key,secondary)` records and prints them.
#[derive(Debug, Parser)]
#[command(name = "avl_pairs", version)]
struct Cli {
    /// Print trees as Graphviz digraphs instead of in-order listings.
    #[arg(long, global = true)]
    dot: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Load records from a file (`-` for stdin) and print the tree.
    Load { path: PathBuf },

    /// Run the scripted demonstration.
    Demo,

    /// Load two record files and print their intersection and union.
    SetOps { left: PathBuf, right: PathBuf },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let printer = Printer { dot: cli.dot };

    match cli.command {
        Command::Load { path } => {
            let tree = load(&path)?;
            printer.print("loaded", &tree)?;
        }

        Command::Demo => demo(&printer)?,

        Command::SetOps { left, right } => {
            let left = load(&left)?;
            let right = load(&right)?;

            println!("intersection:");
            printer.print("intersection", &left.intersection(&right))?;
            println!("union:");
            printer.print("union", &left.union(&right))?;
        }
    }

    Ok(())
}

fn load(path: &Path) -> anyhow::Result<AvlTree> {
    let tree = if path == Path::new("-") {
        AvlTree::from_reader(io::stdin().lock()).context("failed to load records from stdin")?
    } else {
        let file =
            File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        AvlTree::from_reader(BufReader::new(file))
            .with_context(|| format!("failed to load records from {}", path.display()))?
    };

    info!(path = %path.display(), len = tree.len(), height = tree.height(), "loaded");

    Ok(tree)
}

struct Printer {
    dot: bool,
}

impl Printer {
    fn print(&self, name: &str, tree: &AvlTree) -> anyhow::Result<()> {
        if self.dot {
            let mut out = String::new();
            tree.dotgraph(name, &mut out)?;
            println!("{out}");
        } else {
            print!("{tree}");
        }

        Ok(())
    }
}

fn demo(printer: &Printer) -> anyhow::Result<()> {
    let mut tree = AvlTree::new();
    tree.insert(10, 10);

    for i in 0..15 {
        if !tree.insert(i, i) {
            println!("({i}, {i}) already exists");
        }
    }
    printer.print("ascending", &tree)?;

    match tree.search(20, 20) {
        Some(node) => println!("key= {} value= {}", node.key(), node.secondary()),
        None => println!("Key 20 does not exist"),
    }

    for i in (1..=17).rev() {
        if !tree.remove(i, i) {
            println!("Key {i} does not exist");
        }
        printer.print("ascending", &tree)?;
    }

    let left: AvlTree = [(6, 25), (6, 10), (6, 12), (6, 20), (9, 25), (10, 25)]
        .into_iter()
        .map(Pair::from)
        .collect();
    printer.print("left", &left)?;

    let right: AvlTree = [(6, 25), (5, 10), (6, 12), (6, 20), (8, 35), (10, 25)]
        .into_iter()
        .map(Pair::from)
        .collect();
    printer.print("right", &right)?;

    printer.print("intersection", &left.intersection(&right))?;
    printer.print("union", &left.union(&right))?;

    Ok(())
}
