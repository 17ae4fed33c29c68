use anyhow::Context;
use clap::{Parser, Subcommand};
use opgraph::{OperationGraph, OperationGraphCodec, WriteOptions};
use tracing::info;

#[derive(Parser)]
#[command(name = "opgraph")]
#[command(about = "Operation dependency graph tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Export a graph file as a Graphviz digraph.
    Dot {
        #[arg(long)]
        graph: String,

        #[arg(short = 'o', long)]
        out: String,
    },

    /// Print node, edge, root and level counts.
    Inspect {
        #[arg(long)]
        graph: String,
    },

    /// Read a graph file and write it back out (re-applies compaction).
    Rewrite {
        #[arg(long)]
        graph: String,

        #[arg(short = 'o', long)]
        out: String,

        #[arg(long)]
        pretty: bool,
    },
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let codec = OperationGraphCodec::default();

    match cli.cmd {
        Commands::Dot { graph, out } => {
            let g = read_graph(&codec, &graph)?;
            codec
                .write_to_graphviz_file(&out, &g)
                .with_context(|| format!("write graphviz file {}", out))?;
            info!(nodes = g.len(), edges = g.edge_count(), "wrote {}", out);
        }
        Commands::Inspect { graph } => {
            let g = read_graph(&codec, &graph)?;
            let levels = g.execution_levels();
            let widest = levels.iter().map(Vec::len).max().unwrap_or(0);
            println!("nodes:  {}", g.len());
            println!("edges:  {}", g.edge_count());
            println!("roots:  {}", g.roots().len());
            println!("levels: {} (widest {})", levels.len(), widest);
        }
        Commands::Rewrite { graph, out, pretty } => {
            let g = read_graph(&codec, &graph)?;
            codec
                .write_to_file(&out, &g, WriteOptions { pretty })
                .with_context(|| format!("write graph file {}", out))?;
            info!(nodes = g.len(), "wrote {}", out);
        }
    }

    Ok(())
}

fn read_graph(codec: &OperationGraphCodec, path: &str) -> anyhow::Result<OperationGraph> {
    codec
        .read_from_file(path)
        .with_context(|| format!("read graph file {}", path))
}

/// Human-readable events on stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt as _;
    use tracing_subscriber::util::SubscriberInitExt as _;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
