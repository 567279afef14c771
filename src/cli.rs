use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use nu_plugin_topicmap::{ops, PipelineConfig};
use serde_json::Value;
use std::io::{self, Read};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "topicmap",
    version,
    about = "Cluster documents, project them to 2-D, and label each topic"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster a JSON array of records read from stdin
    Cluster {
        /// Field joined into the clustered text (repeat for several, in order)
        #[arg(short, long = "field", default_value = "content")]
        fields: Vec<String>,
        /// Number of clusters
        #[arg(short = 'k', long, default_value_t = 5, allow_negative_numbers = true)]
        clusters: i64,
        /// Terms per topic label
        #[arg(long, default_value_t = 3)]
        label_terms: usize,
        /// Characters of text kept per scatter point
        #[arg(long, default_value_t = 100)]
        snippet_chars: usize,
    },
    /// Cluster a request object {documents, selected_columns, num_clusters} read from stdin
    Request,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let output = match cli.command {
        Commands::Cluster {
            fields,
            clusters,
            label_terms,
            snippet_chars,
        } => {
            let rows = read_stdin_rows()?;
            let config = PipelineConfig {
                label_terms,
                snippet_chars,
                ..PipelineConfig::default()
            };
            ops::op_cluster_with_config(&rows, &fields, clusters, &config)
                .map_err(anyhow::Error::msg)?
        }
        Commands::Request => {
            let request = read_stdin_json()?;
            ops::op_cluster_request(&request).map_err(anyhow::Error::msg)?
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn read_stdin_json() -> Result<Value> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("failed to read stdin")?;
    serde_json::from_str(&buf).context("invalid JSON on stdin")
}

fn read_stdin_rows() -> Result<Vec<Value>> {
    Ok(match read_stdin_json()? {
        Value::Array(arr) => arr,
        single => vec![single],
    })
}
