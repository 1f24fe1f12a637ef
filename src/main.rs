use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};
use log::{debug, error, info, LevelFilter};
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use mathml_search_engine::config::EngineConfig;
use mathml_search_engine::error::EngineError;
use mathml_search_engine::extractor::{extract_block_equations_from_file, strip_all_attributes};
use mathml_search_engine::feature::extract_features;
use mathml_search_engine::graph::{build_graph_tree, feature_id, GraphStore, InMemoryGraphStore};
use mathml_search_engine::indexer::ingest_corpus;
use mathml_search_engine::query;
use mathml_search_engine::standardize::standardize;
use mathml_search_engine::tree::normalize;

/// Structural search over MathML equations embedded in a corpus of HTML documents.
#[derive(Debug, Parser)]
#[command(name = "mathml-search", version, about)]
struct Cli {
    /// Directory of .html/.htm files to index.
    #[arg(long, global = true)]
    corpus: PathBuf,

    /// Repeat for more verbose logging: -v, -vv, -vvv.
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Index `--corpus` and report document/equation/skip counts.
    Ingest,
    /// Index `--corpus`, then run one retrieval mode over it.
    Query {
        #[command(subcommand)]
        query: QueryCommand,
    },
}

#[derive(Debug, Subcommand)]
enum QueryCommand {
    /// Equations carrying every feature of the query equation exactly.
    Exact {
        #[arg(long)]
        file: PathBuf,
    },
    /// Equations with a stored feature whose operator path contains the
    /// given labels, in order, as a subsequence.
    Subseq {
        #[arg(required = true)]
        labels: Vec<String>,
    },
    /// Every indexed equation, scored against one or more query equations'
    /// features and sorted descending.
    Rank {
        #[arg(long = "file", required = true)]
        files: Vec<PathBuf>,
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(level, Config::default(), TerminalMode::Mixed, ColorChoice::Auto);
}

/// Normalizes and standardizes every block equation in `path`, returning the
/// `(equation_label, feature_ids)` pairs the CLI queries with.
fn query_features_from_file(
    path: &PathBuf,
    config: &EngineConfig,
) -> Result<Vec<(String, Vec<String>)>, EngineError> {
    let equations = extract_block_equations_from_file(path)?;
    let mut out = Vec::with_capacity(equations.len());
    for (i, block_eq) in equations.iter().enumerate() {
        debug!("query equation {i} in {}: {}", path.display(), strip_all_attributes(&block_eq.mathml));
        match normalize(&block_eq.mathml, &config.normalize) {
            Ok(op_tree) => {
                let tree = standardize(&build_graph_tree(&op_tree));
                let ids = extract_features(&tree).into_iter().map(|f| feature_id(&f.operator_path)).collect();
                out.push((format!("{}#{i}", path.display()), ids));
            }
            Err(err) => {
                error!("skipping unparseable query equation {i} in {}: {err}", path.display());
            }
        }
    }
    Ok(out)
}

fn run() -> Result<(), EngineError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = EngineConfig::default();
    let mut store = InMemoryGraphStore::new();
    let report = ingest_corpus(&mut store, &cli.corpus, &config)?;
    info!(
        "indexed {} document(s), {} equation(s), skipped {}",
        report.documents, report.equations, report.skipped
    );

    match &cli.command {
        Command::Ingest => {}
        Command::Query { query: query_cmd } => match query_cmd {
            QueryCommand::Exact { file } => {
                for (label, feature_ids) in query_features_from_file(file, &config)? {
                    let matches = query::exact_match(&store, &feature_ids)?;
                    println!("{label}: {} exact match(es)", matches.len());
                    for eq in matches {
                        println!("  {eq}");
                    }
                }
            }
            QueryCommand::Subseq { labels } => {
                let results = query::subsequence_match(&store, labels)?;
                println!("{} equation(s) contain {labels:?} as a subsequence", results.len());
                for (eq, paths) in results {
                    println!("  {eq}: {} matching path(s)", paths.len());
                }
            }
            QueryCommand::Rank { files, top } => {
                for file in files {
                    for (label, feature_ids) in query_features_from_file(file, &config)? {
                        let ranked = query::ranked_results(&store, &feature_ids)?;
                        println!("{label}:");
                        for (score, eq) in ranked.into_iter().take(*top) {
                            println!("  {score:.4}  {eq}");
                        }
                    }
                }
            }
        },
    }

    Ok(())
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
