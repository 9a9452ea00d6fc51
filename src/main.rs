//! Terminal front-end for the ranking engine.
//!
//! Presentation plumbing only: reads the item file, drives a [`Session`]
//! through a stdin prompt loop, and writes the results on completion. All
//! ranking semantics live in the library.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tiersort::engine::machine::Choice;
use tiersort::io::{ensure_items_file, read_items, write_results};
use tiersort::persistence::store::FsStore;
use tiersort::session::{Session, SessionConfig, Status, Step};
use tiersort::types::ItemName;

#[derive(Debug, Parser)]
#[command(name = "tiersort", about = "Rank a list of items by pairwise comparisons")]
struct Cli {
    /// File with one item per line.
    #[arg(long, default_value = "titles.txt")]
    items: PathBuf,

    /// Checkpoint file holding resumable session state.
    #[arg(long, default_value = "tiersort.state.json")]
    state: PathBuf,

    /// Where the final ranking is written.
    #[arg(long, default_value = "results.csv")]
    results: PathBuf,

    /// Discard a checkpoint that no longer matches the item list instead of
    /// reconciling it.
    #[arg(long)]
    no_reconcile: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tiersort=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let items = read_items(&cli.items)?;

    if items.is_empty() {
        if ensure_items_file(&cli.items)? {
            println!("Created {}.", cli.items.display());
        }
        println!(
            "Nothing to rank: fill in {} with one item per line and run again.",
            cli.items.display()
        );
        return Ok(());
    }

    let store = FsStore::new(&cli.state);
    let config = SessionConfig {
        reconcile: !cli.no_reconcile,
        ..SessionConfig::default()
    };

    let mut session = Session::start(items, store, config)?;

    let stdin = std::io::stdin();
    let mut input = stdin.lock().lines();

    loop {
        if session.is_done() {
            let ranking = session.ranked_so_far().to_vec();
            write_results(&cli.results, &ranking)?;
            // Results are durable; only now may the checkpoint go.
            session.conclude()?;
            println!(
                "\nEverything is sorted. Results written to {}:",
                cli.results.display()
            );
            print_ranking(&ranking);
            return Ok(());
        }

        if let Status::Comparing {
            incumbent,
            candidate,
            remaining,
        } = session.status()
        {
            println!("\n{remaining} left. Which one is better?");
            println!("  [1] {incumbent}");
            println!("  [2] {candidate}");
            print!("1/2 to pick, u to undo, q to quit> ");
            std::io::stdout().flush()?;
        }

        let Some(line) = input.next() else {
            println!();
            return Ok(()); // EOF: the checkpoint keeps the session resumable
        };

        let step = match line?.trim() {
            "1" => session.choose(Choice::Incumbent)?,
            "2" => session.choose(Choice::Candidate)?,
            "u" => {
                if !session.undo()? {
                    println!("Nothing to undo.");
                }
                continue;
            }
            "q" => return Ok(()),
            other => {
                println!("Unrecognized input {other:?}.");
                continue;
            }
        };

        if step == Step::Advanced {
            print_ranking(session.ranked_so_far());
        }
    }
}

fn print_ranking(ranking: &[ItemName]) {
    for (position, item) in ranking.iter().enumerate() {
        println!("{:>3}: {item}", position + 1);
    }
}
