use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::Instant;
use subcrawl::{
    init_tracing_once, status_line, CollectionDriver, CrawlOptions, FileSink, Ranking, SnapshotSource, TableFormat,
};

/// Collect comments, authors and gildings from one subreddit, saving every `checkpoint` comments.
#[derive(Parser, Debug)]
#[command(name = "subcrawl", version)]
struct Cli {
    /// Subreddit to collect from (with or without "r/")
    subreddit: String,

    /// Snapshot directory holding submissions.jsonl, threads/, more/ and users.jsonl
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Save the tables every N collected comments
    #[arg(short, long, default_value_t = subcrawl::DEFAULT_CHECKPOINT)]
    checkpoint: u64,

    /// Stop once more than N comments have been collected
    #[arg(short, long, default_value_t = subcrawl::DEFAULT_MINIMUM)]
    minimum: u64,

    /// Directory for comment_data, author_data and gildings_data
    #[arg(short, long, default_value = "./data")]
    out_dir: PathBuf,

    /// Table format: csv or jsonl
    #[arg(long, default_value = "csv")]
    format: TableFormat,

    /// Submission order: top, new or listed
    #[arg(long, default_value = "top")]
    ranking: Ranking,

    /// Do not save leftovers collected after the last checkpoint
    #[arg(long)]
    no_final_flush: bool,

    /// Hide the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Write author created_utc as RFC3339
    #[arg(long)]
    human_timestamps: bool,
}

fn run(cli: Cli) -> Result<ExitCode> {
    let started = Instant::now();
    let opts = CrawlOptions::new(&cli.subreddit)
        .with_checkpoint(cli.checkpoint)
        .with_minimum(cli.minimum)
        .with_out_dir(&cli.out_dir)
        .with_format(cli.format)
        .with_ranking(cli.ranking)
        .with_final_flush(!cli.no_final_flush)
        .with_progress(!cli.no_progress)
        .with_human_timestamps(cli.human_timestamps);

    if let Err(e) = opts.validate() {
        eprintln!("{}", status_line(0, &format!("invalid configuration: {e}"), started.elapsed()));
        return Ok(ExitCode::from(2));
    }

    let sink = FileSink::create(&opts.out_dir, opts.format)?
        .human_timestamps(opts.human_readable_timestamps)
        .write_buffer(opts.write_buffer_bytes);
    let mut driver = CollectionDriver::new(&opts, sink)?;

    let cancel = driver.cancel_handle();
    ctrlc::set_handler(move || {
        tracing::info!("interrupt received; stopping after the current submission");
        cancel.store(true, Ordering::Relaxed);
    })
    .context("failed to set Ctrl+C handler")?;

    let feed = SnapshotSource::open(&cli.snapshot, &opts.subreddit, opts.ranking)?;
    let summary = driver.run(feed)?;

    println!("{}", summary.status_line());
    Ok(ExitCode::SUCCESS)
}

fn main() -> ExitCode {
    init_tracing_once();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
