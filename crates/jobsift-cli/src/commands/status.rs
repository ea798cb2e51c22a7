//! `jobsift status` -- queue and output progress.

use std::path::PathBuf;

use clap::Args;
use jobsift_core::CheckpointStore;
use jobsift_core::output::count_rows;

/// Arguments for `jobsift status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Input CSV (the queue).
    #[arg(long)]
    pub input: PathBuf,

    /// Output CSV.
    #[arg(long)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, PartialEq, Eq)]
struct Progress {
    remaining: usize,
    written: Option<usize>,
}

fn collect(args: &StatusArgs) -> anyhow::Result<Progress> {
    let remaining = if args.input.exists() {
        CheckpointStore::new(&args.input).load()?.len()
    } else {
        0
    };
    let written = args.output.as_deref().map(count_rows).transpose()?;
    Ok(Progress { remaining, written })
}

pub fn run(args: StatusArgs) -> anyhow::Result<()> {
    let progress = collect(&args)?;
    println!("Input:      {}", args.input.display());
    println!("Remaining:  {}", progress.remaining);
    if let (Some(path), Some(written)) = (&args.output, progress.written) {
        println!("Output:     {}", path.display());
        println!("Written:    {written}");
    }
    Ok(())
}
