//! SHA3 digests of many files, hashed a batch at a time.

use std::{
    env,
    io::{self, Write},
    path::PathBuf,
    process::ExitCode,
};

use sha3_lanes::{BatchHasher, Sha3Batch, Sha3CpuBatch, corrected_batch_size};
use sha3_tools::{
    ToolError,
    args::{ArgError, BatchArgs},
    files::{hash_files, select_inputs},
    init_tracing,
};
use tracing::info;

fn run_with<B: BatchHasher>(
    mut engine: B, files: &[PathBuf], requested: usize,
) -> Result<(), ToolError> {
    let batch_size = corrected_batch_size(requested, engine.batch_size());
    info!(requested, batch_size, files = files.len(), "hashing files");

    let stdout = io::stdout();
    let mut out = io::BufWriter::new(stdout.lock());
    let report = hash_files(&mut engine, files, batch_size, &mut out, &mut io::stderr())?;
    out.flush()?;
    info!(hashed = report.hashed, skipped = report.skipped, "done");
    Ok(())
}

fn run(args: &BatchArgs) -> Result<(), ToolError> {
    let files = select_inputs(&args.inputs, &args.exclude);
    if args.cpu {
        run_with(Sha3CpuBatch::new(args.width), &files, args.batch_size)
    } else {
        run_with(Sha3Batch::new(args.width)?, &files, args.batch_size)
    }
}

fn main() -> ExitCode {
    init_tracing();
    let args = match BatchArgs::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(ArgError::Help) => {
            eprint!("{}", BatchArgs::USAGE);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{}", BatchArgs::USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
