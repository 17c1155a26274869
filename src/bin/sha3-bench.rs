//! CSV timings of the host and accelerator engines.

use std::{
    env,
    fs::File,
    io::{self, BufWriter, Write},
    process::ExitCode,
};

use sha3_tools::{
    ToolError,
    args::{ArgError, BenchArgs, BenchMode},
    bench::{run_batch, run_kinds, run_single},
    init_tracing,
};

fn run(args: &BenchArgs) -> Result<(), ToolError> {
    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).map_err(|e| ToolError::Io {
                path: Some(path.clone()),
                source: e,
            })?,
        )),
        None => Box::new(io::stdout().lock()),
    };
    let kinds = run_kinds(args.cpu_runs, args.accel_runs);

    match args.mode {
        BenchMode::Single => run_single(&mut out, args.width, &args.sizes, &kinds)?,
        BenchMode::Batch => run_batch(
            &mut out,
            args.width,
            &args.sizes,
            args.batch_size,
            &kinds,
            args.batch_correction,
        )?,
    }
    out.flush()?;
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    if cfg!(debug_assertions) {
        eprintln!("Warning: built without optimizations. Timings are not representative.");
    }

    let args = match BenchArgs::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(ArgError::Help) => {
            eprint!("{}", BenchArgs::USAGE);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{}", BenchArgs::USAGE);
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
