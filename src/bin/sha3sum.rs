//! SHA3 digest of a single file, streamed in 1 MiB reads.

use std::{env, process::ExitCode};

use sha3_lanes::{Sha3, Sha3Accel};
use sha3_tools::{
    ToolError,
    args::{ArgError, SumArgs},
    files::hash_file,
    init_tracing,
};

fn run(args: &SumArgs) -> Result<(), ToolError> {
    let digest = if args.accel {
        hash_file(&mut Sha3Accel::new(args.width)?, &args.input)?
    } else {
        hash_file(&mut Sha3::new(args.width), &args.input)?
    };
    println!("{digest}");
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let args = match SumArgs::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(ArgError::Help) => {
            eprint!("{}", SumArgs::USAGE);
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            eprintln!("error: {err}\n\n{}", SumArgs::USAGE);
            return ExitCode::from(2);
        }
    };

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Can't hash {}: {err}", args.input.display());
            ExitCode::FAILURE
        }
    }
}
