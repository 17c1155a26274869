//! Hand-rolled argument parsing for the three tools.

use std::{path::PathBuf, str::FromStr};

use sha3_lanes::DigestWidth;

const KIB: usize = 1024;
const MIB: usize = KIB * 1024;
const GIB: usize = MIB * 1024;

/// Why parsing stopped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgError {
    /// `-h`/`--help` was given.
    Help,
    Invalid(String),
}

impl core::fmt::Display for ArgError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Help => f.write_str("help requested"),
            Self::Invalid(msg) => f.write_str(msg),
        }
    }
}

impl core::error::Error for ArgError {}

fn invalid(msg: impl Into<String>) -> ArgError {
    ArgError::Invalid(msg.into())
}

fn value(it: &mut impl Iterator<Item = String>, flag: &str) -> Result<String, ArgError> {
    it.next()
        .ok_or_else(|| invalid(format!("{flag} requires a value")))
}

fn parse_width(flag: &str, value: &str) -> Result<DigestWidth, ArgError> {
    let bits = usize::from_str(value)
        .map_err(|_| invalid(format!("Invalid value for {flag}: {value}")))?;
    DigestWidth::try_from(bits)
        .map_err(|_| invalid(format!("{flag} must be one of 224, 256, 384, 512 (got {bits})")))
}

fn parse_count(flag: &str, value: &str, min: usize) -> Result<usize, ArgError> {
    match usize::from_str(value) {
        Ok(n) if n >= min => Ok(n),
        _ => Err(invalid(format!("Invalid value for {flag}: {value}"))),
    }
}

/// Byte count with an optional `b`, `kb`, `mb` or `gb` suffix.
pub fn parse_size(value: &str) -> Option<usize> {
    let lower = value.trim().to_ascii_lowercase();
    let split = lower
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(lower.len());
    let (digits, suffix) = lower.split_at(split);
    let n = usize::from_str(digits).ok()?;
    let unit = match suffix {
        "" | "b" => 1,
        "k" | "kb" => KIB,
        "m" | "mb" => MIB,
        "g" | "gb" => GIB,
        _ => return None,
    };
    n.checked_mul(unit).filter(|&bytes| bytes > 0)
}

/// `sha3sum [-d BITS] [-g] INPUT`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SumArgs {
    pub width: DigestWidth,
    /// Use the accelerator engine.
    pub accel: bool,
    pub input: PathBuf,
}

impl SumArgs {
    pub const USAGE: &'static str = "\
sha3sum: SHA3 digest of one file

USAGE:
  sha3sum [-d|--digest BITS] [-g|--gpu] INPUT

OPTIONS:
  -d, --digest <bits>   Digest length: 224, 256, 384 or 512 (default 512)
  -g, --gpu             Hash on the accelerator engine
";

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgError> {
        let mut width = DigestWidth::Sha3_512;
        let mut accel = false;
        let mut input = None;

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-d" | "--digest" => width = parse_width(&arg, &value(&mut it, &arg)?)?,
                "-g" | "--gpu" => accel = true,
                "-h" | "--help" => return Err(ArgError::Help),
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(invalid(format!("Unknown arg: {flag}")));
                }
                _ if input.is_some() => return Err(invalid("only one INPUT is accepted")),
                _ => input = Some(PathBuf::from(arg)),
            }
        }

        Ok(Self {
            width,
            accel,
            input: input.ok_or_else(|| invalid("INPUT is required"))?,
        })
    }
}

/// `sha3-batch [-d BITS] [-e FILE]... [-b N] [-c] INPUTS...`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchArgs {
    pub width: DigestWidth,
    pub exclude: Vec<PathBuf>,
    /// Requested messages per engine call.
    pub batch_size: usize,
    /// Use the CPU batch engine instead of the accelerator.
    pub cpu: bool,
    pub inputs: Vec<PathBuf>,
}

impl BatchArgs {
    pub const DEFAULT_BATCH_SIZE: usize = 64;

    pub const USAGE: &'static str = "\
sha3-batch: SHA3 digests of many files

USAGE:
  sha3-batch [OPTIONS] INPUTS...

OPTIONS:
  -d, --digest <bits>       Digest length: 224, 256, 384 or 512 (default 512)
  -e, --exclude <file>      Skip this file (repeatable)
  -b, --batch-size <n>      Maximum files per batch (default 64)
  -c, --cpu                 Hash on host threads instead of the accelerator
";

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgError> {
        let mut parsed = Self {
            width: DigestWidth::Sha3_512,
            exclude: Vec::new(),
            batch_size: Self::DEFAULT_BATCH_SIZE,
            cpu: false,
            inputs: Vec::new(),
        };

        let mut it = args.into_iter();
        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-d" | "--digest" => parsed.width = parse_width(&arg, &value(&mut it, &arg)?)?,
                "-e" | "--exclude" => parsed.exclude.push(value(&mut it, &arg)?.into()),
                "-b" | "--batch-size" => {
                    parsed.batch_size = parse_count(&arg, &value(&mut it, &arg)?, 1)?;
                }
                "-c" | "--cpu" => parsed.cpu = true,
                "-h" | "--help" => return Err(ArgError::Help),
                flag if flag.starts_with('-') && flag.len() > 1 => {
                    return Err(invalid(format!("Unknown arg: {flag}")));
                }
                _ => parsed.inputs.push(arg.into()),
            }
        }

        if parsed.inputs.is_empty() {
            return Err(invalid("at least one INPUT is required"));
        }
        Ok(parsed)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BenchMode {
    Single,
    Batch,
}

/// `sha3-bench single|batch [OPTIONS]`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BenchArgs {
    pub mode: BenchMode,
    pub width: DigestWidth,
    /// Rows measured on the host engine.
    pub cpu_runs: usize,
    /// Rows measured on the accelerator engine.
    pub accel_runs: usize,
    /// Message sizes in bytes, one CSV column each.
    pub sizes: Vec<usize>,
    pub batch_size: usize,
    pub batch_correction: bool,
    pub output: Option<PathBuf>,
}

impl BenchArgs {
    pub const USAGE: &'static str = "\
sha3-bench: SHA3 engine timings as CSV

USAGE:
  sha3-bench single [OPTIONS]
  sha3-bench batch  [OPTIONS]

OPTIONS:
  -d, --digest <bits>         Digest length (default 512)
  -c, --cpu <runs>            Rows measured on the host engine (default 1)
  -g, --gpu <runs>            Rows measured on the accelerator engine (default 1)
  -s, --sizes <size>          Data size, e.g. 1mb (repeatable)
  -o, --output-file <file>    Write CSV here instead of stdout
batch only:
  -b, --batch <n>             Messages per batch (default 64)
  -n, --no-batch-correction   Use the batch size as given
";

    pub fn parse(args: impl IntoIterator<Item = String>) -> Result<Self, ArgError> {
        let mut it = args.into_iter();
        let mode = match it.next().as_deref() {
            Some("single") => BenchMode::Single,
            Some("batch") => BenchMode::Batch,
            Some("-h" | "--help") => return Err(ArgError::Help),
            Some(other) => return Err(invalid(format!("Unknown subcommand: {other}"))),
            None => return Err(invalid("a subcommand (single or batch) is required")),
        };
        let batch = mode == BenchMode::Batch;

        let mut parsed = Self {
            mode,
            width: DigestWidth::Sha3_512,
            cpu_runs: 1,
            accel_runs: 1,
            sizes: Vec::new(),
            batch_size: BatchArgs::DEFAULT_BATCH_SIZE,
            batch_correction: true,
            output: None,
        };

        while let Some(arg) = it.next() {
            match arg.as_str() {
                "-d" | "--digest" => parsed.width = parse_width(&arg, &value(&mut it, &arg)?)?,
                "-c" | "--cpu" => parsed.cpu_runs = parse_count(&arg, &value(&mut it, &arg)?, 0)?,
                "-g" | "--gpu" => {
                    parsed.accel_runs = parse_count(&arg, &value(&mut it, &arg)?, 0)?;
                }
                "-s" | "--sizes" => {
                    let raw = value(&mut it, &arg)?;
                    let size = parse_size(&raw)
                        .ok_or_else(|| invalid(format!("Invalid value for {arg}: {raw}")))?;
                    parsed.sizes.push(size);
                }
                "-o" | "--output-file" => parsed.output = Some(value(&mut it, &arg)?.into()),
                "-b" | "--batch" if batch => {
                    parsed.batch_size = parse_count(&arg, &value(&mut it, &arg)?, 1)?;
                }
                "-n" | "--no-batch-correction" if batch => parsed.batch_correction = false,
                "-h" | "--help" => return Err(ArgError::Help),
                other => return Err(invalid(format!("Unknown arg: {other}"))),
            }
        }

        if parsed.sizes.is_empty() {
            parsed.sizes = match mode {
                BenchMode::Single => vec![MIB, 10 * MIB, 20 * MIB, 50 * MIB],
                BenchMode::Batch => vec![MIB, 10 * MIB],
            };
        }
        Ok(parsed)
    }
}
