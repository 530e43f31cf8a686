// Copyright 2026 Tobin Edwards
//
//    Licensed under the Apache License, Version 2.0 (the "License");
//    you may not use this file except in compliance with the License.
//    You may obtain a copy of the License at
//
//        http://www.apache.org/licenses/LICENSE-2.0
//
//    Unless required by applicable law or agreed to in writing, software
//    distributed under the License is distributed on an "AS IS" BASIS,
//    WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//    See the License for the specific language governing permissions and
//    limitations under the License.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use xiangqi_manual::{DecodeOptions, Manual};

/// Convert XQF game records to the CM format.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// XQF (or CM) files to convert
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory the CM files are written to
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// Keep moves the rules do not allow
    #[arg(long)]
    keep_illegal: bool,

    /// Keep records that repeat the move before them
    #[arg(long)]
    keep_repeated: bool,
}

fn convert(input: &Path, out_dir: &Path, options: &DecodeOptions) -> Result<PathBuf> {
    let manual = Manual::read_with(input, options)
        .with_context(|| format!("reading {}", input.display()))?;
    let stem = input
        .file_stem()
        .with_context(|| format!("no file name in {}", input.display()))?;
    let output = out_dir.join(format!("{}.cm", stem.to_string_lossy()));
    manual
        .write(&output)
        .with_context(|| format!("writing {}", output.display()))?;
    Ok(output)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let options = DecodeOptions {
        prune_illegal: !args.keep_illegal,
        skip_repeated: !args.keep_repeated,
    };
    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let mut failed = 0;
    for input in &args.inputs {
        match convert(input, &args.out_dir, &options) {
            Ok(output) => info!(input = %input.display(), output = %output.display(), "Converted"),
            Err(err) => {
                error!("{:#}", err);
                failed += 1;
            }
        }
    }
    info!(total = args.inputs.len(), failed, "Done");
    if failed > 0 {
        bail!("{} of {} files could not be converted", failed, args.inputs.len());
    }
    Ok(())
}
