//! `volley` sends batches of HTTP requests concurrently, within a rate limit
//! and a connection cap, and prints the decoded JSON responses.
//!
//! The volley binary is a wrapper around volley-lib, which provides
//! convenience functions for calling volley from the command-line.
//!
//! Send the requests described in a file, at most 10 per second:
//! ```sh
//! volley --requests-per-period 10 --period 1s requests.json
//! ```
//!
//! Read JSON Lines from stdin and follow `next` links in every response:
//! ```sh
//! cat requests.jsonl | volley --paginate next --format flat
//! ```
//!
//! Limit connections per host and write the responses to a file:
//! ```sh
//! volley --max-connections 4 --output responses.json requests.json
//! ```
#![warn(clippy::all, clippy::pedantic)]
#![warn(
    absolute_paths_not_starting_with_crate,
    rustdoc::invalid_html_tags,
    missing_copy_implementations,
    missing_debug_implementations,
    semicolon_in_expressions_from_macros,
    unreachable_pub,
    unused_extern_crates,
    variant_size_differences,
    clippy::missing_const_for_fn
)]
#![deny(anonymous_parameters, macro_use_extern_crate)]
#![deny(missing_docs)]

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::{error, info, warn};
use volley_lib::{ErrorKind, ResponseResult};

mod client;
mod formatters;
mod input;
mod options;
mod verbosity;

use crate::formatters::{get_output_formatter, log::init_logging};
use crate::input::Requests;
use crate::options::{Config, VOLLEY_CONFIG_FILE, VolleyOptions};

/// A C-like enum that can be cast to `i32` and used as process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    Success = 0,
    // NOTE: exit code 1 is used for any `Result::Err` bubbled up to `main()`
    // using the `?` operator.
    #[allow(unused)]
    UnexpectedFailure = 1,
    BatchFailure = 2,
    InvalidConfig = 3,
}

fn main() -> Result<()> {
    // std::process::exit doesn't guarantee that all destructors will be run,
    // therefore we wrap the main code in another function to ensure that.
    // See: https://doc.rust-lang.org/stable/std/process/fn.exit.html
    let exit_code = run_main()?;
    std::process::exit(exit_code as i32);
}

/// Merge all provided config options into one.
/// This includes a potential config file and command-line arguments
fn load_config() -> Result<VolleyOptions> {
    let mut opts = VolleyOptions::parse();

    init_logging(opts.config.verbose);

    // Load a potentially existing config file and merge it into the config from
    // the CLI
    if let Some(config_file) = &opts.config_file {
        match Config::load_from_file(config_file) {
            Ok(c) => opts.config.merge(c),
            Err(e) => {
                bail!(
                    "Cannot load configuration file `{}`: {e:?}",
                    config_file.display()
                );
            }
        }
    } else {
        // If no config file was explicitly provided, we try to load the default
        // config file from the current directory if the file exits. This will
        // raise an error if the file is invalid, just like the explicit provided
        // config file.
        let default_config = PathBuf::from(VOLLEY_CONFIG_FILE);
        if default_config.is_file() {
            match Config::load_from_file(&default_config) {
                Ok(c) => opts.config.merge(c),
                Err(e) => {
                    bail!(
                        "Cannot load default configuration file `{}`: {e:?}",
                        default_config.display()
                    );
                }
            }
        }
    }

    Ok(opts)
}

fn run_main() -> Result<ExitCode> {
    let opts = match load_config() {
        Ok(opts) => opts,
        Err(e) => {
            error!("Error while loading config: {e}");
            return Ok(ExitCode::InvalidConfig);
        }
    };

    run(&opts)
}

/// Read the batch, send it and write whatever came back
fn run(opts: &VolleyOptions) -> Result<ExitCode> {
    let client = match client::create(&opts.config) {
        Ok(client) => client,
        Err(e) => {
            error!("Invalid configuration: {e:#}");
            return Ok(ExitCode::InvalidConfig);
        }
    };

    let requests = Requests::try_from(opts.input_path())?;
    if requests.descriptors.is_empty() {
        warn!("No request descriptors given");
    }
    let total = requests.descriptors.len();

    match client.execute(requests.descriptors) {
        Ok(responses) => {
            info!("{total} requests succeeded");
            write_output(&opts.config, &responses.into_inner())?;
            Ok(ExitCode::Success)
        }
        Err(ErrorKind::BatchFailed {
            failed,
            total,
            source,
            completed,
        }) => {
            write_output(&opts.config, &completed)?;
            error!(
                "{failed} of {total} requests failed, first failure: {:#}",
                anyhow::Error::from(*source)
            );
            Ok(ExitCode::BatchFailure)
        }
        Err(e) => Err(e).context("Cannot run batch"),
    }
}

fn write_output(cfg: &Config, results: &[ResponseResult]) -> Result<()> {
    let formatted = get_output_formatter(cfg.format).format(results)?;

    if let Some(output) = &cfg.output {
        fs::write(output, formatted).context("Cannot write responses to output file")?;
    } else if cfg.format == options::OutputFormat::JsonLines {
        print!("{formatted}");
    } else {
        println!("{formatted}");
    }
    Ok(())
}
