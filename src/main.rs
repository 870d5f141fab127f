//! knap - Command-line bundler for small web projects

use std::process::ExitCode;

use knapsack::cli;

fn main() -> ExitCode {
    cli::run()
}
