//
//  bkt-cli
//  main.rs
//
//  Created by Ngonidzashe Mangudya on 2026/01/12.
//  Copyright (c) 2025 IAMNGONI. All rights reserved.
//

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use bkt::cli::{Cli, Factory};
use bkt::exit_codes;

#[tokio::main]
async fn main() {
    init_logging();

    let cli = Cli::parse();
    let mut factory = Factory::new(cli.global.clone());

    let result = cli.command.run(&mut factory).await;
    let code = match &result {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            factory.out().write_error(&format!("{e:#}"));
            exit_codes::for_error(e)
        }
    };
    let _ = factory.out().flush();
    std::process::exit(code);
}

/// Logging goes to stderr, filtered by `BKT_DEBUG` (default `warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_env("BKT_DEBUG").unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
