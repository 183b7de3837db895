// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::WorkerRuntime;
use std::env;
use std::path::PathBuf;
use tracing::info;
use vetclinic_api::DirectoryClient;
use vetclinic_app::{AppState, ClinicDirectory, viewer_offset};
use vetclinic_testkit::MemoryDirectory;
use vetclinic_tui::ShellOptions;

const DEMO_SEED: u64 = 42;
const DEMO_CLIENTS: usize = 12;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    // Read before any thread starts; later lookups may be refused.
    let utc_offset = viewer_offset();
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;
    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        print!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run `vetclinic --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let directory: Box<dyn ClinicDirectory + Send> = if options.demo {
        Box::new(MemoryDirectory::seeded(DEMO_SEED, DEMO_CLIENTS))
    } else {
        let base_url = config.api_base_url();
        let client = DirectoryClient::new(&base_url, config.api_timeout()?).with_context(|| {
            format!(
                "invalid [api] config in {}; fix base_url/timeout values or set VETCLINIC_API_URL",
                options.config_path.display()
            )
        })?;
        Box::new(client)
    };
    if options.check_only {
        return Ok(());
    }

    logging::init(&config.log_file()?, config.log_level())?;
    info!(
        demo = options.demo,
        base_url = %config.api_base_url(),
        "vetclinic v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let mut state = AppState::starting_at(config.start_screen());
    let mut runtime = WorkerRuntime::start(directory)?;
    vetclinic_tui::run_app(
        &mut state,
        &mut runtime,
        ShellOptions {
            date_locale: config.date_locale(),
            utc_offset,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    demo: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        demo: false,
        print_example: false,
        check_only: false,
        show_help: false,
    };

    let mut iter = args.into_iter();
    while let Some(arg) = iter.next() {
        match arg.as_ref() {
            "--config" => {
                let value = iter
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value.as_ref());
            }
            "--print-config-path" => {
                options.print_config_path = true;
            }
            "--print-example-config" => {
                options.print_example = true;
            }
            "--demo" => {
                options.demo = true;
            }
            "--check" => {
                options.check_only = true;
            }
            "--help" | "-h" => {
                options.show_help = true;
            }
            unknown => {
                return Err(anyhow::anyhow!(
                    "unknown argument {unknown:?}; run with --help to see supported options"
                ));
            }
        }
    }

    Ok(options)
}

fn print_help() {
    println!("vetclinic");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch against seeded in-memory clinic data");
    println!("  --check                  Validate config and the API client, then exit");
    println!("  --help                   Show this help");
}
