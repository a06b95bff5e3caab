// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod logging;
mod runtime;

use anyhow::{Context, Result};
use config::Config;
use runtime::DashboardServices;
use std::env;
use std::path::PathBuf;
use time::OffsetDateTime;
use umdops_app::SessionState;
use umdops_remote::PhotoClient;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
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
            "load config {}; run `umdops --print-example-config` to generate a template",
            options.config_path.display()
        )
    })?;

    let log_path = logging::init_logging(&config)?;
    tracing::info!(
        config = %options.config_path.display(),
        log = %log_path.display(),
        demo = options.demo,
        "starting umdops"
    );

    if options.sync {
        let (snapshot_path, rows) = runtime::sync_snapshot(&config)?;
        println!("synced {rows} rows into {}", snapshot_path.display());
        return Ok(());
    }

    let (mut source, credentials) = if options.demo {
        let today = OffsetDateTime::now_utc().date();
        let source: Box<dyn umdops_app::TabularSource> = Box::new(runtime::demo_source(today)?);
        (source, runtime::demo_credentials())
    } else {
        (runtime::open_source(&config)?, config.credentials()?)
    };

    let (photo_cache, _removed) = runtime::prepare_photo_cache(&config)?;
    let photos = PhotoClient::new(config.photos_base_url(), config.photos_timeout()?)
        .with_context(|| {
            format!(
                "invalid [photos] config in {}; fix base_url/timeout values",
                options.config_path.display()
            )
        })?;

    if options.check_only {
        let rows = runtime::check_tables(source.as_mut())?;
        println!("ok: {rows} rows across every table");
        if credentials.is_empty() {
            println!("warning: [auth.users] is empty; nobody can log in");
        }
        return Ok(());
    }

    let mut state = SessionState::new(config.language());
    let mut services = DashboardServices::new(
        source,
        credentials,
        photos,
        photo_cache,
        config.map_url(),
    );
    let result = umdops_tui::run_app(&mut state, &mut services);
    if let Err(error) = &result {
        tracing::error!(error = %format!("{error:#}"), "dashboard exited with error");
    }
    result
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    demo: bool,
    sync: bool,
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
        print_example: false,
        demo: false,
        sync: false,
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
            "--sync" => {
                options.sync = true;
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

    if options.demo && options.sync {
        anyhow::bail!("--demo and --sync cannot be combined; demo data is never written to disk");
    }

    Ok(options)
}

fn print_help() {
    println!("umdops: UMD field deployment dashboard");
    println!("  --config <path>          Use a specific config path");
    println!("  --print-config-path      Print resolved config path");
    println!("  --print-example-config   Print a config template");
    println!("  --demo                   Launch with generated sheets (in-memory, login demo/demo)");
    println!("  --sync                   Copy the live sheets into the local snapshot and exit");
    println!("  --check                  Validate config and load every table, then exit");
    println!("  --help                   Show this help");
}
