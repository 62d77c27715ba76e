//! `cfgsync` binary entry point

use anyhow::{Context, Result};
use cfgsync_cli::{render, RunOptions};
use cfgsync_core::OperationStatus;
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::path::PathBuf;
use std::process::ExitCode;

fn cli() -> Command {
    let source = Arg::new("source")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("Directory tree or .zip archive to read");

    Command::new("cfgsync")
        .version(cfgsync_cli::VERSION)
        .about("Plan and apply configuration-as-code change sets")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("tenant")
                .long("tenant")
                .global(true)
                .default_value("default")
                .help("Tenant owning the changes"),
        )
        .arg(
            Arg::new("prefix")
                .long("prefix")
                .global(true)
                .help("Path prepended to every file, e.g. Setup"),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("TOML pipeline configuration"),
        )
        .arg(
            Arg::new("max-parallel")
                .long("max-parallel")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Override the batch size cap"),
        )
        .arg(
            Arg::new("entity-limit")
                .long("entity-limit")
                .global(true)
                .value_parser(value_parser!(usize))
                .help("Per-tenant entity cap of the in-memory store"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print results as JSON"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON lines on stderr"),
        )
        .subcommand(
            Command::new("plan")
                .about("Show the ordered batches without applying anything")
                .arg(source.clone()),
        )
        .subcommand(
            Command::new("apply")
                .about("Apply every file into an in-memory store and report per-file status")
                .arg(source),
        )
}

fn options(matches: &ArgMatches) -> Result<RunOptions> {
    let config_path = matches.get_one::<PathBuf>("config");
    let mut config = cfgsync_cli::load_config(config_path.map(PathBuf::as_path))?;
    if let Some(max) = matches.get_one::<usize>("max-parallel") {
        config = config.with_max_parallel(*max);
    }

    let tenant = matches
        .get_one::<String>("tenant")
        .context("tenant is required")?;
    let mut options = RunOptions::new(tenant.as_str()).with_config(config);
    if let Some(prefix) = matches.get_one::<String>("prefix") {
        options = options.with_prefix(prefix.as_str());
    }
    if let Some(limit) = matches.get_one::<usize>("entity-limit") {
        options = options.with_entity_limit(*limit);
    }
    Ok(options)
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let matches = cli().get_matches();
    let Some((name, args)) = matches.subcommand() else {
        return Ok(ExitCode::FAILURE);
    };

    cfgsync_cli::init_tracing(args.get_flag("log-json"));
    let options = options(args)?;
    let json = args.get_flag("json");
    let source = args
        .get_one::<PathBuf>("source")
        .context("source is required")?;

    match name {
        "plan" => {
            let plan = cfgsync_cli::plan(source, &options)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&render::plan_json(&plan))?);
            } else {
                println!("{}", render::plan_text(&plan));
            }
            Ok(if plan.failures.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        "apply" => {
            let outcome = cfgsync_cli::apply(source, &options).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&outcome.response)?);
            } else {
                println!("{}", render::response_text(&outcome.response));
            }
            Ok(match outcome.response.status {
                OperationStatus::Success => ExitCode::SUCCESS,
                OperationStatus::Failed => ExitCode::FAILURE,
            })
        }
        _ => Ok(ExitCode::FAILURE),
    }
}
