use clap::{Parser, Subcommand};
use ips_core::catalogue::SUITE_ID;
use ips_core::{
    CancellationFlag, GroupOutline, OutlineNode, RunConfig, RunOptions, SuiteReport, SuiteResult,
    SuiteService,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "ips")]
#[command(about = "International Patient Summary (IPS) conformance suite")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Where the run configuration comes from.
#[derive(clap::Args)]
struct ConfigArgs {
    /// YAML run configuration file
    #[arg(long)]
    config: Option<PathBuf>,
    /// Validator service base URL
    #[arg(long)]
    validator_url: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the suite tree
    List {
        /// Group to print (defaults to the whole suite)
        #[arg(long)]
        group: Option<String>,
    },
    /// Run a group against a FHIR server
    Run {
        /// FHIR base URL of the server under test
        #[arg(long)]
        url: Option<String>,
        #[command(flatten)]
        config: ConfigArgs,
        /// Named input as key=value (repeatable)
        #[arg(long = "input", value_parser = parse_input)]
        inputs: Vec<(String, String)>,
        /// Group to run (defaults to the whole suite)
        #[arg(long, default_value = SUITE_ID)]
        group: String,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
        /// Run sibling groups concurrently
        #[arg(long)]
        parallel: bool,
    },
    /// Validate a standalone IPS Bundle file
    ValidateBundle {
        /// Bundle JSON file
        file: PathBuf,
        #[command(flatten)]
        config: ConfigArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ips=warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::List { group }) => list(group.as_deref()),
        Some(Commands::Run {
            url,
            config,
            inputs,
            group,
            json,
            parallel,
        }) => run_config(&config, url).and_then(|resolved| {
            let service = SuiteService::new(resolved)?;
            let inputs: BTreeMap<String, String> = inputs.into_iter().collect();
            let options = RunOptions {
                parallel_groups: parallel,
            };
            service
                .run(&group, &inputs, options, CancellationFlag::new())
                .map(|report| print_report(&report, json))
        }),
        Some(Commands::ValidateBundle { file, config, json }) => {
            let content = match std::fs::read_to_string(&file) {
                Ok(content) => content,
                Err(e) => {
                    eprintln!("Error reading {}: {}", file.display(), e);
                    return ExitCode::from(2);
                }
            };
            load_config(&config)
                .and_then(SuiteService::new)
                .and_then(|service| service.validate_bundle(&content))
                .map(|report| print_report(&report, json))
        }
        None => {
            println!("Use 'ips --help' for commands");
            Ok(ExitCode::SUCCESS)
        }
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn load_config(args: &ConfigArgs) -> SuiteResult<RunConfig> {
    let config = match &args.config {
        Some(path) => RunConfig::load(path)?,
        None => RunConfig::new()?,
    };
    match &args.validator_url {
        Some(url) => config.with_validator_url(url.clone()),
        None => Ok(config),
    }
}

/// The run configuration with `--url` applied. Without `--url` the configured server is kept.
fn run_config(args: &ConfigArgs, url: Option<String>) -> SuiteResult<RunConfig> {
    let config = load_config(args)?;
    Ok(match url {
        Some(url) => config.with_server_url(Some(url)),
        None => config,
    })
}

fn list(group: Option<&str>) -> SuiteResult<ExitCode> {
    let service = SuiteService::new(RunConfig::new()?)?;
    let outline = service.outline(group)?;
    print_outline(&outline, 0);
    Ok(ExitCode::SUCCESS)
}

fn print_outline(group: &GroupOutline, depth: usize) {
    let indent = "  ".repeat(depth);
    println!("{indent}{} [{}]{}", group.title, group.id, optional_tag(group.optional));
    for child in &group.children {
        match child {
            OutlineNode::Group(nested) => print_outline(nested, depth + 1),
            OutlineNode::Check(check) => {
                let inputs: Vec<&str> = check.inputs.iter().map(|i| i.name.as_str()).collect();
                let inputs = if inputs.is_empty() {
                    String::new()
                } else {
                    format!(" inputs: {}", inputs.join(", "))
                };
                println!(
                    "{indent}  - {} [{}]{}{}",
                    check.title,
                    check.id,
                    optional_tag(check.optional),
                    inputs
                );
            }
        }
    }
}

fn optional_tag(optional: bool) -> &'static str {
    if optional {
        " (optional)"
    } else {
        ""
    }
}

/// Print the report and map its status to the exit code: 1 when the run failed.
fn print_report(report: &SuiteReport, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(report) {
            Ok(text) => println!("{text}"),
            Err(e) => {
                eprintln!("Error serialising report: {}", e);
                return ExitCode::from(2);
            }
        }
    } else {
        print!("{}", report.render_text());
    }

    match report.status() {
        ips_core::ReportStatus::Fail => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    }
}

fn parse_input(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}
