use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command};
use colored::*;
use std::process;

use portsweep::{
    config::ScanConfig,
    output::{OutputConfig, OutputFormat, OutputManager},
    scanner::ScanEngine,
    utils::{self, port_spec::PortSpec},
};

fn build_cli() -> Command {
    Command::new("portsweep")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Multi-threaded TCP connect port scanner")
        .arg(
            Arg::new("target")
                .short('t')
                .long("target")
                .value_name("HOST")
                .help("Target IP or hostname")
                .required(true),
        )
        .arg(
            Arg::new("ports")
                .short('p')
                .long("ports")
                .value_name("PORTS")
                .help("Port range (e.g., 1-1000 or 22,80,443). Default: 1-1000"),
        )
        .arg(
            Arg::new("timeout")
                .short('T')
                .long("timeout")
                .value_name("SECONDS")
                .help("Connection timeout in seconds. Default: 1")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("COUNT")
                .help("Maximum number of concurrent connection attempts. Default: 50")
                .value_parser(clap::value_parser!(usize)),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("FILE")
                .help("Output JSON file"),
        )
        .arg(
            Arg::new("format")
                .long("format")
                .value_name("FORMAT")
                .help("Console output format")
                .value_parser(["text", "json"])
                .default_value("text"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (default: ~/.portsweep.toml)"),
        )
        .arg(
            Arg::new("ulimit")
                .short('u')
                .long("ulimit")
                .value_name("LIMIT")
                .help("Automatically increase ulimit to this value")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Show closed ports and errors, enable debug logging")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Disable colored output")
                .action(ArgAction::SetTrue),
        )
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

/// Merge the config file with command line overrides
fn load_config(matches: &ArgMatches) -> anyhow::Result<ScanConfig> {
    let mut config = match matches.get_one::<String>("config") {
        Some(path) => ScanConfig::from_toml_file(path)?,
        None => ScanConfig::load_default_config(),
    };

    if let Some(ports) = matches.get_one::<String>("ports") {
        config.ports = ports.clone();
    }
    if let Some(seconds) = matches.get_one::<u64>("timeout") {
        config.timeout = seconds.saturating_mul(1000);
    }
    if let Some(threads) = matches.get_one::<usize>("threads") {
        config.concurrency = *threads;
    }

    config.validate()?;
    Ok(config)
}

fn adjust_ulimit(limit: Option<u64>) {
    if let Some(limit) = limit {
        match utils::raise_file_descriptor_limit(limit) {
            Ok(soft) => println!(
                "{} {}",
                "[~] Automatically increasing ulimit value to".bright_blue(),
                soft.to_string().bright_cyan().bold()
            ),
            Err(e) => eprintln!("{} {}", "[!] ERROR: Failed to set ulimit value:".bright_red(), e),
        }
    }
}

async fn run(matches: ArgMatches) -> anyhow::Result<bool> {
    let config = load_config(&matches)?;
    let target = matches
        .get_one::<String>("target")
        .context("target is required")?;

    let spec = PortSpec::parse(&config.ports)?;
    let ports = spec.resolve();

    adjust_ulimit(matches.get_one::<u64>("ulimit").copied());
    utils::check_concurrency_against_limit(config.concurrency);

    let engine = ScanEngine::new(target, config.clone())?;

    let token = engine.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("{}", "\n[!] Interrupted, stopping scan...".bright_yellow());
            token.cancel();
        }
    });

    let format = match matches.get_one::<String>("format") {
        Some(format) => format.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!(e))?,
        None => OutputFormat::Text,
    };

    if format == OutputFormat::Text {
        println!(
            "{} {} ({} ports, {} concurrent, {}s timeout)",
            "[~] Scanning".bright_blue(),
            engine.target().bright_cyan().bold(),
            ports.len(),
            config.concurrency,
            config.timeout_duration().as_secs_f64()
        );
    }

    let results = engine.scan(&ports).await?;

    let output = OutputManager::new(OutputConfig {
        format,
        colored: !matches.get_flag("no-color"),
        verbose: matches.get_flag("verbose"),
    });
    output.write_results(&results)?;

    if let Some(path) = matches.get_one::<String>("output") {
        OutputManager::export_json(&results, path)
            .with_context(|| format!("failed to export results to {}", path))?;
        if format == OutputFormat::Text {
            println!("\n{} {}", "Results exported to".bright_green(), path);
        }
    }

    Ok(!results.is_cancelled())
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    if matches.get_flag("no-color") {
        colored::control::set_override(false);
    }
    init_logging(matches.get_flag("verbose"));

    match run(matches).await {
        Ok(true) => {}
        Ok(false) => process::exit(130),
        Err(e) => {
            eprintln!("{} {:#}", "[!] Error:".bright_red(), e);
            process::exit(1);
        }
    }
}
