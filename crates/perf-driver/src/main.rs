use anyhow::Context;
use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use perf_driver::catalog::{Catalog, discover};
use perf_driver::config::DriverConfig;
use perf_driver::driver::Driver;
use perf_driver::engine::SweepEngine;
use perf_driver::error::DriverError;
use perf_driver::invoker::ProcessInvoker;
use perf_driver::registry::HandlerRegistry;
use perf_driver::types::TestId;
use std::path::{Path, PathBuf};

fn bin_dir_arg() -> Arg {
    Arg::new("bin-dir")
        .long("bin-dir")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help(
            "Install directory holding the baseline executables \
             and the pthreads/ and stack/ subdirectories",
        )
}

fn config_arg() -> Arg {
    Arg::new("config")
        .long("config")
        .value_parser(value_parser!(PathBuf))
        .help("TOML configuration file; missing keys keep their defaults")
}

fn test_ids_arg(name: &'static str, help: &'static str) -> Arg {
    Arg::new(name)
        .long(name)
        .value_parser(value_parser!(u16))
        .value_delimiter(',')
        .action(ArgAction::Append)
        .help(help)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Command::new("perf-driver")
        .version(perf_driver::VERSION)
        .about("Adaptive parametrized benchmark driver")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Log every sample"),
        )
        .subcommand(
            Command::new("run")
                .about("Sweep every benchmark in all three variants")
                .arg(bin_dir_arg())
                .arg(config_arg())
                .arg(test_ids_arg("only", "Run only these test IDs (comma-separated)"))
                .arg(test_ids_arg(
                    "exclude",
                    "Skip these test IDs in addition to the configured exclusions",
                ))
                .arg(
                    Arg::new("no-extend")
                        .long("no-extend")
                        .action(ArgAction::SetTrue)
                        .help("Sweep the base grid only"),
                )
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output as JSON"),
                ),
        )
        .subcommand(
            Command::new("list")
                .about("Print the resolved executable catalog")
                .arg(bin_dir_arg())
                .arg(config_arg()),
        )
        .subcommand(
            Command::new("config")
                .about("Print the effective configuration as TOML")
                .arg(config_arg()),
        );

    let matches = cli.get_matches();
    perf_driver::logging::init(matches.get_flag("verbose"));

    match matches.subcommand() {
        Some(("run", args)) => run(args).await,
        Some(("list", args)) => {
            let config = load_config(args)?;
            let catalog = load_catalog(bin_dir(args)?, &config)?;
            for descriptor in catalog.descriptors() {
                println!(
                    "{} {:<24} {} ({} arguments)",
                    descriptor.test_id,
                    descriptor.variant.to_string(),
                    descriptor.path.display(),
                    descriptor.arg_count.as_usize()
                );
            }
            Ok(())
        }
        Some(("config", args)) => {
            let config = load_config(args)?;
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn run(args: &ArgMatches) -> anyhow::Result<()> {
    let mut config = load_config(args)?.excluding(test_ids(args, "exclude"));
    if args.get_flag("no-extend") {
        config = config.with_adaptive_extension(false);
    }
    config.validate().map_err(DriverError::from)?;

    let catalog = load_catalog(bin_dir(args)?, &config)?;
    let registry = HandlerRegistry::standard(&config, &catalog);
    let invoker = ProcessInvoker::new();
    let engine = SweepEngine::new(&config, &catalog, &registry, &invoker);
    let driver = Driver::new(engine, catalog.test_ids());

    let only: Vec<TestId> = test_ids(args, "only").collect();
    let report = if only.is_empty() {
        driver.run_all().await
    } else {
        driver.run_selected(&only).await
    };

    if args.get_flag("json") {
        println!("{}", report.to_json()?);
    } else {
        println!("{}", report.generate_text());
    }

    std::process::exit(if report.passed() { 0 } else { 1 });
}

fn load_config(args: &ArgMatches) -> Result<DriverConfig, DriverError> {
    match args.get_one::<PathBuf>("config") {
        Some(path) => Ok(DriverConfig::load(path)?),
        None => Ok(DriverConfig::default()),
    }
}

fn bin_dir(args: &ArgMatches) -> anyhow::Result<&Path> {
    args.get_one::<PathBuf>("bin-dir")
        .map(PathBuf::as_path)
        .context("--bin-dir is required")
}

fn load_catalog(root: &Path, config: &DriverConfig) -> Result<Catalog, DriverError> {
    let sets = discover(root)?;
    Ok(Catalog::from_sets(sets, config)?)
}

fn test_ids<'a>(args: &'a ArgMatches, name: &str) -> impl Iterator<Item = TestId> + 'a {
    args.get_many::<u16>(name)
        .into_iter()
        .flatten()
        .copied()
        .map(TestId)
}
