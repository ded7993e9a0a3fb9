use log::{debug, info};

use snafu::ErrorCompat;

mod args;
mod blocks;

use crate::args::{Args, Command};
use crate::blocks::config_reader::load_settings;
use crate::blocks::{disaggregate_election, run_aggregation, BlockVotesResult};
use clap::Parser;

fn run(args: Args) -> BlockVotesResult<()> {
    match args.command {
        Command::Disaggregate {
            config,
            precincts,
            conversion,
            out,
            summary,
            reference,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            if let Some(p) = precincts {
                settings.precinct_results_path = p;
            }
            if let Some(p) = conversion {
                settings.conversion_path = p;
            }
            if let Some(p) = out {
                settings.block_results_path = p;
            }
            disaggregate_election(&settings, summary.as_deref(), reference.as_deref())?;
        }
        Command::Aggregate {
            config,
            input,
            out,
            categories,
        } => {
            let mut settings = load_settings(config.as_deref())?;
            if let Some(p) = out {
                settings.block_group_results_path = p;
            }
            let input_path = input.unwrap_or_else(|| settings.block_results_path.clone());
            let categories = categories.unwrap_or_else(|| settings.category_names());
            debug!("aggregate: {:?} categories: {:?}", input_path, categories);
            run_aggregation(&settings, &input_path, &categories)?;
        }
    }
    Ok(())
}

fn main() {
    let args = Args::parse();

    let mut logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if args.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    info!("args: {:?}", args);

    if let Err(e) = run(args) {
        eprintln!("An error occured: {}", e);
        for cause in e.iter_chain().skip(1) {
            eprintln!("  caused by: {}", cause);
        }
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("trace: {}", bt);
        }
        std::process::exit(1);
    }
}
