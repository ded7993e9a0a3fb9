use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use vote_apportionment::builder::Builder;
use vote_apportionment::*;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::blocks::config_reader::*;
use crate::blocks::io_csv::*;

pub mod config_reader;
pub mod io_csv;

#[derive(Debug, Snafu)]
pub enum BlockVotesError {
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLineParse {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Column {column} is missing from {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display("Line {lineno} of {path} has no value for column {column}"))]
    CsvLineTooShort {
        column: String,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Line {lineno} of {path}: {value:?} in column {column} is not a vote count"))]
    ParsingCount {
        source: std::num::ParseIntError,
        value: String,
        column: String,
        path: String,
        lineno: usize,
    },
    #[snafu(display(
        "Line {lineno} of {path}: {value:?} in column {column} is not a registration count"
    ))]
    ParsingRegistration {
        source: std::num::ParseFloatError,
        value: String,
        column: String,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Error writing file {path}"))]
    FileWrite {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error reading JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Apportionment failed"))]
    Apportionment { source: ApportionmentErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type BlockVotesResult<T> = Result<T, BlockVotesError>;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CategoryCount {
    pub name: String,
    pub count: u64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct TallySummary {
    pub total: u64,
    pub categories: Vec<CategoryCount>,
}

impl TallySummary {
    fn new(names: &[String], tally: &VoteTally) -> BlockVotesResult<TallySummary> {
        Ok(TallySummary {
            total: tally.total().context(ApportionmentSnafu {})?,
            categories: names
                .iter()
                .zip(tally.counts().iter())
                .map(|(name, count)| CategoryCount {
                    name: name.clone(),
                    count: *count,
                })
                .collect(),
        })
    }
}

/// What happened during a disaggregation run.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    #[serde(rename = "outputFile")]
    pub output_file: String,
    #[serde(rename = "numPrecincts")]
    pub num_precincts: usize,
    #[serde(rename = "numPrecinctsApportioned")]
    pub num_precincts_apportioned: usize,
    #[serde(rename = "numConversionRows")]
    pub num_conversion_rows: usize,
    #[serde(rename = "numSkippedConversionRows")]
    pub num_skipped_conversion_rows: usize,
    #[serde(rename = "unknownPrecincts")]
    pub unknown_precincts: Vec<String>,
    #[serde(rename = "numBlocks")]
    pub num_blocks: usize,
    #[serde(rename = "numWaterOnlyBlocks")]
    pub num_water_only_blocks: usize,
    #[serde(rename = "inputVotes")]
    pub input_votes: TallySummary,
    #[serde(rename = "waterOnlyVotes")]
    pub water_only_votes: TallySummary,
    #[serde(rename = "outputVotes")]
    pub output_votes: TallySummary,
}

fn format_tally(names: &[String], tally: &VoteTally) -> BlockVotesResult<String> {
    let parts: Vec<String> = names
        .iter()
        .zip(tally.counts().iter())
        .map(|(name, count)| format!("{} {}", count, name))
        .collect();
    let total = tally.total().context(ApportionmentSnafu {})?;
    Ok(format!("{} ({})", total, parts.join(", ")))
}

/// Re-reads a written block file and sums its votes.
///
/// The total column is checked against the categories and the statewide sum
/// against the expected tally. Differences are reported, not enforced.
pub fn reconcile(settings: &Settings, expected: &VoteTally) -> BlockVotesResult<VoteTally> {
    let names = settings.category_names();
    let rows = read_tally_rows(
        &settings.block_results_path,
        &settings.geoid_column,
        Some(&settings.total_column),
        &names,
    )?;
    let statewide =
        statewide_total(names.len(), rows.iter().map(|r| &r.tally)).context(ApportionmentSnafu {})?;
    let statewide_votes = statewide.total().context(ApportionmentSnafu {})?;
    let total_column = rows
        .iter()
        .filter_map(|r| r.total)
        .try_fold(0u64, |acc, t| acc.checked_add(t))
        .ok_or(ApportionmentErrors::Overflow)
        .context(ApportionmentSnafu {})?;
    if total_column != statewide_votes {
        warn!(
            "reconcile: the {} column of {:?} sums to {}, the categories to {}",
            settings.total_column, settings.block_results_path, total_column, statewide_votes
        );
    }
    if statewide != *expected {
        warn!(
            "reconcile: {:?} holds {} votes, expected {}",
            settings.block_results_path,
            format_tally(&names, &statewide)?,
            format_tally(&names, expected)?
        );
    }
    Ok(statewide)
}

fn subtract(a: &VoteTally, b: &VoteTally) -> VoteTally {
    VoteTally::new(
        a.counts()
            .iter()
            .zip(b.counts().iter())
            .map(|(x, y)| x.saturating_sub(*y))
            .collect(),
    )
}

/// Distributes the precinct results onto blocks and writes the block file.
pub fn run_disaggregation(settings: &Settings) -> BlockVotesResult<RunSummary> {
    let names = settings.category_names();
    let mut builder = Builder::new(&names).context(ApportionmentSnafu {})?;
    read_precinct_results(settings, &mut builder)?;
    read_conversion(settings, &mut builder)?;

    let res = builder.disaggregate().context(ApportionmentSnafu {})?;
    if !res.unknown_precincts.is_empty() {
        warn!(
            "{} precincts of the conversion table have no result: {:?}",
            res.unknown_precincts.len(),
            res.unknown_precincts
        );
    }

    let (kept, dropped) =
        filter_blocks(res.blocks, BlockGroupPolicy::DropWaterOnly).context(ApportionmentSnafu {})?;
    let num_blocks = write_tally_rows(
        &settings.block_results_path,
        &settings.geoid_column,
        &settings.total_column,
        &names,
        kept.iter().map(|b| (b.block.as_str(), &b.tally)),
    )?;

    let input_votes = statewide_total(names.len(), builder.precinct_results().values())
        .context(ApportionmentSnafu {})?;
    let water_only_votes = statewide_total(names.len(), dropped.iter().map(|b| &b.tally))
        .context(ApportionmentSnafu {})?;
    let output_votes = reconcile(settings, &subtract(&input_votes, &water_only_votes))?;

    let summary = RunSummary {
        output_file: settings.block_results_path.clone(),
        num_precincts: builder.num_precincts(),
        num_precincts_apportioned: res.num_precincts_apportioned,
        num_conversion_rows: builder.num_conversion_rows(),
        num_skipped_conversion_rows: builder.num_skipped_rows(),
        unknown_precincts: res.unknown_precincts,
        num_blocks,
        num_water_only_blocks: dropped.len(),
        input_votes: TallySummary::new(&names, &input_votes)?,
        water_only_votes: TallySummary::new(&names, &water_only_votes)?,
        output_votes: TallySummary::new(&names, &output_votes)?,
    };
    info!("summary: {:?}", summary);

    println!("File {} written successfully", settings.block_results_path);
    println!("Total votes: {}", format_tally(&names, &output_votes)?);
    Ok(summary)
}

/// Sums a block file into block groups and writes the block group file.
///
/// Every block of the input is kept, including the ones of water-only block
/// groups.
pub fn run_aggregation(
    settings: &Settings,
    input_path: &str,
    categories: &[String],
) -> BlockVotesResult<usize> {
    let rows = read_tally_rows(input_path, &settings.geoid_column, None, categories)?;
    let blocks: Vec<BlockResult> = rows
        .into_iter()
        .map(|r| BlockResult {
            block: r.geoid,
            tally: r.tally,
        })
        .collect();
    let groups = aggregate_block_groups(categories.len(), &blocks, BlockGroupPolicy::KeepAll)
        .context(ApportionmentSnafu {})?;
    let num_groups = write_tally_rows(
        &settings.block_group_results_path,
        &settings.geoid_column,
        &settings.total_column,
        categories,
        groups.iter().map(|g| (g.block_group.as_str(), &g.tally)),
    )?;
    info!(
        "run_aggregation: {} blocks -> {} block groups",
        blocks.len(),
        num_groups
    );
    println!(
        "File {} written successfully",
        settings.block_group_results_path
    );
    Ok(num_groups)
}

/// Writes the summary as JSON, either to a file or to the standard output.
pub fn write_summary(summary: &RunSummary, out: &str) -> BlockVotesResult<String> {
    let pretty = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
    if out == "stdout" {
        println!("{}", pretty);
    } else {
        fs::write(out, &pretty).context(FileWriteSnafu { path: out })?;
        debug!("write_summary: written to {:?}", out);
    }
    Ok(pretty)
}

pub fn read_summary(path: &str) -> BlockVotesResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

/// Fails if the summary differs from a reference summary.
pub fn check_reference(summary: &RunSummary, reference_path: &str) -> BlockVotesResult<()> {
    let js = serde_json::to_value(summary).context(ParsingJsonSnafu {})?;
    let pretty_js = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;
    let reference = read_summary(reference_path)?;
    info!("reference summary: {:?}", reference);
    let pretty_ref = serde_json::to_string_pretty(&reference).context(ParsingJsonSnafu {})?;
    if pretty_ref != pretty_js {
        warn!("Found differences with the reference summary");
        print_diff(pretty_ref.as_str(), pretty_js.as_str(), "\n");
        whatever!(
            "Difference detected between the run summary and the reference summary {}",
            reference_path
        )
    }
    Ok(())
}

/// Runs the disaggregation stage, then writes and checks its summary.
pub fn disaggregate_election(
    settings: &Settings,
    summary_out: Option<&str>,
    reference: Option<&str>,
) -> BlockVotesResult<RunSummary> {
    info!("settings: {:?}", settings);
    if Path::new(&settings.block_results_path) == Path::new(&settings.precinct_results_path)
        || Path::new(&settings.block_results_path) == Path::new(&settings.conversion_path)
    {
        whatever!(
            "The output {} would overwrite one of the inputs",
            settings.block_results_path
        )
    }
    let summary = run_disaggregation(settings)?;
    if let Some(out) = summary_out {
        write_summary(&summary, out)?;
    }
    if let Some(r) = reference {
        check_reference(&summary, r)?;
    }
    Ok(summary)
}
