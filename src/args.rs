use clap::{Parser, Subcommand};

/// Moves precinct election results onto census blocks and block groups.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Distributes the votes of every precinct onto its census blocks, in proportion to the
    /// registered voters of each block.
    Disaggregate {
        /// (file path, optional) A JSON file describing the input files and their columns.
        /// See the manual for the format.
        #[clap(short, long, value_parser)]
        config: Option<String>,

        /// (file path) The precinct results. Overrides the path of the --config option.
        #[clap(short, long, value_parser)]
        precincts: Option<String>,

        /// (file path) The block/precinct conversion file. Overrides the path of the --config option.
        #[clap(long, value_parser)]
        conversion: Option<String>,

        /// (file path) Where to write the block results. Overrides the path of the --config option.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (file path, 'stdout' or empty) If specified, a summary of the run will be written in
        /// JSON format to the given location.
        #[clap(short, long, value_parser)]
        summary: Option<String>,

        /// (file path) A reference summary in JSON format. If provided, blockvotes will
        /// check that the summary of the run matches the reference.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
    /// Sums a block results file into block groups.
    Aggregate {
        /// (file path, optional) A JSON file describing the files and their columns.
        #[clap(short, long, value_parser)]
        config: Option<String>,

        /// (file path) The block results to aggregate. Defaults to the output of the
        /// disaggregation.
        #[clap(short, long, value_parser)]
        input: Option<String>,

        /// (file path) Where to write the block group results.
        #[clap(short, long, value_parser)]
        out: Option<String>,

        /// (list of column names or not specified) The vote columns of the input, in order.
        /// Defaults to the categories of the configuration (D and R).
        #[clap(long, value_parser)]
        categories: Option<Vec<String>>,
    },
}
