// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The number of characters of a block identifier that name its block group.
pub const BLOCK_GROUP_KEY_LEN: usize = 12;

/// One count per competing category (for example D and R).
///
/// The total is always recomputed from the counts and never stored.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Default)]
pub struct VoteTally {
    counts: Vec<u64>,
}

impl VoteTally {
    pub fn new(counts: Vec<u64>) -> VoteTally {
        VoteTally { counts }
    }

    /// The empty tally for the given number of categories.
    pub fn zero(num_categories: usize) -> VoteTally {
        VoteTally {
            counts: vec![0; num_categories],
        }
    }

    pub fn counts(&self) -> &[u64] {
        &self.counts
    }

    pub fn num_categories(&self) -> usize {
        self.counts.len()
    }

    /// The sum of the counts. Fails if it does not fit in a `u64`.
    pub fn total(&self) -> Result<u64, ApportionmentErrors> {
        self.counts
            .iter()
            .try_fold(0u64, |acc, c| acc.checked_add(*c))
            .ok_or(ApportionmentErrors::Overflow)
    }

    /// Adds another tally category by category.
    ///
    /// Both tallies must have the same number of categories. On overflow the
    /// tally is left unchanged.
    pub fn add(&mut self, other: &VoteTally) -> Result<(), ApportionmentErrors> {
        if other.counts.len() != self.counts.len() {
            return Err(ApportionmentErrors::CategoryMismatch {
                expected: self.counts.len(),
                found: other.counts.len(),
            });
        }
        let sums: Vec<u64> = self
            .counts
            .iter()
            .zip(other.counts.iter())
            .map(|(c, o)| c.checked_add(*o))
            .collect::<Option<Vec<u64>>>()
            .ok_or(ApportionmentErrors::Overflow)?;
        self.counts = sums;
        Ok(())
    }
}

/// A row of the block/precinct conversion table.
///
/// The same block may appear under several precincts (one row per segment).
#[derive(PartialEq, Debug, Clone)]
pub struct ConversionRow {
    pub block: String,
    pub precinct: String,
    /// Registered voters of the block segment.
    pub block_registration: f64,
    /// Registered voters of the whole precinct.
    pub precinct_registration: f64,
}

// ******** Output data structures *********

/// The integer allocation of one precinct to one of its blocks.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BlockSegmentAllocation {
    pub precinct: String,
    pub block: String,
    pub tally: VoteTally,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BlockResult {
    pub block: String,
    pub tally: VoteTally,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct BlockGroupResult {
    pub block_group: String,
    pub tally: VoteTally,
}

/// The outcome of distributing all the precincts onto blocks.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Disaggregation {
    /// Block totals, sorted by block identifier.
    pub blocks: Vec<BlockResult>,
    /// Precincts referenced by the conversion table but absent from the results.
    /// They were apportioned as a zero tally.
    pub unknown_precincts: Vec<String>,
    /// Number of precincts that went through apportionment.
    pub num_precincts_apportioned: usize,
}

/// Errors that prevent the apportionment from completing.
#[derive(PartialEq, Debug, Clone)]
pub enum ApportionmentErrors {
    /// No category was declared.
    NoCategories,
    /// Two tallies with a different number of categories were combined.
    CategoryMismatch { expected: usize, found: usize },
    /// The total registration of a precinct with block segments is zero.
    DivisionByZero { precinct: String },
    /// A registration count is negative or not a number.
    InvalidWeight {
        precinct: String,
        block: String,
        value: f64,
    },
    /// The identifier is too short to contain a block group.
    InvalidBlockId { geoid: String },
    /// A vote count does not fit in 64 bits.
    Overflow,
}

impl Error for ApportionmentErrors {}

impl Display for ApportionmentErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApportionmentErrors::NoCategories => write!(f, "no vote category was declared"),
            ApportionmentErrors::CategoryMismatch { expected, found } => write!(
                f,
                "expected a tally with {} categories, found {}",
                expected, found
            ),
            ApportionmentErrors::DivisionByZero { precinct } => write!(
                f,
                "precinct {:?} has block segments but a total registration of zero",
                precinct
            ),
            ApportionmentErrors::InvalidWeight {
                precinct,
                block,
                value,
            } => write!(
                f,
                "invalid registration count {} for block {:?} in precinct {:?}",
                value, block, precinct
            ),
            ApportionmentErrors::InvalidBlockId { geoid } => write!(
                f,
                "identifier {:?} is shorter than {} characters",
                geoid, BLOCK_GROUP_KEY_LEN
            ),
            ApportionmentErrors::Overflow => write!(f, "the vote counts overflow 64 bits"),
        }
    }
}

// ********* Configuration **********

/// What happens to blocks of water-only block groups when grouping.
///
/// Water-only block groups are the ones whose 12th character is `'0'`.
/// The two policies are kept separate on purpose: disaggregation output drops
/// those blocks, the standalone aggregation keeps whatever it is given.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum BlockGroupPolicy {
    /// Blocks of water-only block groups are removed and their votes dropped.
    DropWaterOnly,
    /// Every block is kept.
    KeepAll,
}
