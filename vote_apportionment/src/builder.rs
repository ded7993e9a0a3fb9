pub use crate::config::*;

use std::collections::HashMap;

/// A builder for feeding precinct results and conversion rows one at a time.
///
/// It applies the input rules of the tabular files: a precinct reported twice
/// keeps its last result, and conversion rows without a block or a precinct
/// are skipped.
///
/// ```
/// pub use vote_apportionment::builder::Builder;
/// pub use vote_apportionment::ConversionRow;
/// # use vote_apportionment::ApportionmentErrors;
///
/// let mut builder = Builder::new(&["D".to_string(), "R".to_string()])?;
///
/// builder.add_precinct_result("X", &[1000, 0])?;
/// builder.add_conversion_row(ConversionRow {
///     block: "060014001001000".to_string(),
///     precinct: "X".to_string(),
///     block_registration: 43.0,
///     precinct_registration: 100.0,
/// })?;
/// builder.add_conversion_row(ConversionRow {
///     block: "060014001001001".to_string(),
///     precinct: "X".to_string(),
///     block_registration: 57.0,
///     precinct_registration: 100.0,
/// })?;
///
/// let res = builder.disaggregate()?;
/// assert_eq!(res.blocks[0].tally.counts(), &[430, 0]);
/// assert_eq!(res.blocks[1].tally.counts(), &[570, 0]);
///
/// # Ok::<(), ApportionmentErrors>(())
/// ```
pub struct Builder {
    pub(crate) _categories: Vec<String>,
    pub(crate) _precincts: HashMap<String, VoteTally>,
    pub(crate) _rows: Vec<ConversionRow>,
    pub(crate) _skipped_rows: usize,
}

impl Builder {
    pub fn new(categories: &[String]) -> Result<Builder, ApportionmentErrors> {
        if categories.is_empty() {
            return Err(ApportionmentErrors::NoCategories);
        }
        Ok(Builder {
            _categories: categories.to_vec(),
            _precincts: HashMap::new(),
            _rows: Vec::new(),
            _skipped_rows: 0,
        })
    }

    pub fn categories(&self) -> &[String] {
        &self._categories
    }

    /// Records the result of a precinct, one count per category.
    ///
    /// Returns the previous result if this precinct was already reported.
    pub fn add_precinct_result(
        &mut self,
        precinct: &str,
        counts: &[u64],
    ) -> Result<Option<VoteTally>, ApportionmentErrors> {
        if counts.len() != self._categories.len() {
            return Err(ApportionmentErrors::CategoryMismatch {
                expected: self._categories.len(),
                found: counts.len(),
            });
        }
        Ok(self
            ._precincts
            .insert(precinct.to_string(), VoteTally::new(counts.to_vec())))
    }

    /// Adds a row of the conversion table.
    ///
    /// Returns false if the row was skipped.
    pub fn add_conversion_row(&mut self, row: ConversionRow) -> Result<bool, ApportionmentErrors> {
        if !crate::keeps_conversion_row(&row.block, &row.precinct) {
            self._skipped_rows += 1;
            return Ok(false);
        }
        self._rows.push(row);
        Ok(true)
    }

    pub fn num_precincts(&self) -> usize {
        self._precincts.len()
    }

    pub fn num_conversion_rows(&self) -> usize {
        self._rows.len()
    }

    pub fn num_skipped_rows(&self) -> usize {
        self._skipped_rows
    }

    pub fn precinct_results(&self) -> &HashMap<String, VoteTally> {
        &self._precincts
    }

    pub fn disaggregate(&self) -> Result<Disaggregation, ApportionmentErrors> {
        crate::disaggregate(self._categories.len(), &self._precincts, &self._rows)
    }
}
