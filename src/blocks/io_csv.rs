// Primitives for reading and writing the CSV tables.

use std::collections::HashMap;
use std::fs::File;

use csv::StringRecord;

use crate::blocks::*;

/// A CSV file with a header row, read lazily.
pub struct CsvTable {
    path: String,
    columns: HashMap<String, usize>,
    records: csv::StringRecordsIntoIter<File>,
}

impl CsvTable {
    pub fn open(path: &str) -> BlockVotesResult<CsvTable> {
        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(path)
            .context(CsvOpenSnafu { path })?;
        let headers = rdr.headers().context(CsvOpenSnafu { path })?.clone();
        debug!("CsvTable::open: {:?} header: {:?}", path, headers);
        // A repeated column name refers to its last occurrence.
        let columns: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_string(), idx))
            .collect();
        Ok(CsvTable {
            path: path.to_string(),
            columns,
            records: rdr.into_records(),
        })
    }

    /// The position of a required column.
    pub fn column(&self, name: &str) -> BlockVotesResult<Column> {
        let idx = *self.columns.get(name).context(MissingColumnSnafu {
            column: name,
            path: self.path.as_str(),
        })?;
        Ok(Column {
            name: name.to_string(),
            idx,
        })
    }

    /// Visits every row after the header.
    pub fn for_each_row<F>(self, mut f: F) -> BlockVotesResult<usize>
    where
        F: FnMut(&Row) -> BlockVotesResult<()>,
    {
        let path = self.path;
        let mut num_rows = 0;
        for (idx, line_r) in self.records.enumerate() {
            // The header is line 1.
            let lineno = idx + 2;
            let line = line_r.context(CsvLineParseSnafu {
                path: path.as_str(),
                lineno,
            })?;
            f(&Row {
                path: path.as_str(),
                lineno,
                line: &line,
            })?;
            num_rows += 1;
        }
        Ok(num_rows)
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Column {
    pub name: String,
    pub idx: usize,
}

pub struct Row<'a> {
    path: &'a str,
    lineno: usize,
    line: &'a StringRecord,
}

impl<'a> Row<'a> {
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    pub fn get(&self, column: &Column) -> BlockVotesResult<&'a str> {
        self.line.get(column.idx).context(CsvLineTooShortSnafu {
            column: column.name.as_str(),
            path: self.path,
            lineno: self.lineno,
        })
    }

    /// A non-negative vote count.
    pub fn count(&self, column: &Column) -> BlockVotesResult<u64> {
        let value = self.get(column)?;
        value.trim().parse::<u64>().context(ParsingCountSnafu {
            value,
            column: column.name.as_str(),
            path: self.path,
            lineno: self.lineno,
        })
    }

    /// A registered-voter count, which may be fractional.
    pub fn registration(&self, column: &Column) -> BlockVotesResult<f64> {
        let value = self.get(column)?;
        value.trim().parse::<f64>().context(ParsingRegistrationSnafu {
            value,
            column: column.name.as_str(),
            path: self.path,
            lineno: self.lineno,
        })
    }
}

/// Reads the precinct results into the builder.
pub fn read_precinct_results(settings: &Settings, builder: &mut Builder) -> BlockVotesResult<usize> {
    let path = settings.precinct_results_path.as_str();
    info!("Attempting to read precinct results {:?}", path);
    let table = CsvTable::open(path)?;
    let precinct_col = table.column(&settings.precinct_column)?;
    let count_cols: Vec<Column> = settings
        .categories
        .iter()
        .map(|c| table.column(&c.column))
        .collect::<BlockVotesResult<Vec<Column>>>()?;

    table.for_each_row(|row| {
        let precinct = row.get(&precinct_col)?;
        let counts: Vec<u64> = count_cols
            .iter()
            .map(|c| row.count(c))
            .collect::<BlockVotesResult<Vec<u64>>>()?;
        let previous = builder
            .add_precinct_result(precinct, &counts)
            .context(ApportionmentSnafu {})?;
        if let Some(prev) = previous {
            warn!(
                "Precinct {:?} is reported again on line {}, replacing {:?} by {:?}",
                precinct,
                row.lineno(),
                prev.counts(),
                counts
            );
        }
        Ok(())
    })
}

/// Reads the block/precinct conversion table into the builder.
///
/// Rows without a block or a precinct are skipped before their registration
/// counts are parsed.
pub fn read_conversion(settings: &Settings, builder: &mut Builder) -> BlockVotesResult<usize> {
    let path = settings.conversion_path.as_str();
    info!("Attempting to read conversion file {:?}", path);
    let table = CsvTable::open(path)?;
    let block_col = table.column(&settings.block_column)?;
    let precinct_col = table.column(&settings.conversion_precinct_column)?;
    let block_reg_col = table.column(&settings.block_registration_column)?;
    let total_reg_col = table.column(&settings.precinct_registration_column)?;

    table.for_each_row(|row| {
        let block = row.get(&block_col)?;
        let precinct = row.get(&precinct_col)?;
        let (block_registration, precinct_registration) = if keeps_conversion_row(block, precinct) {
            (
                row.registration(&block_reg_col)?,
                row.registration(&total_reg_col)?,
            )
        } else {
            // Dropped by the builder, the registration counts are not read.
            (0.0, 0.0)
        };
        let kept = builder
            .add_conversion_row(ConversionRow {
                block: block.to_string(),
                precinct: precinct.to_string(),
                block_registration,
                precinct_registration,
            })
            .context(ApportionmentSnafu {})?;
        if !kept {
            debug!(
                "read_conversion: skipping line {}: block {:?} precinct {:?}",
                row.lineno(),
                block,
                precinct
            );
        }
        Ok(())
    })
}

/// A row of a block (or block group) file.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyRow {
    pub geoid: String,
    /// The value of the total column, when it was read.
    pub total: Option<u64>,
    pub tally: VoteTally,
}

/// Reads a file shaped like the block output: an identifier, an optional
/// total and one column per category.
pub fn read_tally_rows(
    path: &str,
    geoid_column: &str,
    total_column: Option<&str>,
    categories: &[String],
) -> BlockVotesResult<Vec<TallyRow>> {
    info!("Attempting to read block file {:?}", path);
    let table = CsvTable::open(path)?;
    let geoid_col = table.column(geoid_column)?;
    let total_col = match total_column {
        Some(c) => Some(table.column(c)?),
        None => None,
    };
    let count_cols: Vec<Column> = categories
        .iter()
        .map(|c| table.column(c))
        .collect::<BlockVotesResult<Vec<Column>>>()?;

    let mut res: Vec<TallyRow> = Vec::new();
    table.for_each_row(|row| {
        let total = match &total_col {
            Some(c) => Some(row.count(c)?),
            None => None,
        };
        let counts: Vec<u64> = count_cols
            .iter()
            .map(|c| row.count(c))
            .collect::<BlockVotesResult<Vec<u64>>>()?;
        res.push(TallyRow {
            geoid: row.get(&geoid_col)?.to_string(),
            total,
            tally: VoteTally::new(counts),
        });
        Ok(())
    })?;
    Ok(res)
}

/// Writes `geoid, total, counts...` rows under the given header.
///
/// The rows go to a temporary file that replaces the destination only once
/// everything has been written, so that a failed run leaves no partial table.
pub fn write_tally_rows<'a, I>(
    path: &str,
    geoid_column: &str,
    total_column: &str,
    categories: &[String],
    rows: I,
) -> BlockVotesResult<usize>
where
    I: IntoIterator<Item = (&'a str, &'a VoteTally)>,
{
    let partial_path = format!("{}.partial", path);
    let written = write_partial(&partial_path, path, geoid_column, total_column, categories, rows)
        .and_then(|num_rows| {
            fs::rename(&partial_path, path).context(FileWriteSnafu { path })?;
            Ok(num_rows)
        });
    match written {
        Ok(num_rows) => {
            debug!("write_tally_rows: {} rows written to {:?}", num_rows, path);
            Ok(num_rows)
        }
        Err(e) => {
            if let Err(rm) = fs::remove_file(&partial_path) {
                debug!("write_tally_rows: could not remove {:?}: {}", partial_path, rm);
            }
            Err(e)
        }
    }
}

fn write_partial<'a, I>(
    partial_path: &str,
    path: &str,
    geoid_column: &str,
    total_column: &str,
    categories: &[String],
    rows: I,
) -> BlockVotesResult<usize>
where
    I: IntoIterator<Item = (&'a str, &'a VoteTally)>,
{
    let mut wtr = csv::Writer::from_path(partial_path).context(CsvWriteSnafu { path })?;

    let mut header: Vec<String> = vec![geoid_column.to_string(), total_column.to_string()];
    header.extend(categories.iter().cloned());
    wtr.write_record(&header).context(CsvWriteSnafu { path })?;

    let mut num_rows = 0;
    for (geoid, tally) in rows {
        let total = tally.total().context(ApportionmentSnafu {})?;
        let mut record: Vec<String> = vec![geoid.to_string(), total.to_string()];
        record.extend(tally.counts().iter().map(|c| c.to_string()));
        wtr.write_record(&record).context(CsvWriteSnafu { path })?;
        num_rows += 1;
    }
    wtr.flush().context(FileWriteSnafu { path })?;
    Ok(num_rows)
}
