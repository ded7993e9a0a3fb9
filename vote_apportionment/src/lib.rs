mod config;
pub mod builder;
pub mod manual;

use log::{debug, info, warn};

use std::collections::{BTreeMap, HashMap};

pub use crate::config::*;

// **** Accumulation ****

/// Sums tallies by key.
///
/// A key that is seen for the first time starts from the zero tally. Lookups
/// never create entries.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct TallyAccumulator {
    num_categories: usize,
    tallies: BTreeMap<String, VoteTally>,
}

impl TallyAccumulator {
    pub fn new(num_categories: usize) -> TallyAccumulator {
        TallyAccumulator {
            num_categories,
            tallies: BTreeMap::new(),
        }
    }

    pub fn add(&mut self, key: &str, tally: &VoteTally) -> Result<(), ApportionmentErrors> {
        check_categories(self.num_categories, tally)?;
        let num_categories = self.num_categories;
        self.tallies
            .entry(key.to_string())
            .or_insert_with(|| VoteTally::zero(num_categories))
            .add(tally)
    }

    pub fn get(&self, key: &str) -> Option<&VoteTally> {
        self.tallies.get(key)
    }

    pub fn len(&self) -> usize {
        self.tallies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tallies.is_empty()
    }

    /// The accumulated tallies, sorted by key.
    pub fn into_sorted(self) -> Vec<(String, VoteTally)> {
        self.tallies.into_iter().collect()
    }
}

fn check_categories(num_categories: usize, tally: &VoteTally) -> Result<(), ApportionmentErrors> {
    if tally.num_categories() != num_categories {
        return Err(ApportionmentErrors::CategoryMismatch {
            expected: num_categories,
            found: tally.num_categories(),
        });
    }
    Ok(())
}

// **** Weights and apportionment ****

/// Conversion rows with an empty block or precinct identifier do not describe
/// a segment and are skipped.
pub fn keeps_conversion_row(block: &str, precinct: &str) -> bool {
    !block.is_empty() && !precinct.is_empty()
}

/// Computes the real-valued share of every segment of a precinct.
///
/// The result is indexed by category first, then by segment, in the order of
/// the given rows: `shares[c][s] = tally[c] * block_registration[s] / precinct_registration[s]`.
///
/// Fails if a registration count is negative or not finite, or if the total
/// registration of the precinct is zero.
pub fn compute_shares(
    precinct: &str,
    tally: &VoteTally,
    segments: &[ConversionRow],
) -> Result<Vec<Vec<f64>>, ApportionmentErrors> {
    for row in segments.iter() {
        for value in [row.block_registration, row.precinct_registration] {
            if !value.is_finite() || value < 0.0 {
                return Err(ApportionmentErrors::InvalidWeight {
                    precinct: precinct.to_string(),
                    block: row.block.clone(),
                    value,
                });
            }
        }
        if row.precinct_registration == 0.0 {
            return Err(ApportionmentErrors::DivisionByZero {
                precinct: precinct.to_string(),
            });
        }
    }

    let shares: Vec<Vec<f64>> = tally
        .counts()
        .iter()
        .map(|count| {
            segments
                .iter()
                .map(|row| (*count as f64) * row.block_registration / row.precinct_registration)
                .collect::<Vec<f64>>()
        })
        .collect();
    Ok(shares)
}

/// Hamilton (largest remainder) rounding of a list of non-negative shares.
///
/// Every share is truncated, and the units lost by truncation (the rounded sum
/// of the remainders) are given back one by one to the largest remainders.
/// Equal remainders are served in input order.
///
/// The sum of the output is the rounded sum of the input, and no element moves
/// by more than one unit away from its share.
pub fn hamilton_apportion(shares: &[f64]) -> Vec<u64> {
    let mut allocations: Vec<u64> = shares.iter().map(|s| s.trunc() as u64).collect();
    let remainders: Vec<f64> = shares
        .iter()
        .zip(allocations.iter())
        .map(|(s, base)| s - (*base as f64))
        .collect();
    let extra = remainders.iter().sum::<f64>().round_ties_even() as usize;

    // Stable sort: ties keep their input order.
    let mut order: Vec<usize> = (0..shares.len()).collect();
    order.sort_by(|a, b| remainders[*b].total_cmp(&remainders[*a]));
    for idx in order.into_iter().take(extra) {
        allocations[idx] += 1;
    }
    allocations
}

/// Distributes the tally of a single precinct onto its block segments.
///
/// Each category is apportioned on its own. The allocations come back in the
/// order of the rows, and sum up to the precinct tally for every category.
pub fn apportion_precinct(
    precinct: &str,
    tally: &VoteTally,
    segments: &[ConversionRow],
) -> Result<Vec<BlockSegmentAllocation>, ApportionmentErrors> {
    let shares = compute_shares(precinct, tally, segments)?;
    let per_category: Vec<Vec<u64>> = shares.iter().map(|s| hamilton_apportion(s)).collect();

    let res: Vec<BlockSegmentAllocation> = segments
        .iter()
        .enumerate()
        .map(|(idx, row)| BlockSegmentAllocation {
            precinct: precinct.to_string(),
            block: row.block.clone(),
            tally: VoteTally::new(per_category.iter().map(|alloc| alloc[idx]).collect()),
        })
        .collect();
    debug!(
        "apportion_precinct: {:?} {:?} -> {:?}",
        precinct,
        tally.counts(),
        res.iter()
            .map(|a| (a.block.as_str(), a.tally.counts()))
            .collect::<Vec<_>>()
    );
    Ok(res)
}

// The segments of each precinct, in the order in which the precincts and the
// blocks were first seen. A block listed twice under the same precinct keeps
// its first position and its last row.
fn group_segments(conversion: &[ConversionRow]) -> Vec<(String, Vec<ConversionRow>)> {
    let mut precinct_idx: HashMap<&str, usize> = HashMap::new();
    let mut block_idx: HashMap<(&str, &str), usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<ConversionRow>)> = Vec::new();
    for row in conversion.iter() {
        if !keeps_conversion_row(&row.block, &row.precinct) {
            debug!("group_segments: skipping row {:?}", row);
            continue;
        }
        let pidx = *precinct_idx.entry(row.precinct.as_str()).or_insert_with(|| {
            groups.push((row.precinct.clone(), Vec::new()));
            groups.len() - 1
        });
        let segments = &mut groups[pidx].1;
        match block_idx.get(&(row.precinct.as_str(), row.block.as_str())) {
            Some(bidx) => {
                debug!(
                    "group_segments: block {:?} listed again under precinct {:?}",
                    row.block, row.precinct
                );
                segments[*bidx] = row.clone();
            }
            None => {
                block_idx.insert((row.precinct.as_str(), row.block.as_str()), segments.len());
                segments.push(row.clone());
            }
        }
    }
    groups
}

/// Sums segment allocations into block totals, sorted by block identifier.
pub fn aggregate_segments(
    num_categories: usize,
    allocations: &[BlockSegmentAllocation],
) -> Result<Vec<BlockResult>, ApportionmentErrors> {
    let mut acc = TallyAccumulator::new(num_categories);
    for a in allocations.iter() {
        acc.add(&a.block, &a.tally)?;
    }
    Ok(acc
        .into_sorted()
        .into_iter()
        .map(|(block, tally)| BlockResult { block, tally })
        .collect())
}

/// Runs the full disaggregation of precinct results onto blocks.
///
/// Arguments:
/// * `num_categories` the number of counts in every tally
/// * `precinct_results` the tally of every precinct
/// * `conversion` the block/precinct conversion table, in file order
///
/// A precinct of the conversion table that has no result is apportioned as a
/// zero tally and reported in `unknown_precincts`.
pub fn disaggregate(
    num_categories: usize,
    precinct_results: &HashMap<String, VoteTally>,
    conversion: &[ConversionRow],
) -> Result<Disaggregation, ApportionmentErrors> {
    if num_categories == 0 {
        return Err(ApportionmentErrors::NoCategories);
    }
    for tally in precinct_results.values() {
        check_categories(num_categories, tally)?;
    }
    info!(
        "Processing {:?} precinct results and {:?} conversion rows",
        precinct_results.len(),
        conversion.len()
    );

    let groups = group_segments(conversion);
    let zero = VoteTally::zero(num_categories);
    let mut unknown_precincts: Vec<String> = Vec::new();
    let mut allocations: Vec<BlockSegmentAllocation> = Vec::new();
    for (precinct, segments) in groups.iter() {
        let tally = match precinct_results.get(precinct) {
            Some(t) => t,
            None => {
                warn!(
                    "Precinct {:?} is in the conversion table but has no result, counting zero votes",
                    precinct
                );
                unknown_precincts.push(precinct.clone());
                &zero
            }
        };
        allocations.extend(apportion_precinct(precinct, tally, segments)?);
    }

    let blocks = aggregate_segments(num_categories, &allocations)?;
    info!(
        "Apportioned {:?} precincts onto {:?} segments and {:?} blocks",
        groups.len(),
        allocations.len(),
        blocks.len()
    );
    Ok(Disaggregation {
        blocks,
        unknown_precincts,
        num_precincts_apportioned: groups.len(),
    })
}

// **** Block groups ****

/// The block group of a block: the first 12 characters of its identifier.
pub fn block_group_key(geoid: &str) -> Result<&str, ApportionmentErrors> {
    match geoid.char_indices().nth(BLOCK_GROUP_KEY_LEN - 1) {
        Some((idx, c)) => Ok(&geoid[..idx + c.len_utf8()]),
        None => Err(ApportionmentErrors::InvalidBlockId {
            geoid: geoid.to_string(),
        }),
    }
}

/// The first 12 characters of an identifier, or all of it when shorter.
pub fn block_group_prefix(geoid: &str) -> &str {
    match geoid.char_indices().nth(BLOCK_GROUP_KEY_LEN) {
        Some((idx, _)) => &geoid[..idx],
        None => geoid,
    }
}

/// Water-only block groups end with `'0'`.
pub fn is_water_only(geoid: &str) -> Result<bool, ApportionmentErrors> {
    let key = block_group_key(geoid)?;
    Ok(key.ends_with('0'))
}

/// Splits the blocks into the ones kept and the ones dropped by the policy.
pub fn filter_blocks(
    blocks: Vec<BlockResult>,
    policy: BlockGroupPolicy,
) -> Result<(Vec<BlockResult>, Vec<BlockResult>), ApportionmentErrors> {
    let mut kept: Vec<BlockResult> = Vec::new();
    let mut dropped: Vec<BlockResult> = Vec::new();
    for b in blocks.into_iter() {
        let drop = match policy {
            BlockGroupPolicy::DropWaterOnly => is_water_only(&b.block)?,
            BlockGroupPolicy::KeepAll => false,
        };
        if drop {
            dropped.push(b);
        } else {
            kept.push(b);
        }
    }
    if !dropped.is_empty() {
        info!(
            "filter_blocks: dropped {:?} water-only blocks ({:?} votes)",
            dropped.len(),
            dropped
                .iter()
                .filter_map(|b| b.tally.total().ok())
                .fold(0u64, u64::saturating_add)
        );
    }
    Ok((kept, dropped))
}

/// Sums block results into block groups, sorted by block group.
///
/// With `KeepAll`, an identifier shorter than 12 characters is its own block
/// group. With `DropWaterOnly` it is an error.
pub fn aggregate_block_groups(
    num_categories: usize,
    blocks: &[BlockResult],
    policy: BlockGroupPolicy,
) -> Result<Vec<BlockGroupResult>, ApportionmentErrors> {
    let mut acc = TallyAccumulator::new(num_categories);
    for b in blocks.iter() {
        let key = match policy {
            BlockGroupPolicy::DropWaterOnly => {
                if is_water_only(&b.block)? {
                    continue;
                }
                block_group_key(&b.block)?
            }
            BlockGroupPolicy::KeepAll => block_group_prefix(&b.block),
        };
        acc.add(key, &b.tally)?;
    }
    debug!(
        "aggregate_block_groups: {:?} blocks -> {:?} block groups",
        blocks.len(),
        acc.len()
    );
    Ok(acc
        .into_sorted()
        .into_iter()
        .map(|(block_group, tally)| BlockGroupResult { block_group, tally })
        .collect())
}

/// The sum of all the tallies, category by category.
pub fn statewide_total<'a, I>(num_categories: usize, tallies: I) -> Result<VoteTally, ApportionmentErrors>
where
    I: IntoIterator<Item = &'a VoteTally>,
{
    let mut total = VoteTally::zero(num_categories);
    for t in tallies {
        total.add(t)?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn row(block: &str, precinct: &str, block_reg: f64, total_reg: f64) -> ConversionRow {
        ConversionRow {
            block: block.to_string(),
            precinct: precinct.to_string(),
            block_registration: block_reg,
            precinct_registration: total_reg,
        }
    }

    fn results(entries: &[(&str, &[u64])]) -> HashMap<String, VoteTally> {
        entries
            .iter()
            .map(|(p, c)| (p.to_string(), VoteTally::new(c.to_vec())))
            .collect()
    }

    fn find<'a>(blocks: &'a [BlockResult], block: &str) -> &'a [u64] {
        blocks
            .iter()
            .find(|b| b.block == block)
            .map(|b| b.tally.counts())
            .unwrap()
    }

    // Small deterministic generator for the property tests.
    struct Lcg(u64);

    impl Lcg {
        fn next(&mut self, bound: u64) -> u64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 33) % bound
        }
    }

    #[test]
    fn even_shares_have_no_remainder() {
        init();
        let rows = vec![
            row("X1", "X", 43.0, 100.0),
            row("X2", "X", 11.0, 100.0),
            row("X3", "X", 18.0, 100.0),
            row("X4", "X", 28.0, 100.0),
        ];
        let d = disaggregate(2, &results(&[("X", &[1000, 0])]), &rows).unwrap();
        assert_eq!(find(&d.blocks, "X1"), &[430, 0]);
        assert_eq!(find(&d.blocks, "X2"), &[110, 0]);
        assert_eq!(find(&d.blocks, "X3"), &[180, 0]);
        assert_eq!(find(&d.blocks, "X4"), &[280, 0]);
    }

    #[test]
    fn largest_remainders_get_the_leftover_votes() {
        let res = hamilton_apportion(&[430.3, 109.6, 180.7, 279.4]);
        assert_eq!(res, vec![430, 110, 181, 279]);
        assert_eq!(res.iter().sum::<u64>(), 1000);
    }

    #[test]
    fn remainders_through_the_weights() {
        let rows = vec![
            row("X1", "X", 4303.0, 10000.0),
            row("X2", "X", 1096.0, 10000.0),
            row("X3", "X", 1807.0, 10000.0),
            row("X4", "X", 2794.0, 10000.0),
        ];
        let allocs = apportion_precinct("X", &VoteTally::new(vec![1000, 0]), &rows).unwrap();
        let d: Vec<u64> = allocs.iter().map(|a| a.tally.counts()[0]).collect();
        assert_eq!(d, vec![430, 110, 181, 279]);
    }

    #[test]
    fn ties_follow_the_conversion_order() {
        assert_eq!(hamilton_apportion(&[0.5, 0.5]), vec![1, 0]);
        let rows = vec![row("B", "P", 1.0, 2.0), row("A", "P", 1.0, 2.0)];
        let d = disaggregate(1, &results(&[("P", &[1])]), &rows).unwrap();
        assert_eq!(find(&d.blocks, "B"), &[1]);
        assert_eq!(find(&d.blocks, "A"), &[0]);
    }

    #[test]
    fn categories_are_apportioned_separately() {
        let rows = vec![
            row("A", "P", 1.0, 3.0),
            row("B", "P", 1.0, 3.0),
            row("C", "P", 1.0, 3.0),
        ];
        let d = disaggregate(2, &results(&[("P", &[2, 1])]), &rows).unwrap();
        assert_eq!(find(&d.blocks, "A"), &[1, 1]);
        assert_eq!(find(&d.blocks, "B"), &[1, 0]);
        assert_eq!(find(&d.blocks, "C"), &[0, 0]);
    }

    #[test]
    fn block_segments_are_summed_across_precincts() {
        let rows = vec![
            row("B1", "P1", 1.0, 1.0),
            row("B1", "P2", 7.0, 10.0),
            row("B2", "P2", 3.0, 10.0),
        ];
        let d = disaggregate(2, &results(&[("P1", &[5, 2]), ("P2", &[10, 0])]), &rows).unwrap();
        assert_eq!(find(&d.blocks, "B1"), &[12, 2]);
        assert_eq!(find(&d.blocks, "B2"), &[3, 0]);
        assert_eq!(d.num_precincts_apportioned, 2);
    }

    #[test]
    fn blocks_are_sorted() {
        let rows = vec![row("C", "P", 1.0, 3.0), row("A", "P", 2.0, 3.0)];
        let d = disaggregate(1, &results(&[("P", &[3])]), &rows).unwrap();
        let names: Vec<&str> = d.blocks.iter().map(|b| b.block.as_str()).collect();
        assert_eq!(names, vec!["A", "C"]);
    }

    #[test]
    fn zero_registration_fails() {
        let rows = vec![row("A", "P", 0.0, 0.0)];
        let err = disaggregate(2, &results(&[("P", &[3, 4])]), &rows).unwrap_err();
        assert_eq!(
            err,
            ApportionmentErrors::DivisionByZero {
                precinct: "P".to_string()
            }
        );
        // Also when nobody voted.
        let err = disaggregate(2, &results(&[("P", &[0, 0])]), &rows).unwrap_err();
        assert!(matches!(err, ApportionmentErrors::DivisionByZero { .. }));
    }

    #[test]
    fn negative_registration_fails() {
        let rows = vec![row("A", "P", -1.0, 10.0)];
        let err = disaggregate(1, &results(&[("P", &[3])]), &rows).unwrap_err();
        assert!(matches!(err, ApportionmentErrors::InvalidWeight { .. }));
        let rows = vec![row("A", "P", 1.0, f64::NAN)];
        assert!(disaggregate(1, &results(&[("P", &[3])]), &rows).is_err());
    }

    #[test]
    fn unknown_precinct_counts_zero_votes() {
        let rows = vec![row("A", "P", 1.0, 2.0), row("B", "Q", 1.0, 1.0)];
        let d = disaggregate(2, &results(&[("P", &[4, 2])]), &rows).unwrap();
        assert_eq!(d.unknown_precincts, vec!["Q".to_string()]);
        assert_eq!(find(&d.blocks, "A"), &[2, 1]);
        assert_eq!(find(&d.blocks, "B"), &[0, 0]);
    }

    #[test]
    fn rows_with_empty_keys_are_skipped() {
        let rows = vec![
            row("", "P", 1.0, 2.0),
            row("A", "", 1.0, 2.0),
            row("A", "P", 2.0, 2.0),
        ];
        let d = disaggregate(1, &results(&[("P", &[9])]), &rows).unwrap();
        assert_eq!(d.blocks.len(), 1);
        assert_eq!(find(&d.blocks, "A"), &[9]);
    }

    #[test]
    fn repeated_segment_keeps_the_last_row() {
        let rows = vec![
            row("A", "P", 1.0, 2.0),
            row("B", "P", 1.0, 2.0),
            row("A", "P", 2.0, 2.0),
        ];
        let groups = group_segments(&rows);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].1.len(), 2);
        assert_eq!(groups[0].1[0].block, "A");
        assert_eq!(groups[0].1[0].block_registration, 2.0);
    }

    #[test]
    fn mismatched_categories_fail() {
        let rows = vec![row("A", "P", 1.0, 1.0)];
        let err = disaggregate(2, &results(&[("P", &[1, 2, 3])]), &rows).unwrap_err();
        assert_eq!(
            err,
            ApportionmentErrors::CategoryMismatch {
                expected: 2,
                found: 3
            }
        );
        assert_eq!(
            disaggregate(0, &HashMap::new(), &rows).unwrap_err(),
            ApportionmentErrors::NoCategories
        );
    }

    #[test]
    fn conservation_and_boundedness() {
        init();
        let mut rng = Lcg(42);
        for _ in 0..200 {
            let num_blocks = 1 + rng.next(12) as usize;
            let weights: Vec<f64> = (0..num_blocks).map(|_| rng.next(500) as f64).collect();
            let total: f64 = weights.iter().sum::<f64>() + 1.0 + rng.next(3) as f64;
            // The remaining weight goes to the last block so that the shares add up.
            let mut rows: Vec<ConversionRow> = weights
                .iter()
                .enumerate()
                .map(|(i, w)| row(&format!("B{:03}", i), "P", *w, total))
                .collect();
            let last = total - weights.iter().sum::<f64>();
            rows.push(row("BZZZ", "P", last, total));

            let tally = VoteTally::new(vec![rng.next(5000), rng.next(5000), rng.next(10)]);
            let shares = compute_shares("P", &tally, &rows).unwrap();
            let allocs = apportion_precinct("P", &tally, &rows).unwrap();
            for (c, count) in tally.counts().iter().enumerate() {
                let sum: u64 = allocs.iter().map(|a| a.tally.counts()[c]).sum();
                assert_eq!(sum, *count);
                for (s, a) in allocs.iter().enumerate() {
                    let diff = (a.tally.counts()[c] as f64 - shares[c][s]).abs();
                    assert!(diff <= 1.0, "{} vs {}", a.tally.counts()[c], shares[c][s]);
                }
            }
        }
    }

    #[test]
    fn block_group_keys() {
        assert_eq!(block_group_key("060014001001000").unwrap(), "060014001001");
        assert_eq!(block_group_key("060014001001").unwrap(), "060014001001");
        assert!(block_group_key("06001400100").is_err());
        assert!(is_water_only("060014001000123").unwrap());
        assert!(!is_water_only("060014001001123").unwrap());
        assert_eq!(block_group_prefix("060014001001000"), "060014001001");
        assert_eq!(block_group_prefix("0600140010"), "0600140010");
        assert_eq!(block_group_prefix(""), "");
    }

    #[test]
    fn short_identifiers_depend_on_the_policy() {
        let blocks = vec![
            BlockResult {
                block: "0600140010".to_string(),
                tally: VoteTally::new(vec![2, 1]),
            },
            BlockResult {
                block: "060014001001001".to_string(),
                tally: VoteTally::new(vec![1, 1]),
            },
        ];
        let groups = aggregate_block_groups(2, &blocks, BlockGroupPolicy::KeepAll).unwrap();
        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].block_group, "0600140010");
        assert_eq!(groups[0].tally.counts(), &[2, 1]);
        assert_eq!(groups[1].block_group, "060014001001");

        let err = aggregate_block_groups(2, &blocks, BlockGroupPolicy::DropWaterOnly).unwrap_err();
        assert!(matches!(err, ApportionmentErrors::InvalidBlockId { .. }));
    }

    #[test]
    fn water_only_policies_differ() {
        let blocks = vec![
            BlockResult {
                block: "060014001001000".to_string(),
                tally: VoteTally::new(vec![3, 1]),
            },
            BlockResult {
                block: "060014001001001".to_string(),
                tally: VoteTally::new(vec![2, 2]),
            },
            BlockResult {
                block: "060019900000001".to_string(),
                tally: VoteTally::new(vec![5, 0]),
            },
        ];
        let kept_all = aggregate_block_groups(2, &blocks, BlockGroupPolicy::KeepAll).unwrap();
        assert_eq!(kept_all.len(), 2);
        assert_eq!(kept_all[0].block_group, "060014001001");
        assert_eq!(kept_all[0].tally.counts(), &[5, 3]);
        assert_eq!(kept_all[1].block_group, "060019900000");
        assert_eq!(kept_all[1].tally.counts(), &[5, 0]);

        let dropped = aggregate_block_groups(2, &blocks, BlockGroupPolicy::DropWaterOnly).unwrap();
        assert_eq!(dropped.len(), 1);
        assert_eq!(dropped[0].block_group, "060014001001");

        let (kept, removed) = filter_blocks(blocks, BlockGroupPolicy::DropWaterOnly).unwrap();
        assert_eq!(kept.len(), 2);
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].block, "060019900000001");
    }

    #[test]
    fn round_trip_total() {
        let rows = vec![
            row("060014001001000", "P1", 2.0, 3.0),
            row("060014001001001", "P1", 1.0, 3.0),
            row("060014001001001", "P2", 5.0, 5.0),
        ];
        let precincts = results(&[("P1", &[100, 50]), ("P2", &[7, 8])]);
        let d = disaggregate(2, &precincts, &rows).unwrap();
        let input = statewide_total(2, precincts.values()).unwrap();
        let output = statewide_total(2, d.blocks.iter().map(|b| &b.tally)).unwrap();
        assert_eq!(input, output);
        assert_eq!(output.total().unwrap(), 165);
    }

    #[test]
    fn accumulator_lookup_does_not_insert() {
        let mut acc = TallyAccumulator::new(2);
        assert!(acc.get("A").is_none());
        assert!(acc.is_empty());
        acc.add("A", &VoteTally::new(vec![1, 2])).unwrap();
        acc.add("A", &VoteTally::new(vec![3, 4])).unwrap();
        assert_eq!(acc.get("A").unwrap().counts(), &[4, 6]);
        assert_eq!(acc.get("A").unwrap().total().unwrap(), 10);
        assert!(acc.add("B", &VoteTally::new(vec![1])).is_err());
        assert_eq!(acc.len(), 1);
    }

    #[test]
    fn overflowing_counts_fail() {
        let big = VoteTally::new(vec![u64::MAX, 0]);
        let one = VoteTally::new(vec![1, 0]);
        assert_eq!(
            statewide_total(2, [&big, &one]),
            Err(ApportionmentErrors::Overflow)
        );
        assert_eq!(
            VoteTally::new(vec![u64::MAX, 1]).total(),
            Err(ApportionmentErrors::Overflow)
        );

        let mut t = big.clone();
        assert_eq!(t.add(&one), Err(ApportionmentErrors::Overflow));
        assert_eq!(t, big);
    }
}
