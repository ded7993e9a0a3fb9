/*!

This is the long-form manual for `vote_apportionment` and `blockvotes`.

## Disaggregation

Election results are published by precinct, while many analyses need them on
census geography. `blockvotes disaggregate` moves every precinct result onto the
census blocks of the precinct, in proportion to the registered voters of each
block segment:

```text
share(block, category) = votes(precinct, category) * BLKREG / SRTOTREG
```

Shares are truncated, and the votes lost by truncation are handed back with the
Hamilton (largest remainder) method, one vote at a time to the segments with
the largest fractional parts. Segments with equal remainders are served in the
order in which they appear in the conversion file. Every category is rounded on
its own and no rounding crosses a precinct boundary, so the votes of each
precinct are preserved exactly.

A block split between several precincts receives the sum of its segments.

Blocks of water-only block groups (the 12th character of the identifier is
`0`) are left out of the block output.

## Aggregation

`blockvotes aggregate` sums a block file by block group, using the first 12
characters of `GEOID20` (a shorter identifier is its own group). It keeps
every row it is given: feeding it a block file that still contains water-only
blocks will produce water-only block groups.

## Input formats

### Precinct results

A CSV file with a header. The precinct identifier is read from `SRPREC_KEY`,
and the votes from `GOVDEM01` and `GOVREP01` by default. Any number of
categories can be configured.

### Conversion file

A CSV file with `BLOCK_KEY`, `SRPREC_KEY`, `BLKREG` and `SRTOTREG`. Rows with
an empty block or precinct are skipped.

### Block results

The output of the disaggregation and input of the aggregation:
`GEOID20,Tot,D,R`, with `Tot = D + R`.

## Configuration

All the column names and file paths can be set with a JSON file passed with
`--config`:

```json
{
  "precinctResults": {
    "filePath": "Precinct Results.csv",
    "precinctColumn": "SRPREC_KEY",
    "categories": [
      { "name": "D", "column": "GOVDEM01" },
      { "name": "R", "column": "GOVREP01" }
    ]
  },
  "conversion": {
    "filePath": "Conversion.csv"
  },
  "outputSettings": {
    "blockResultsPath": "Block Results.csv",
    "blockGroupResultsPath": "Block Group Results.csv"
  }
}
```

Relative paths are resolved from the directory of the configuration file.
Paths given on the command line take precedence.

*/
