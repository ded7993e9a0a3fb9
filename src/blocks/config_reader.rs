use crate::blocks::*;

use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_PRECINCT_RESULTS_PATH: &str = "Precinct Results.csv";
pub const DEFAULT_CONVERSION_PATH: &str = "Conversion.csv";
pub const DEFAULT_BLOCK_RESULTS_PATH: &str = "Block Results.csv";
pub const DEFAULT_BLOCK_GROUP_RESULTS_PATH: &str = "Block Group Results.csv";

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CategorySource {
    /// The column name in the block outputs.
    pub name: String,
    /// The column name in the precinct results.
    pub column: String,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrecinctResultsSource {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "precinctColumn")]
    pub precinct_column: Option<String>,
    pub categories: Option<Vec<CategorySource>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversionSource {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    #[serde(rename = "blockColumn")]
    pub block_column: Option<String>,
    #[serde(rename = "precinctColumn")]
    pub precinct_column: Option<String>,
    #[serde(rename = "blockRegistrationColumn")]
    pub block_registration_column: Option<String>,
    #[serde(rename = "precinctRegistrationColumn")]
    pub precinct_registration_column: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "blockResultsPath")]
    pub block_results_path: Option<String>,
    #[serde(rename = "blockGroupResultsPath")]
    pub block_group_results_path: Option<String>,
    #[serde(rename = "geoidColumn")]
    pub geoid_column: Option<String>,
    #[serde(rename = "totalColumn")]
    pub total_column: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockVotesConfig {
    #[serde(rename = "precinctResults", default)]
    pub precinct_results: PrecinctResultsSource,
    #[serde(default)]
    pub conversion: ConversionSource,
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
}

/// The settings of a run, once the configuration file and the defaults have
/// been combined.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Settings {
    pub precinct_results_path: String,
    pub precinct_column: String,
    pub categories: Vec<CategorySource>,

    pub conversion_path: String,
    pub block_column: String,
    pub conversion_precinct_column: String,
    pub block_registration_column: String,
    pub precinct_registration_column: String,

    pub block_results_path: String,
    pub block_group_results_path: String,
    pub geoid_column: String,
    pub total_column: String,
}

impl Settings {
    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }
}

impl Default for Settings {
    fn default() -> Settings {
        BlockVotesConfig::default().resolve(None)
    }
}

fn default_categories() -> Vec<CategorySource> {
    vec![
        CategorySource {
            name: "D".to_string(),
            column: "GOVDEM01".to_string(),
        },
        CategorySource {
            name: "R".to_string(),
            column: "GOVREP01".to_string(),
        },
    ]
}

// Paths in a configuration file are relative to the file itself. Default
// paths are relative to the working directory.
fn resolve_path(root: Option<&Path>, path: Option<String>, default: &str) -> String {
    match (root, path) {
        (Some(r), Some(p)) if Path::new(&p).is_relative() => r.join(p).display().to_string(),
        (_, Some(p)) => p,
        (_, None) => default.to_string(),
    }
}

impl BlockVotesConfig {
    pub fn resolve(self, root: Option<&Path>) -> Settings {
        let pr = self.precinct_results;
        let cv = self.conversion;
        let out = self.output_settings;
        Settings {
            precinct_results_path: resolve_path(root, pr.file_path, DEFAULT_PRECINCT_RESULTS_PATH),
            precinct_column: pr.precinct_column.unwrap_or_else(|| "SRPREC_KEY".to_string()),
            categories: pr.categories.unwrap_or_else(default_categories),
            conversion_path: resolve_path(root, cv.file_path, DEFAULT_CONVERSION_PATH),
            block_column: cv.block_column.unwrap_or_else(|| "BLOCK_KEY".to_string()),
            conversion_precinct_column: cv
                .precinct_column
                .unwrap_or_else(|| "SRPREC_KEY".to_string()),
            block_registration_column: cv
                .block_registration_column
                .unwrap_or_else(|| "BLKREG".to_string()),
            precinct_registration_column: cv
                .precinct_registration_column
                .unwrap_or_else(|| "SRTOTREG".to_string()),
            block_results_path: resolve_path(
                root,
                out.block_results_path,
                DEFAULT_BLOCK_RESULTS_PATH,
            ),
            block_group_results_path: resolve_path(
                root,
                out.block_group_results_path,
                DEFAULT_BLOCK_GROUP_RESULTS_PATH,
            ),
            geoid_column: out.geoid_column.unwrap_or_else(|| "GEOID20".to_string()),
            total_column: out.total_column.unwrap_or_else(|| "Tot".to_string()),
        }
    }
}

pub fn read_config(path: &str) -> BlockVotesResult<BlockVotesConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read_config: {:?}", contents);
    let config: BlockVotesConfig =
        serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    if let Some(cats) = &config.precinct_results.categories {
        if cats.is_empty() {
            whatever!("The configuration {} declares no vote category", path);
        }
    }
    Ok(config)
}

/// Reads the configuration file if there is one, and fills in the defaults.
pub fn load_settings(config_path: Option<&str>) -> BlockVotesResult<Settings> {
    match config_path {
        None => Ok(Settings::default()),
        Some(p) => {
            let config = read_config(p)?;
            info!("config: {:?}", config);
            let root = Path::new(p).parent();
            Ok(config.resolve(root))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let s = Settings::default();
        assert_eq!(s.precinct_results_path, "Precinct Results.csv");
        assert_eq!(s.conversion_path, "Conversion.csv");
        assert_eq!(s.block_results_path, "Block Results.csv");
        assert_eq!(s.block_group_results_path, "Block Group Results.csv");
        assert_eq!(s.precinct_column, "SRPREC_KEY");
        assert_eq!(s.block_registration_column, "BLKREG");
        assert_eq!(s.precinct_registration_column, "SRTOTREG");
        assert_eq!(s.geoid_column, "GEOID20");
        assert_eq!(s.category_names(), vec!["D".to_string(), "R".to_string()]);
        assert_eq!(s.categories[0].column, "GOVDEM01");
    }

    #[test]
    fn partial_config_with_relative_paths() {
        let js = r#"{
            "precinctResults": {
                "filePath": "prec.csv",
                "categories": [
                    {"name": "D", "column": "PRSDEM01"},
                    {"name": "R", "column": "PRSREP01"},
                    {"name": "G", "column": "PRSGRN01"}
                ]
            },
            "outputSettings": {"blockResultsPath": "/tmp/out.csv"}
        }"#;
        let config: BlockVotesConfig = serde_json::from_str(js).unwrap();
        let s = config.resolve(Some(Path::new("/data/ca")));
        assert_eq!(s.precinct_results_path, "/data/ca/prec.csv");
        assert_eq!(s.block_results_path, "/tmp/out.csv");
        // Defaults stay relative to the working directory.
        assert_eq!(s.conversion_path, "Conversion.csv");
        assert_eq!(s.category_names().len(), 3);
        assert_eq!(s.block_column, "BLOCK_KEY");
    }

    #[test]
    fn empty_config() {
        let config: BlockVotesConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.resolve(None), Settings::default());
    }
}
