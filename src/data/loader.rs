//! Dataset fetching and CSV parsing
//!
//! The two source files live at fixed URLs. Downloads are cached on disk so
//! repeat runs (and offline runs pointed at local files) skip the network.

use crate::error::{HarbenchError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Labeled training measurements.
pub const TRAINING_URL: &str =
    "https://d396qusza40orc.cloudfront.net/predmachlearn/pml-training.csv";

/// Unlabeled 20-row quiz set.
pub const QUIZ_URL: &str =
    "https://d396qusza40orc.cloudfront.net/predmachlearn/pml-testing.csv";

/// Where the two datasets come from and where downloads are cached.
#[derive(Debug, Clone)]
pub struct DatasetSource {
    pub training_url: String,
    pub quiz_url: String,
    pub cache_dir: PathBuf,
}

impl Default for DatasetSource {
    fn default() -> Self {
        Self {
            training_url: TRAINING_URL.to_string(),
            quiz_url: QUIZ_URL.to_string(),
            cache_dir: PathBuf::from("data"),
        }
    }
}

impl DatasetSource {
    /// Fetch (or reuse) both datasets, returning local paths.
    pub fn ensure_local(&self) -> Result<(PathBuf, PathBuf)> {
        let training = fetch_dataset(&self.training_url, &self.cache_dir)?;
        let quiz = fetch_dataset(&self.quiz_url, &self.cache_dir)?;
        Ok((training, quiz))
    }
}

/// Download a dataset into the cache directory unless it is already there.
pub fn fetch_dataset(url: &str, cache_dir: &Path) -> Result<PathBuf> {
    let file_name = url
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HarbenchError::FetchError(format!("cannot derive file name from '{url}'")))?;

    let dest = cache_dir.join(file_name);
    if dest.exists() {
        debug!(path = %dest.display(), "using cached dataset");
        return Ok(dest);
    }

    std::fs::create_dir_all(cache_dir)?;

    info!(url, "downloading dataset");
    let response = ureq::get(url)
        .call()
        .map_err(|e| HarbenchError::FetchError(format!("GET {url}: {e}")))?;

    let mut reader = response.into_reader();
    let mut file = File::create(&dest)?;
    std::io::copy(&mut reader, &mut file)
        .map_err(|e| HarbenchError::FetchError(format!("writing {}: {e}", dest.display())))?;

    Ok(dest)
}

/// Load a measurement CSV.
///
/// The source files encode missing values as `NA`, `#DIV/0!`, or empty
/// fields; all three parse as nulls so the cleaner can see them.
pub fn load_csv(path: &Path) -> Result<DataFrame> {
    let null_markers: Vec<PlSmallStr> = vec!["NA".into(), "#DIV/0!".into(), "".into()];

    let parse_opts = CsvParseOptions::default()
        .with_null_values(Some(NullValues::AllColumns(null_markers)));

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .with_parse_options(parse_opts)
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| HarbenchError::DataError(e.to_string()))?
        .finish()
        .map_err(|e| HarbenchError::DataError(format!("{}: {e}", path.display())))?;

    debug!(
        path = %path.display(),
        rows = df.height(),
        cols = df.width(),
        "loaded dataset"
    );

    Ok(df)
}

/// Check that the training table carries the label column.
pub fn validate_training_schema(df: &DataFrame, label: &str) -> Result<()> {
    if df.height() == 0 {
        return Err(HarbenchError::SchemaError("training set is empty".to_string()));
    }
    if df.column(label).is_err() {
        return Err(HarbenchError::SchemaError(format!(
            "training set is missing the label column '{label}'"
        )));
    }
    Ok(())
}

/// Check that the quiz table does NOT carry the label column.
pub fn validate_quiz_schema(df: &DataFrame, label: &str) -> Result<()> {
    if df.column(label).is_ok() {
        return Err(HarbenchError::SchemaError(format!(
            "quiz set unexpectedly contains the label column '{label}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_parses_null_markers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.csv");
        let mut file = File::create(&path).unwrap();
        writeln!(file, "a,b,classe").unwrap();
        writeln!(file, "1.0,NA,A").unwrap();
        writeln!(file, "#DIV/0!,2.0,B").unwrap();
        writeln!(file, ",3.0,C").unwrap();
        drop(file);

        let df = load_csv(&path).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.column("a").unwrap().null_count(), 2);
        assert_eq!(df.column("b").unwrap().null_count(), 1);
        assert_eq!(df.column("classe").unwrap().null_count(), 0);
    }

    #[test]
    fn test_schema_validation() {
        let df = df!(
            "x" => &[1.0],
            "classe" => &["A"]
        )
        .unwrap();

        assert!(validate_training_schema(&df, "classe").is_ok());
        assert!(validate_quiz_schema(&df, "classe").is_err());
        assert!(validate_training_schema(&df, "missing").is_err());
    }

    #[test]
    fn test_fetch_uses_cache() {
        let dir = tempfile::tempdir().unwrap();
        let cached = dir.path().join("pml-training.csv");
        std::fs::write(&cached, "a,classe\n1,A\n").unwrap();

        // URL is never hit because the file already exists.
        let path = fetch_dataset(
            "https://invalid.example/pml-training.csv",
            dir.path(),
        )
        .unwrap();
        assert_eq!(path, cached);
    }
}
