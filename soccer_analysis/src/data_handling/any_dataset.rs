use polars::frame::DataFrame;
use polars::prelude::*;
use tracing::{error, info};

use crate::data_handling::remote::CsvFetcher;
use crate::helper_functions::{read_csv, read_csv_bytes};
use crate::models::Dataset;

/// A delimited-text table with a header row, addressed by filesystem path or `http(s)` URL.
#[derive(Debug, Clone)]
pub struct AnyDataset {
    pub path: String,
}

impl AnyDataset {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn is_remote(&self) -> bool {
        self.path.starts_with("http://") || self.path.starts_with("https://")
    }
}

impl Dataset for AnyDataset {
    fn load(&self) -> PolarsResult<DataFrame> {
        info!("Reading data from {}", &self.path);
        let loaded = if self.is_remote() {
            CsvFetcher::new()
                .and_then(|fetcher| fetcher.get_bytes(&self.path))
                .and_then(read_csv_bytes)
        } else {
            read_csv(&self.path)
        };

        match loaded {
            Ok(df) => {
                info!("Loaded {} rows x {} columns", df.height(), df.width());
                Ok(df)
            }
            Err(e) => {
                error!("Failed to read {}: {}", &self.path, e);
                Err(e)
            }
        }
    }
}

/// An already materialised frame, mostly useful for tests and chained analyses.
impl Dataset for DataFrame {
    fn load(&self) -> PolarsResult<DataFrame> {
        Ok(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_sources() {
        assert!(AnyDataset::new("https://example.org/spi.csv").is_remote());
        assert!(!AnyDataset::new("./data/spi.csv").is_remote());
    }

    #[test]
    fn missing_file_fails_to_load() {
        let source = AnyDataset::new("./definitely/not/here.csv");
        assert!(source.load().is_err());
    }
}
