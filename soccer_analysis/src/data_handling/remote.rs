use polars::prelude::*;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::{debug, error};

use crate::models::polars_err;

/// Blocking HTTP client for CSV bodies. One attempt per request.
pub struct CsvFetcher {
    client: Client,
}

impl CsvFetcher {
    pub fn new() -> PolarsResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("Accept", HeaderValue::from_static("text/csv, text/plain, */*"));
        headers.insert(USER_AGENT, HeaderValue::from_static("soccer_analysis/0.1"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| polars_err(Box::new(e)))?;

        Ok(Self { client })
    }

    pub fn get_bytes(&self, url: &str) -> PolarsResult<Vec<u8>> {
        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| polars_err(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            error!("Failed to fetch {}: HTTP {}", url, status);
            return Err(PolarsError::ComputeError(
                format!("Failed to fetch data from URL: {}. Status: {}", url, status).into(),
            ));
        }

        let body = response.bytes().map_err(|e| polars_err(Box::new(e)))?;
        Ok(body.to_vec())
    }
}
