use polars::df;
use polars::prelude::*;
use tracing::info;

use crate::models::Dataset;
use crate::stats::{describe_categorical, describe_numeric};

const PREVIEW_ROWS: usize = 5;

/// Read-only descriptive queries over one loaded table.
#[derive(Debug, Clone)]
pub struct DataSummary {
    df: DataFrame,
}

impl DataSummary {
    pub fn new(source: &impl Dataset) -> PolarsResult<Self> {
        Ok(Self::from_frame(source.load()?))
    }

    pub fn from_frame(df: DataFrame) -> Self {
        Self { df }
    }

    pub fn data(&self) -> &DataFrame {
        &self.df
    }

    pub fn head(&self, n: usize) -> DataFrame {
        self.df.head(Some(n))
    }

    pub fn tail(&self, n: usize) -> DataFrame {
        self.df.tail(Some(n))
    }

    pub fn display_head(&self) {
        println!("{}", self.head(PREVIEW_ROWS));
    }

    pub fn display_tail(&self) {
        println!("{}", self.tail(PREVIEW_ROWS));
    }

    /// `(rows, columns)`
    pub fn shape(&self) -> (usize, usize) {
        self.df.shape()
    }

    /// Percentage of missing values per column (`column`, `missing_percent`).
    /// An empty table reports 0 for every column.
    pub fn missing_value_percent(&self) -> PolarsResult<DataFrame> {
        let rows = self.df.height();
        let (names, percents): (Vec<String>, Vec<f64>) = self
            .df
            .get_columns()
            .iter()
            .map(|c| {
                let pct = if rows == 0 { 0.0 } else { c.null_count() as f64 / rows as f64 * 100.0 };
                (c.name().to_string(), pct)
            })
            .unzip();
        df![
            "column" => names,
            "missing_percent" => percents
        ]
    }

    /// Logical data type per column (`column`, `dtype`).
    pub fn data_types(&self) -> PolarsResult<DataFrame> {
        let (names, dtypes): (Vec<String>, Vec<String>) = self
            .df
            .get_columns()
            .iter()
            .map(|c| (c.name().to_string(), c.dtype().to_string()))
            .unzip();
        df![
            "column" => names,
            "dtype" => dtypes
        ]
    }

    /// Prints one line per column with its non-null count and type, then the row count.
    pub fn data_info(&self) {
        let (rows, cols) = self.shape();
        println!("{} entries, {} columns", rows, cols);
        println!(" #  {:<24} {:>14}  {}", "Column", "Non-Null Count", "Dtype");
        for (i, c) in self.df.get_columns().iter().enumerate() {
            println!(
                "{:>2}  {:<24} {:>14}  {}",
                i,
                c.name().as_str(),
                format!("{} non-null", rows - c.null_count()),
                c.dtype()
            );
        }
    }

    pub fn numerical_descriptive_statistics(&self) -> PolarsResult<DataFrame> {
        describe_numeric(&self.df)
    }

    pub fn categorical_descriptive_statistics(&self) -> PolarsResult<DataFrame> {
        describe_categorical(&self.df)
    }

    pub fn explain_head_tail(&self) {
        info!("Explaining head and tail of a {:?} table", self.shape());
        println!("Head of the dataset:");
        println!("These are the first few rows of the dataset, providing an overview of the data.");
        self.display_head();

        println!("\nTail of the dataset:");
        println!("These are the last few rows of the dataset, offering insights into the recent data.");
        self.display_tail();
    }

    pub fn explain_descriptive_stats(&self) -> PolarsResult<()> {
        println!("\nDescriptive Statistics:");
        println!(
            "These statistics summarize the central tendency, dispersion, and shape of the dataset's distribution."
        );
        println!("{}", self.numerical_descriptive_statistics()?);
        let categorical = self.categorical_descriptive_statistics()?;
        if categorical.width() > 1 {
            println!("{}", categorical);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::helper_functions::{column_f64, column_str};

    fn matches() -> DataFrame {
        df![
            "team1" => ["Arsenal", "Chelsea", "Arsenal", "Everton"],
            "spi1" => [Some(80.0), Some(75.0), None, Some(60.0)],
            "score1" => [Some(2i64), None, None, Some(1)]
        ]
        .unwrap()
    }

    #[test]
    fn shape_and_preview() {
        let summary = DataSummary::from_frame(matches());
        assert_eq!(summary.shape(), (4, 3));
        assert_eq!(summary.head(2).height(), 2);
        let tail = summary.tail(1);
        assert_eq!(column_str(&tail, "team1").unwrap(), vec![Some("Everton".to_string())]);
        assert_eq!(summary.head(10).height(), 4);
    }

    #[test]
    fn missing_percent_matches_null_counts() {
        let summary = DataSummary::from_frame(matches());
        let missing = summary.missing_value_percent().unwrap();
        assert_eq!(missing.height(), 3);
        assert_eq!(
            column_f64(&missing, "missing_percent").unwrap(),
            vec![Some(0.0), Some(25.0), Some(50.0)]
        );
    }

    #[test]
    fn empty_table_reports_zero_missing() {
        let empty = matches().head(Some(0));
        let missing = DataSummary::from_frame(empty).missing_value_percent().unwrap();
        assert!(column_f64(&missing, "missing_percent").unwrap().iter().all(|v| *v == Some(0.0)));
    }

    #[test]
    fn data_types_name_every_column() {
        let types = DataSummary::from_frame(matches()).data_types().unwrap();
        assert_eq!(types.height(), 3);
        let dtypes = column_str(&types, "dtype").unwrap();
        assert_eq!(dtypes[1].as_deref(), Some("f64"));
    }

    #[test]
    fn descriptive_statistics_split_by_kind() {
        let summary = DataSummary::from_frame(matches());
        let numeric = summary.numerical_descriptive_statistics().unwrap();
        assert_eq!(numeric.width(), 3);
        assert_eq!(numeric.height(), 8);

        let categorical = summary.categorical_descriptive_statistics().unwrap();
        assert_eq!(categorical.width(), 2);
        let team = column_str(&categorical, "team1").unwrap();
        assert_eq!(team[2].as_deref(), Some("Arsenal"));
        assert_eq!(team[3].as_deref(), Some("2"));
    }

    #[test]
    fn no_string_columns_gives_empty_categorical_table() {
        let df = df!["spi" => [1.0, 2.0]].unwrap();
        let categorical = DataSummary::from_frame(df).categorical_descriptive_statistics().unwrap();
        assert_eq!(categorical.width(), 1);
    }

    #[test]
    fn loads_through_a_dataset() {
        let summary = DataSummary::new(&matches()).unwrap();
        assert_eq!(summary.shape(), (4, 3));
        summary.explain_descriptive_stats().unwrap();
    }
}
