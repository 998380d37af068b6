use std::env;
use std::io::Cursor;
use std::path::PathBuf;

use ndarray::Array2;
use polars::prelude::*;
use tracing::error;

/// Rows scanned before the CSV reader settles on a column type. Fixture tables list
/// unplayed matches (null scores) first, so the default window is too small.
const INFER_SCHEMA_ROWS: usize = 10_000;

pub fn project_root() -> PathBuf {
    match env::var_os("PROJECT_ROOT") {
        Some(val) => PathBuf::from(val),
        None => {
            // Fall back to current directory if PROJECT_ROOT not set
            env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        }
    }
}

pub fn read_csv(file_path: &str) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .try_into_reader_with_file_path(Some(PathBuf::from(file_path)))?
        .finish()
}

/// Same as [`read_csv`] for a body that was already fetched into memory.
pub fn read_csv_bytes(bytes: Vec<u8>) -> PolarsResult<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
}

pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_names().iter().any(|c| c.as_str() == name)
}

/// Fail with `ColumnNotFound` on the first referenced column the table does not have.
pub fn ensure_columns(df: &DataFrame, columns: &[&str]) -> PolarsResult<()> {
    for &name in columns {
        if !has_column(df, name) {
            error!("Column `{}` not found in the loaded table", name);
            return Err(PolarsError::ColumnNotFound(
                format!("`{}` is not a column of the loaded table", name).into(),
            ));
        }
    }
    Ok(())
}

pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

pub fn string_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| c.dtype() == &DataType::String)
        .map(|c| c.name().to_string())
        .collect()
}

/// Column values as `f64`; anything that does not cast (or is NaN) becomes `None`.
pub fn column_f64(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let casted = df.column(name)?.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.filter(|x| !x.is_nan()))
        .collect())
}

/// Non-missing values of a column, in row order.
pub fn column_values(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
    Ok(column_f64(df, name)?.into_iter().flatten().collect())
}

pub fn column_str(df: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let casted = df.column(name)?.cast(&DataType::String)?;
    Ok(casted
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

/// Row pairs of two numeric columns where both sides are present.
pub fn paired_values(df: &DataFrame, x: &str, y: &str) -> PolarsResult<Vec<(f64, f64)>> {
    ensure_columns(df, &[x, y])?;
    let xs = column_f64(df, x)?;
    let ys = column_f64(df, y)?;
    Ok(xs
        .into_iter()
        .zip(ys)
        .filter_map(|pair| match pair {
            (Some(a), Some(b)) => Some((a, b)),
            _ => None,
        })
        .collect())
}

/// Dense `rows × columns` matrix; the frame must already be free of missing values.
pub fn frame_to_array(df: &DataFrame, columns: &[&str]) -> PolarsResult<Array2<f64>> {
    ensure_columns(df, columns)?;
    let mut x = Array2::<f64>::zeros((df.height(), columns.len()));
    for (j, &name) in columns.iter().enumerate() {
        for (i, opt) in column_f64(df, name)?.into_iter().enumerate() {
            x[[i, j]] = opt.ok_or_else(|| {
                PolarsError::ComputeError(
                    format!("missing value in `{}` at row {}", name, i).into(),
                )
            })?;
        }
    }
    Ok(x)
}

/// Reshape the given columns into a long `(variable, value)` frame, one row per cell.
pub fn to_long_form(df: &DataFrame, columns: &[&str]) -> PolarsResult<DataFrame> {
    ensure_columns(df, columns)?;
    let mut variables: Vec<&str> = Vec::with_capacity(df.height() * columns.len());
    let mut values: Vec<Option<f64>> = Vec::with_capacity(df.height() * columns.len());
    for &name in columns {
        for v in column_f64(df, name)? {
            variables.push(name);
            values.push(v);
        }
    }
    DataFrame::new(vec![
        Column::from(Series::new(PlSmallStr::from("variable"), variables)),
        Column::from(Series::new(PlSmallStr::from("value"), values)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;
    use std::io::Write;

    #[test]
    fn reads_csv_from_path_and_bytes() {
        let body = "team,spi\nA,40.5\nB,61.0\n";
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();

        let from_path = read_csv(file.path().to_str().unwrap()).unwrap();
        let from_bytes = read_csv_bytes(body.as_bytes().to_vec()).unwrap();
        assert_eq!(from_path.shape(), (2, 2));
        assert!(from_path.equals(&from_bytes));
    }

    #[test]
    fn missing_column_is_reported() {
        let df = df!["spi1" => [1.0, 2.0]].unwrap();
        assert!(ensure_columns(&df, &["spi1"]).is_ok());
        let err = ensure_columns(&df, &["spi1", "spi2"]).unwrap_err();
        assert!(matches!(err, PolarsError::ColumnNotFound(_)));
    }

    #[test]
    fn long_form_stacks_columns() {
        let df = df![
            "score1" => [Some(1.0), None],
            "score2" => [Some(2.0), Some(0.0)]
        ]
        .unwrap();
        let long = to_long_form(&df, &["score1", "score2"]).unwrap();
        assert_eq!(long.height(), 4);
        let vars = column_str(&long, "variable").unwrap();
        assert_eq!(vars[0].as_deref(), Some("score1"));
        assert_eq!(vars[3].as_deref(), Some("score2"));
        assert_eq!(long.column("value").unwrap().null_count(), 1);
    }

    #[test]
    fn frame_to_array_rejects_nulls() {
        let df = df!["a" => [Some(1.0), None]].unwrap();
        assert!(frame_to_array(&df, &["a"]).is_err());
        let df = df!["a" => [1i64, 2], "b" => [0.5, 1.5]].unwrap();
        let x = frame_to_array(&df, &["a", "b"]).unwrap();
        assert_eq!(x[[1, 0]], 2.0);
        assert_eq!(x[[0, 1]], 0.5);
    }
}
