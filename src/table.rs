use crate::error::FitError;
use ndarray::{s, Array2, ArrayView1, Axis};

/// A two dimensional table of numbers with row and column labels.
///
/// Every table-valued accessor of a fit returns one of these: summaries,
/// sampler parameters, elapsed times and the labeled draw table.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub(crate) row_names: Vec<String>,
    pub(crate) col_names: Vec<String>,
    pub(crate) values: Array2<f64>,
}

impl Table {
    /// Builds a table, checking that the labels match the shape of `values`.
    pub fn new(
        row_names: Vec<String>,
        col_names: Vec<String>,
        values: Array2<f64>,
    ) -> Result<Self, FitError> {
        let (nrows, ncols) = values.dim();
        if row_names.len() != nrows || col_names.len() != ncols {
            return Err(FitError::InvalidLayout(format!(
                "{} row and {} column labels for a {}x{} table",
                row_names.len(),
                col_names.len(),
                nrows,
                ncols
            )));
        }
        Ok(Self {
            row_names,
            col_names,
            values,
        })
    }

    /// Builds a table whose rows are labeled `1..=nrows`.
    pub fn with_numbered_rows(col_names: Vec<String>, values: Array2<f64>) -> Result<Self, FitError> {
        let row_names = (1..=values.nrows()).map(|i| i.to_string()).collect();
        Self::new(row_names, col_names, values)
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }

    pub fn row_names(&self) -> &[String] {
        &self.row_names
    }

    pub fn col_names(&self) -> &[String] {
        &self.col_names
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn into_values(self) -> Array2<f64> {
        self.values
    }

    /// Column by label.
    pub fn column(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let j = self.col_names.iter().position(|c| c == name)?;
        Some(self.values.column(j))
    }

    /// Row by label.
    pub fn row(&self, name: &str) -> Option<ArrayView1<'_, f64>> {
        let i = self.row_names.iter().position(|r| r == name)?;
        Some(self.values.row(i))
    }

    /// Cell by row and column label.
    pub fn get(&self, row: &str, col: &str) -> Option<f64> {
        let i = self.row_names.iter().position(|r| r == row)?;
        let j = self.col_names.iter().position(|c| c == col)?;
        Some(self.values[[i, j]])
    }

    /// Copy of the table without its first `n` rows.
    pub(crate) fn skip_rows(&self, n: usize) -> Table {
        let n = n.min(self.nrows());
        Table {
            row_names: self.row_names[n..].to_vec(),
            col_names: self.col_names.clone(),
            values: self.values.slice(s![n.., ..]).to_owned(),
        }
    }

    /// Column means, labeled by column.
    pub fn column_means(&self) -> Vec<(String, f64)> {
        let means = self
            .values
            .mean_axis(Axis(0))
            .unwrap_or_else(|| ndarray::Array1::from_elem(self.ncols(), f64::NAN));
        self.col_names.iter().cloned().zip(means).collect()
    }
}
