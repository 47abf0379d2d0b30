use hoop_models::table::{numeric_column, text_column};
use hoop_models::{HoopError, Result};
use polars::prelude::DataFrame;
use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One-hot encoder over a fixed, sorted category list. Values outside the
/// fitted categories encode to an all-zero indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<String>,
}

impl OneHotEncoder {
    pub fn fit<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut categories: Vec<String> = values.into_iter().map(str::to_string).collect();
        categories.sort();
        categories.dedup();
        Self { categories }
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn position(&self, value: &str) -> Option<usize> {
        self.categories.binary_search_by(|c| c.as_str().cmp(value)).ok()
    }

    pub fn encode(&self, value: Option<&str>) -> Array1<f64> {
        let mut indicator = Array1::zeros(self.width());
        if let Some(idx) = value.and_then(|v| self.position(v)) {
            indicator[idx] = 1.0;
        }
        indicator
    }

    /// Inverse of [`encode`](Self::encode); `None` unless exactly one slot is hot.
    pub fn decode(&self, indicator: ArrayView1<'_, f64>) -> Option<&str> {
        if indicator.len() != self.width() {
            return None;
        }
        let mut hot = indicator.iter().enumerate().filter(|(_, v)| **v == 1.0);
        match (hot.next(), hot.next()) {
            (Some((idx, _)), None) if indicator.iter().all(|v| *v == 0.0 || *v == 1.0) => {
                Some(self.categories[idx].as_str())
            }
            _ => None,
        }
    }
}

/// Turns processed rows into model input: the one-hot block for the
/// categorical column first, then the numeric columns in training order.
/// Null numeric cells are filled with the training mean of their column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeaturePreprocessor {
    categorical_column: String,
    encoder: OneHotEncoder,
    numeric_columns: Vec<String>,
    fill_values: Vec<f64>,
}

impl FeaturePreprocessor {
    pub fn fit(table: &DataFrame, categorical_column: &str, numeric_columns: Vec<String>) -> Result<Self> {
        let categories = text_column(table, categorical_column)?;
        let encoder = OneHotEncoder::fit(categories.iter().flatten().map(String::as_str));

        let mut fill_values = Vec::with_capacity(numeric_columns.len());
        for column in &numeric_columns {
            let values: Vec<f64> = numeric_column(table, column)?.into_iter().flatten().collect();
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            if values.len() < table.height() {
                debug!("{} null values in {} filled with {:.3}", table.height() - values.len(), column, mean);
            }
            fill_values.push(mean);
        }

        Ok(Self {
            categorical_column: categorical_column.to_string(),
            encoder,
            numeric_columns,
            fill_values,
        })
    }

    pub fn encoder(&self) -> &OneHotEncoder {
        &self.encoder
    }

    pub fn numeric_columns(&self) -> &[String] {
        &self.numeric_columns
    }

    pub fn output_width(&self) -> usize {
        self.encoder.width() + self.numeric_columns.len()
    }

    /// Names of the transformed columns, one-hot block first.
    pub fn output_names(&self) -> Vec<String> {
        self.encoder
            .categories()
            .iter()
            .map(|c| format!("{}_{c}", self.categorical_column))
            .chain(self.numeric_columns.iter().cloned())
            .collect()
    }

    /// Transforms one observation whose numeric values come from `lookup`.
    pub fn transform_one<F>(&self, category: Option<&str>, mut lookup: F) -> Result<Array1<f64>>
    where
        F: FnMut(&str) -> Result<Option<f64>>,
    {
        let mut out = Array1::zeros(self.output_width());
        let width = self.encoder.width();
        if let Some(idx) = category.and_then(|c| self.encoder.position(c)) {
            out[idx] = 1.0;
        }
        for (i, (column, fill)) in self.numeric_columns.iter().zip(&self.fill_values).enumerate() {
            out[width + i] = lookup(column)?.unwrap_or(*fill);
        }
        Ok(out)
    }

    pub fn transform_table(&self, table: &DataFrame) -> Result<Array2<f64>> {
        let categories = text_column(table, &self.categorical_column)?;
        let numeric = self
            .numeric_columns
            .iter()
            .map(|c| numeric_column(table, c))
            .collect::<Result<Vec<_>>>()?;

        let mut matrix = Array2::zeros((table.height(), self.output_width()));
        for (i, category) in categories.iter().enumerate() {
            let mut values = numeric.iter().map(|column| column[i]);
            let features = self.transform_one(category.as_deref(), |_| Ok(values.next().flatten()))?;
            matrix.row_mut(i).assign(&features);
        }
        Ok(matrix)
    }

    /// Checks that a table still carries every numeric column seen in training.
    pub fn check_columns(&self, available: &[String]) -> Result<()> {
        let missing: Vec<String> = self
            .numeric_columns
            .iter()
            .filter(|c| !available.contains(c))
            .cloned()
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HoopError::missing_columns("processed features", missing))
        }
    }
}
