//! Evaluation metrics read back from the warehouse

use crate::warehouse::ResultSet;
use crate::{Error, Result};
use arrow::array::{ArrayRef, Float64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Scalar metrics of a trained binary classifier.
///
/// Column names follow the warehouse's `ML.EVALUATE` output for logistic
/// regression.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EvaluationMetrics {
    /// Positive predictive value
    pub precision: f64,
    /// True positive rate
    pub recall: f64,
    /// Fraction classified correctly
    pub accuracy: f64,
    /// Harmonic mean of precision and recall
    pub f1_score: f64,
    /// Area under the ROC curve
    pub roc_auc: f64,
    /// Cross-entropy loss, when the warehouse reports it
    pub log_loss: Option<f64>,
}

impl EvaluationMetrics {
    /// Columns that must be present in an evaluation row
    pub const REQUIRED_COLUMNS: [&'static str; 5] =
        ["precision", "recall", "accuracy", "f1_score", "roc_auc"];

    /// Decode one evaluation row.
    ///
    /// # Errors
    /// Returns error if a required metric column is missing, null, or not
    /// numeric
    pub fn from_row(rs: &ResultSet, row: usize) -> Result<Self> {
        let mut values = [0.0; 5];
        for (value, name) in values.iter_mut().zip(Self::REQUIRED_COLUMNS) {
            *value = rs
                .f64_value(row, name)?
                .ok_or_else(|| Error::MissingColumn(format!("{name} (null)")))?;
        }
        let [precision, recall, accuracy, f1_score, roc_auc] = values;

        let log_loss = if rs.batch().column_by_name("log_loss").is_some() {
            rs.f64_value(row, "log_loss")?
        } else {
            None
        };

        Ok(Self {
            precision,
            recall,
            accuracy,
            f1_score,
            roc_auc,
            log_loss,
        })
    }

    /// Encode rows in the warehouse's evaluation layout.
    ///
    /// # Errors
    /// Returns error if Arrow rejects the batch
    pub fn to_batch(rows: &[Self]) -> Result<RecordBatch> {
        let column = |f: fn(&Self) -> f64| -> ArrayRef {
            Arc::new(Float64Array::from(rows.iter().map(f).collect::<Vec<_>>()))
        };
        let schema = Arc::new(Schema::new(vec![
            Field::new("precision", DataType::Float64, false),
            Field::new("recall", DataType::Float64, false),
            Field::new("accuracy", DataType::Float64, false),
            Field::new("f1_score", DataType::Float64, false),
            Field::new("log_loss", DataType::Float64, true),
            Field::new("roc_auc", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema,
            vec![
                column(|m| m.precision),
                column(|m| m.recall),
                column(|m| m.accuracy),
                column(|m| m.f1_score),
                Arc::new(Float64Array::from(
                    rows.iter().map(|m| m.log_loss).collect::<Vec<_>>(),
                )),
                column(|m| m.roc_auc),
            ],
        )?;
        Ok(batch)
    }
}
