//! Warehouse client seam
//!
//! The pipeline only ever needs "submit a statement, wait for it to finish,
//! hand back the rows". Everything behind that call (training, inference,
//! the query engine) belongs to the warehouse.
//!
//! # Example
//!
//! ```rust
//! use lead_scorer::sql::{Statement, StatementKind};
//! use lead_scorer::warehouse::{MemoryWarehouse, Warehouse};
//!
//! # async fn example() -> lead_scorer::Result<()> {
//! let warehouse = MemoryWarehouse::new();
//! let stmt = Statement { kind: StatementKind::TrainModel, sql: "CREATE ...".into() };
//! warehouse.execute(&stmt).await?;
//! assert!(warehouse.model_trained());
//! # Ok(())
//! # }
//! ```

mod bigquery;
mod memory;

pub use bigquery::BigQueryClient;
pub use memory::MemoryWarehouse;

use crate::sql::Statement;
use crate::{Error, Result};
use arrow::array::{Array, ArrayRef, BooleanArray, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use std::future::Future;
use std::sync::Arc;

/// A data warehouse that runs statements to completion.
pub trait Warehouse: Send + Sync {
    /// Submit a statement and wait until the job finishes.
    ///
    /// Returns every result row. DML and DDL statements return an empty
    /// result set, with the affected-row count when the warehouse reports
    /// one.
    fn execute(&self, statement: &Statement) -> impl Future<Output = Result<ResultSet>> + Send;
}

/// Rows returned by a finished job
#[derive(Debug, Clone)]
pub struct ResultSet {
    batch: RecordBatch,
    job_id: Option<String>,
    affected_rows: Option<u64>,
}

impl ResultSet {
    /// Wrap a record batch
    #[must_use]
    pub const fn new(batch: RecordBatch) -> Self {
        Self {
            batch,
            job_id: None,
            affected_rows: None,
        }
    }

    /// Result of a statement that returns no rows
    #[must_use]
    pub fn empty() -> Self {
        Self::new(RecordBatch::new_empty(Arc::new(Schema::empty())))
    }

    /// Attach the warehouse job id
    #[must_use]
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Attach a DML affected-row count
    #[must_use]
    pub const fn with_affected_rows(mut self, rows: u64) -> Self {
        self.affected_rows = Some(rows);
        self
    }

    /// Underlying batch
    #[must_use]
    pub const fn batch(&self) -> &RecordBatch {
        &self.batch
    }

    /// Warehouse job id, if known
    #[must_use]
    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    /// Rows changed by a DML statement, if reported
    #[must_use]
    pub const fn affected_rows(&self) -> Option<u64> {
        self.affected_rows
    }

    /// Number of rows
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.batch.num_rows()
    }

    /// True when no rows came back
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.batch.num_rows() == 0
    }

    fn column(&self, name: &str) -> Result<&ArrayRef> {
        self.batch
            .column_by_name(name)
            .ok_or_else(|| Error::MissingColumn(name.to_string()))
    }

    fn type_error(name: &str, expected: &'static str, actual: &DataType) -> Error {
        Error::ColumnType {
            column: name.to_string(),
            expected,
            actual: format!("{actual:?}"),
        }
    }

    /// Read a numeric cell as `f64`. Integer columns are widened.
    ///
    /// # Errors
    /// Returns error if the column is missing or not numeric
    #[allow(clippy::cast_precision_loss)]
    pub fn f64_value(&self, row: usize, name: &str) -> Result<Option<f64>> {
        let column = self.column(name)?;
        if column.is_null(row) {
            return Ok(None);
        }
        if let Some(array) = column.as_any().downcast_ref::<Float64Array>() {
            return Ok(Some(array.value(row)));
        }
        if let Some(array) = column.as_any().downcast_ref::<Int64Array>() {
            return Ok(Some(array.value(row) as f64));
        }
        Err(Self::type_error(name, "FLOAT64", column.data_type()))
    }

    /// Read an integer cell.
    ///
    /// # Errors
    /// Returns error if the column is missing or not an integer
    pub fn i64_value(&self, row: usize, name: &str) -> Result<Option<i64>> {
        let column = self.column(name)?;
        if column.is_null(row) {
            return Ok(None);
        }
        column
            .as_any()
            .downcast_ref::<Int64Array>()
            .map(|array| Some(array.value(row)))
            .ok_or_else(|| Self::type_error(name, "INT64", column.data_type()))
    }

    /// Read a boolean cell.
    ///
    /// # Errors
    /// Returns error if the column is missing or not boolean
    pub fn bool_value(&self, row: usize, name: &str) -> Result<Option<bool>> {
        let column = self.column(name)?;
        if column.is_null(row) {
            return Ok(None);
        }
        column
            .as_any()
            .downcast_ref::<BooleanArray>()
            .map(|array| Some(array.value(row)))
            .ok_or_else(|| Self::type_error(name, "BOOL", column.data_type()))
    }

    /// Read a string cell.
    ///
    /// # Errors
    /// Returns error if the column is missing or not a string
    pub fn str_value(&self, row: usize, name: &str) -> Result<Option<&str>> {
        let column = self.column(name)?;
        if column.is_null(row) {
            return Ok(None);
        }
        column
            .as_any()
            .downcast_ref::<StringArray>()
            .map(|array| Some(array.value(row)))
            .ok_or_else(|| Self::type_error(name, "STRING", column.data_type()))
    }
}
