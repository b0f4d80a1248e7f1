//! Local inspection of the report SELECT
//!
//! Parses a rendered SELECT with the BigQuery dialect and reads back the
//! ranking it asks for. Warehouse-ML extensions (`CREATE MODEL`,
//! `ML.EVALUATE`, `ML.PREDICT`) are outside what the parser understands, so
//! only the report query goes through here.

use sqlparser::ast::{Expr, OrderByExpr, SetExpr, Statement, Value};
use sqlparser::dialect::BigQueryDialect;
use sqlparser::parser::Parser;

/// Ranking requested by a SELECT
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    /// ORDER BY keys, outermost first
    pub order_by: Vec<(String, OrderDirection)>,
    /// Literal LIMIT, if any
    pub limit: Option<usize>,
}

/// Sort order direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (smallest first)
    Asc,
    /// Descending order (largest first)
    Desc,
}

impl From<&OrderByExpr> for OrderDirection {
    fn from(expr: &OrderByExpr) -> Self {
        // SQL sorts ascending unless told otherwise
        if expr.asc.unwrap_or(true) {
            Self::Asc
        } else {
            Self::Desc
        }
    }
}

/// SELECT inspector
pub struct QueryInspector {
    dialect: BigQueryDialect,
}

impl Default for QueryInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryInspector {
    /// Create a new inspector
    #[must_use]
    pub const fn new() -> Self {
        Self {
            dialect: BigQueryDialect {},
        }
    }

    /// Parse exactly one SELECT and return its ordering and limit.
    ///
    /// # Errors
    /// Returns `ParseError` on invalid syntax, more than one statement, or
    /// anything other than a plain SELECT
    ///
    /// # Example
    /// ```
    /// use lead_scorer::sql::{OrderDirection, QueryInspector};
    ///
    /// # fn main() -> Result<(), Box<dyn std::error::Error>> {
    /// let plan = QueryInspector::new()
    ///     .inspect("SELECT name FROM clinics ORDER BY propensity_score DESC LIMIT 5")?;
    /// assert_eq!(plan.limit, Some(5));
    /// assert_eq!(plan.order_by[0].1, OrderDirection::Desc);
    /// # Ok(())
    /// # }
    /// ```
    pub fn inspect(&self, sql: &str) -> crate::Result<QueryPlan> {
        let not_select = || crate::Error::ParseError("only a single SELECT can be inspected".into());

        let statements = Parser::parse_sql(&self.dialect, sql)
            .map_err(|e| crate::Error::ParseError(e.to_string()))?;
        let [Statement::Query(query)] = statements.as_slice() else {
            return Err(not_select());
        };
        if !matches!(query.body.as_ref(), SetExpr::Select(_)) {
            return Err(not_select());
        }

        let order_by = query
            .order_by
            .iter()
            .flat_map(|ob| &ob.exprs)
            .map(|o| (o.expr.to_string(), OrderDirection::from(o)))
            .collect();
        let limit = match &query.limit {
            Some(Expr::Value(Value::Number(n, _))) => n.parse().ok(),
            _ => None,
        };

        Ok(QueryPlan { order_by, limit })
    }
}
