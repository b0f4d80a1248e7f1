//! BigQuery REST client.
//!
//! Runs statements through `jobs.query`, polls `jobs.getQueryResults` until
//! the job completes, follows page tokens, and converts the JSON rows to an
//! Arrow batch. When a finished query lists errors, `jobs.get` decides
//! whether the job actually failed. Wraps the v2 API using [`reqwest`].

use super::{ResultSet, Warehouse};
use crate::clinic::LIST_SEPARATOR;
use crate::config::WarehouseConfig;
use crate::sql::Statement;
use crate::{Error, Result};
use arrow::array::{ArrayRef, BooleanArray, Float64Array, Int64Array, RecordBatch, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// HTTP client for the BigQuery v2 REST API.
pub struct BigQueryClient {
    client: reqwest::Client,
    base_url: String,
    project: String,
    location: Option<String>,
    access_token: Option<String>,
    poll_interval: Duration,
    wait_timeout_ms: u64,
}

/// Response body shared by `jobs.query` and `jobs.getQueryResults`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    #[serde(default)]
    pub schema: Option<TableSchema>,
    #[serde(default)]
    pub job_reference: Option<JobReference>,
    #[serde(default)]
    pub rows: Vec<TableRow>,
    #[serde(default)]
    pub page_token: Option<String>,
    #[serde(default)]
    pub job_complete: bool,
    #[serde(default)]
    pub num_dml_affected_rows: Option<String>,
    #[serde(default)]
    pub errors: Vec<ErrorProto>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobReference {
    pub job_id: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TableSchema {
    #[serde(default)]
    pub fields: Vec<FieldSchema>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct FieldSchema {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: String,
    #[serde(default)]
    pub mode: Option<String>,
}

impl FieldSchema {
    fn is_repeated(&self) -> bool {
        self.mode.as_deref() == Some("REPEATED")
    }

    fn arrow_type(&self) -> DataType {
        if self.is_repeated() {
            return DataType::Utf8;
        }
        match self.field_type.as_str() {
            "FLOAT" | "FLOAT64" | "NUMERIC" | "BIGNUMERIC" => DataType::Float64,
            "INTEGER" | "INT64" => DataType::Int64,
            "BOOLEAN" | "BOOL" => DataType::Boolean,
            _ => DataType::Utf8,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TableRow {
    #[serde(default)]
    pub f: Vec<TableCell>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct TableCell {
    #[serde(default)]
    pub v: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorProto {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// The parts of a `jobs.get` resource the client reads.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct Job {
    #[serde(default)]
    pub status: JobStatus,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JobStatus {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub error_result: Option<ErrorProto>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl BigQueryClient {
    /// Create a client for the configured project.
    #[must_use]
    pub fn new(config: &WarehouseConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: &WarehouseConfig) -> Self {
        if config.access_token.is_none() {
            warn!("no BigQuery access token configured; requests will be unauthenticated");
        }
        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            location: config.location.clone(),
            access_token: config.access_token.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            wait_timeout_ms: config.wait_timeout_ms,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// `POST /projects/{project}/queries`
    async fn start_query(&self, sql: &str) -> Result<QueryResponse> {
        let mut body = serde_json::json!({
            "query": sql,
            "useLegacySql": false,
            "timeoutMs": self.wait_timeout_ms,
        });
        if let Some(location) = &self.location {
            body["location"] = Value::String(location.clone());
        }

        let request = self
            .client
            .post(format!("{}/projects/{}/queries", self.base_url, self.project))
            .json(&body);
        let response = self.authorize(request).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /projects/{project}/queries/{jobId}`
    async fn get_results(
        &self,
        job: &JobReference,
        page_token: Option<&str>,
    ) -> Result<QueryResponse> {
        let mut query = vec![("timeoutMs", self.wait_timeout_ms.to_string())];
        if let Some(location) = job.location.as_ref().or(self.location.as_ref()) {
            query.push(("location", location.clone()));
        }
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }

        let request = self
            .client
            .get(format!(
                "{}/projects/{}/queries/{}",
                self.base_url, self.project, job.job_id
            ))
            .query(&query);
        let response = self.authorize(request).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /projects/{project}/jobs/{jobId}`
    async fn get_job(&self, job: &JobReference) -> Result<Job> {
        let mut query = Vec::new();
        if let Some(location) = job.location.as_ref().or(self.location.as_ref()) {
            query.push(("location", location.clone()));
        }
        let request = self
            .client
            .get(format!(
                "{}/projects/{}/jobs/{}",
                self.base_url, self.project, job.job_id
            ))
            .query(&query);
        let response = self.authorize(request).send().await?;
        Self::parse_response(response).await
    }

    /// Resolve the `errors` list of a finished query. Entries there can be
    /// warnings on a successful job; only the job's `errorResult` fails it.
    async fn check_job_status(&self, job: &JobReference, errors: &[ErrorProto]) -> Result<()> {
        let status = self.get_job(job).await?.status;
        job_outcome(&status)?;
        for entry in errors {
            warn!(
                job_id = %job.job_id,
                state = status.state.as_deref().unwrap_or("-"),
                reason = entry.reason.as_deref().unwrap_or("-"),
                message = entry.message.as_deref().unwrap_or(""),
                "job finished with warnings"
            );
        }
        Ok(())
    }

    /// Turn a non-2xx response into [`Error::Remote`] carrying the
    /// warehouse's own message.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());
        let (reason, message) = match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => (
                envelope.error.status,
                envelope.error.message.unwrap_or_else(|| body.clone()),
            ),
            Err(_) => (None, body),
        };
        Err(Error::Remote {
            status: reason.map_or_else(
                || status.as_u16().to_string(),
                |r| format!("{} {r}", status.as_u16()),
            ),
            message,
        })
    }

    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

impl Warehouse for BigQueryClient {
    async fn execute(&self, statement: &Statement) -> Result<ResultSet> {
        let step = statement.kind.label();
        debug!(step, sql = %statement.sql, "submitting statement");
        let started = Instant::now();

        let mut response = self.start_query(&statement.sql).await?;

        let job = response.job_reference.clone().ok_or_else(|| Error::Remote {
            status: "invalidResponse".to_string(),
            message: "query response carried no job reference".to_string(),
        })?;
        info!(step, job_id = %job.job_id, "job submitted");

        while !response.job_complete {
            tokio::time::sleep(self.poll_interval).await;
            debug!(step, job_id = %job.job_id, "polling job");
            response = self.get_results(&job, None).await?;
        }
        if !response.errors.is_empty() {
            self.check_job_status(&job, &response.errors).await?;
        }

        let schema = response.schema.clone().unwrap_or_default();
        let affected_rows = response
            .num_dml_affected_rows
            .as_deref()
            .and_then(|n| n.parse::<u64>().ok());
        let mut rows = std::mem::take(&mut response.rows);
        let mut page_token = response.page_token.take();
        while let Some(token) = page_token {
            let mut page = self.get_results(&job, Some(&token)).await?;
            rows.append(&mut page.rows);
            page_token = page.page_token.take();
        }

        info!(
            step,
            job_id = %job.job_id,
            rows = rows.len(),
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "job complete"
        );

        let mut result = ResultSet::new(rows_to_batch(&schema, &rows)?).with_job_id(job.job_id);
        if let Some(n) = affected_rows {
            result = result.with_affected_rows(n);
        }
        Ok(result)
    }
}

fn job_outcome(status: &JobStatus) -> Result<()> {
    match &status.error_result {
        None => Ok(()),
        Some(error) => Err(Error::Remote {
            status: error.reason.clone().unwrap_or_else(|| "jobError".to_string()),
            message: error.message.clone().unwrap_or_default(),
        }),
    }
}

/// Render a cell for a `Utf8` column. Repeated values are flattened with
/// [`LIST_SEPARATOR`]; nested records fall back to their JSON text.
fn cell_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| cell_text(item.get("v").unwrap_or(item)))
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
        ),
        other => Some(other.to_string()),
    }
}

fn parse_cell<T: std::str::FromStr>(field: &FieldSchema, value: &Value) -> Result<Option<T>> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => s.parse().map(Some).map_err(|_| Error::ColumnType {
            column: field.name.clone(),
            expected: "numeric or boolean text",
            actual: format!("{s:?}"),
        }),
        Value::Number(n) => n.to_string().parse().map(Some).map_err(|_| Error::ColumnType {
            column: field.name.clone(),
            expected: "numeric",
            actual: n.to_string(),
        }),
        Value::Bool(b) => b.to_string().parse().map(Some).map_err(|_| Error::ColumnType {
            column: field.name.clone(),
            expected: "boolean",
            actual: b.to_string(),
        }),
        other => Err(Error::ColumnType {
            column: field.name.clone(),
            expected: "scalar",
            actual: other.to_string(),
        }),
    }
}

fn cell(row: &TableRow, i: usize) -> &Value {
    static NULL: Value = Value::Null;
    row.f.get(i).map_or(&NULL, |c| &c.v)
}

/// Convert the REST schema and rows into a single Arrow batch.
pub(crate) fn rows_to_batch(schema: &TableSchema, rows: &[TableRow]) -> Result<RecordBatch> {
    if schema.fields.is_empty() {
        return Ok(RecordBatch::new_empty(Arc::new(Schema::empty())));
    }

    let mut fields = Vec::with_capacity(schema.fields.len());
    let mut columns: Vec<ArrayRef> = Vec::with_capacity(schema.fields.len());
    for (i, field) in schema.fields.iter().enumerate() {
        let data_type = field.arrow_type();
        let column: ArrayRef = match data_type {
            DataType::Float64 => Arc::new(Float64Array::from(
                rows.iter()
                    .map(|row| parse_cell::<f64>(field, cell(row, i)))
                    .collect::<Result<Vec<_>>>()?,
            )),
            DataType::Int64 => Arc::new(Int64Array::from(
                rows.iter()
                    .map(|row| parse_cell::<i64>(field, cell(row, i)))
                    .collect::<Result<Vec<_>>>()?,
            )),
            DataType::Boolean => Arc::new(BooleanArray::from(
                rows.iter()
                    .map(|row| parse_cell::<bool>(field, cell(row, i)))
                    .collect::<Result<Vec<_>>>()?,
            )),
            _ => Arc::new(StringArray::from(
                rows.iter()
                    .map(|row| cell_text(cell(row, i)))
                    .collect::<Vec<_>>(),
            )),
        };
        fields.push(Field::new(&field.name, data_type, true));
        columns.push(column);
    }

    Ok(RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sql::StatementKind;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    fn response(json: &str) -> QueryResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_rows_to_batch_typed_columns() {
        let resp = response(
            r#"{
              "jobComplete": true,
              "jobReference": {"projectId": "p", "jobId": "job_1", "location": "US"},
              "schema": {"fields": [
                {"name": "name", "type": "STRING", "mode": "NULLABLE"},
                {"name": "propensity_score", "type": "FLOAT", "mode": "NULLABLE"},
                {"name": "review_count", "type": "INTEGER", "mode": "NULLABLE"},
                {"name": "converted", "type": "BOOLEAN", "mode": "NULLABLE"},
                {"name": "services", "type": "STRING", "mode": "REPEATED"}
              ]},
              "rows": [
                {"f": [{"v": "Glow Med Spa"}, {"v": "0.91"}, {"v": "42"}, {"v": "false"},
                       {"v": [{"v": "botox"}, {"v": "filler"}]}]},
                {"f": [{"v": null}, {"v": null}, {"v": null}, {"v": null}, {"v": []}]}
              ],
              "totalRows": "2"
            }"#,
        );
        let schema = resp.schema.clone().unwrap();
        let rs = ResultSet::new(rows_to_batch(&schema, &resp.rows).unwrap());

        assert_eq!(rs.num_rows(), 2);
        assert_eq!(rs.str_value(0, "name").unwrap(), Some("Glow Med Spa"));
        assert_eq!(rs.f64_value(0, "propensity_score").unwrap(), Some(0.91));
        assert_eq!(rs.i64_value(0, "review_count").unwrap(), Some(42));
        assert_eq!(rs.bool_value(0, "converted").unwrap(), Some(false));
        assert_eq!(rs.str_value(0, "services").unwrap(), Some("botox, filler"));
        assert_eq!(rs.str_value(1, "name").unwrap(), None);
        assert_eq!(rs.f64_value(1, "propensity_score").unwrap(), None);
        assert_eq!(rs.str_value(1, "services").unwrap(), Some(""));
    }

    #[test]
    fn test_dml_response_without_schema() {
        let resp = response(
            r#"{"jobComplete": true, "jobReference": {"jobId": "job_2"},
                "numDmlAffectedRows": "137"}"#,
        );
        let batch = rows_to_batch(&resp.schema.clone().unwrap_or_default(), &resp.rows).unwrap();
        assert_eq!(batch.num_rows(), 0);
        assert_eq!(resp.num_dml_affected_rows.as_deref(), Some("137"));
    }

    #[test]
    fn test_incomplete_job_defaults() {
        let resp = response(r#"{"jobComplete": false, "jobReference": {"jobId": "job_3"}}"#);
        assert!(!resp.job_complete);
        assert!(resp.rows.is_empty());
        assert!(resp.page_token.is_none());
    }

    #[test]
    fn test_bad_numeric_cell() {
        let resp = response(
            r#"{"schema": {"fields": [{"name": "roc_auc", "type": "FLOAT"}]},
                "rows": [{"f": [{"v": "not-a-number"}]}]}"#,
        );
        let err = rows_to_batch(&resp.schema.clone().unwrap(), &resp.rows).unwrap_err();
        assert!(matches!(err, Error::ColumnType { column, .. } if column == "roc_auc"));
    }

    #[test]
    fn test_job_error_result_fails() {
        let job: Job = serde_json::from_str(
            r#"{"status": {"state": "DONE", "errorResult":
                {"reason": "quotaExceeded", "message": "Quota exceeded"}}}"#,
        )
        .unwrap();
        let err = job_outcome(&job.status).unwrap_err();
        assert!(err.to_string().contains("quotaExceeded"));
        assert!(err.to_string().contains("Quota exceeded"));
    }

    #[test]
    fn test_job_without_error_result_succeeds() {
        let job: Job = serde_json::from_str(r#"{"status": {"state": "DONE"}}"#).unwrap();
        assert_eq!(job.status.state.as_deref(), Some("DONE"));
        assert!(job_outcome(&job.status).is_ok());
    }

    #[test]
    fn test_client_trims_base_url() {
        let config = WarehouseConfig {
            project: "p".to_string(),
            api_base_url: "http://localhost:9050/bigquery/v2/".to_string(),
            access_token: Some("t".to_string()),
            ..WarehouseConfig::default()
        };
        let client = BigQueryClient::new(&config);
        assert_eq!(client.base_url, "http://localhost:9050/bigquery/v2");
        assert_eq!(client.poll_interval, Duration::from_millis(1000));
    }

    // A minimal HTTP/1.1 server answering each connection with the next
    // canned reply, then closing it. Returns the raw requests it saw.
    async fn serve(replies: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            let mut seen = Vec::new();
            for (status, body) in replies {
                let (mut socket, _) = listener.accept().await.unwrap();
                seen.push(read_request(&mut socket).await);
                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                socket.write_all(reply.as_bytes()).await.unwrap();
                socket.shutdown().await.ok();
            }
            seen
        });
        (format!("http://{addr}/bigquery/v2"), handle)
    }

    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = socket.read(&mut chunk).await.unwrap();
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                continue;
            };
            let head = String::from_utf8_lossy(&buf[..end]).to_lowercase();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if buf.len() >= end + 4 + body_len {
                break;
            }
        }
        String::from_utf8_lossy(&buf).into_owned()
    }

    fn stub_client(base_url: String) -> BigQueryClient {
        let config = WarehouseConfig {
            project: "p".to_string(),
            api_base_url: base_url,
            access_token: Some("t0k3n".to_string()),
            poll_interval_ms: 1,
            ..WarehouseConfig::default()
        };
        let client = reqwest::Client::builder().no_proxy().build().unwrap();
        BigQueryClient::with_client(client, &config)
    }

    fn select() -> Statement {
        Statement {
            kind: StatementKind::EvaluateModel,
            sql: "SELECT 1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_execute_polls_until_complete() {
        let (base_url, server) = serve(vec![
            (200, r#"{"jobComplete": false, "jobReference": {"jobId": "job_1", "location": "US"}}"#),
            (
                200,
                r#"{"jobComplete": true, "jobReference": {"jobId": "job_1", "location": "US"},
                    "schema": {"fields": [{"name": "precision", "type": "FLOAT"}]},
                    "rows": [{"f": [{"v": "0.812"}]}]}"#,
            ),
        ])
        .await;

        let rs = stub_client(base_url).execute(&select()).await.unwrap();
        assert_eq!(rs.job_id(), Some("job_1"));
        assert_eq!(rs.f64_value(0, "precision").unwrap(), Some(0.812));

        let requests = server.await.unwrap();
        assert!(requests[0].starts_with("POST /bigquery/v2/projects/p/queries HTTP/1.1"));
        assert!(requests[0].contains(r#""useLegacySql":false"#));
        assert!(requests[0].to_lowercase().contains("authorization: bearer t0k3n"));
        assert!(requests[1].starts_with("GET /bigquery/v2/projects/p/queries/job_1?"));
        assert!(requests[1].contains("location=US"));
    }

    #[tokio::test]
    async fn test_execute_follows_page_tokens() {
        let (base_url, server) = serve(vec![
            (
                200,
                r#"{"jobComplete": true, "jobReference": {"jobId": "job_2"},
                    "schema": {"fields": [{"name": "name", "type": "STRING"}]},
                    "rows": [{"f": [{"v": "Glow Med Spa"}]}], "pageToken": "page2"}"#,
            ),
            (
                200,
                r#"{"jobComplete": true, "jobReference": {"jobId": "job_2"},
                    "rows": [{"f": [{"v": "Summit Wellness"}]}]}"#,
            ),
        ])
        .await;

        let rs = stub_client(base_url).execute(&select()).await.unwrap();
        assert_eq!(rs.num_rows(), 2);
        assert_eq!(rs.str_value(0, "name").unwrap(), Some("Glow Med Spa"));
        assert_eq!(rs.str_value(1, "name").unwrap(), Some("Summit Wellness"));

        let requests = server.await.unwrap();
        assert!(requests[1].contains("pageToken=page2"));
    }

    #[tokio::test]
    async fn test_http_error_becomes_remote() {
        let (base_url, server) = serve(vec![(
            403,
            r#"{"error": {"code": 403, "status": "PERMISSION_DENIED",
                "message": "Access Denied: Project p"}}"#,
        )])
        .await;

        let err = stub_client(base_url).execute(&select()).await.unwrap_err();
        match err {
            Error::Remote { status, message } => {
                assert_eq!(status, "403 PERMISSION_DENIED");
                assert_eq!(message, "Access Denied: Project p");
            }
            other => panic!("expected remote error, got {other:?}"),
        }
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_dml_affected_rows_reported() {
        let (base_url, server) = serve(vec![(
            200,
            r#"{"jobComplete": true, "jobReference": {"jobId": "job_dml"},
                "numDmlAffectedRows": "137"}"#,
        )])
        .await;

        let rs = stub_client(base_url).execute(&select()).await.unwrap();
        assert!(rs.is_empty());
        assert_eq!(rs.affected_rows(), Some(137));
        assert_eq!(rs.job_id(), Some("job_dml"));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_warnings_on_successful_job_pass() {
        let (base_url, server) = serve(vec![
            (
                200,
                r#"{"jobComplete": true, "jobReference": {"jobId": "job_w"},
                    "numDmlAffectedRows": "3",
                    "errors": [{"reason": "warning", "message": "slot contention"}]}"#,
            ),
            (200, r#"{"status": {"state": "DONE"}}"#),
        ])
        .await;

        let rs = stub_client(base_url).execute(&select()).await.unwrap();
        assert_eq!(rs.affected_rows(), Some(3));

        let requests = server.await.unwrap();
        assert!(requests[1].starts_with("GET /bigquery/v2/projects/p/jobs/job_w"));
    }

    #[tokio::test]
    async fn test_job_error_result_fails_execute() {
        let (base_url, server) = serve(vec![
            (
                200,
                r#"{"jobComplete": true, "jobReference": {"jobId": "job_e"},
                    "errors": [{"reason": "invalidQuery", "message": "Syntax error"}]}"#,
            ),
            (
                200,
                r#"{"status": {"state": "DONE", "errorResult":
                    {"reason": "invalidQuery", "message": "Syntax error at [1:1]"}}}"#,
            ),
        ])
        .await;

        let err = stub_client(base_url).execute(&select()).await.unwrap_err();
        assert!(matches!(
            err,
            Error::Remote { ref status, .. } if status == "invalidQuery"
        ));
        server.await.unwrap();
    }
}
