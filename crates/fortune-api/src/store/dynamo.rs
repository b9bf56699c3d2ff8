//! [`DynamoTable`]: the DynamoDB-backed [`FortuneStore`].

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::operation::describe_table::DescribeTableError;
use aws_sdk_dynamodb::types::{
    AttributeDefinition, KeySchemaElement, KeyType, ProvisionedThroughput, ScalarAttributeType,
    TableDescription, TableStatus,
};
use aws_sdk_dynamodb::Client;
use common::Fortune;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use super::conversions::{
    fortune_key, fortune_to_item, item_to_fortune, KEY_ATTRIBUTE, NAME_ATTRIBUTE,
};
use super::{FortuneStore, StoreError};

/// Provisioned read capacity units for a newly created table.
pub const READ_CAPACITY_UNITS: i64 = 5;
/// Provisioned write capacity units for a newly created table.
pub const WRITE_CAPACITY_UNITS: i64 = 5;
/// Delay between status checks while waiting for a new table.
const TABLE_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// A single DynamoDB table holding fortunes, keyed by numeric `id`.
///
/// Cheap to clone: the SDK client is `Arc`-backed.
#[derive(Clone, Debug)]
pub struct DynamoTable {
    client: Client,
    table_name: String,
    ready_timeout: Duration,
}

impl DynamoTable {
    /// Bind `client` to `table_name`. `ready_timeout` bounds [`create_table`]'s
    /// wait for the table to become active.
    ///
    /// [`create_table`]: FortuneStore::create_table
    pub fn new(client: Client, table_name: impl Into<String>, ready_timeout: Duration) -> Self {
        Self {
            client,
            table_name: table_name.into(),
            ready_timeout,
        }
    }

    /// Name of the bound table.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Poll DescribeTable until the table reports `ACTIVE` or `deadline` passes.
    async fn wait_until_active(&self, deadline: Instant) -> Result<TableDescription, StoreError> {
        loop {
            match self
                .client
                .describe_table()
                .table_name(&self.table_name)
                .send()
                .await
            {
                Ok(resp) => {
                    if let Some(table) = resp.table() {
                        if table.table_status() == Some(&TableStatus::Active) {
                            return Ok(table.clone());
                        }
                        debug!(table = %self.table_name, status = ?table.table_status(), "table not active yet");
                    }
                }
                Err(err) => match err.into_service_error() {
                    // Newly created tables can take a moment to become visible.
                    DescribeTableError::ResourceNotFoundException(_) => {
                        debug!(table = %self.table_name, "table not visible yet");
                    }
                    other => {
                        warn!(table = %self.table_name, error = %DisplayErrorContext(&other), "waiting for table failed");
                        return Err(StoreError::Backend(format!(
                            "DescribeTable failed: {}",
                            DisplayErrorContext(&other)
                        )));
                    }
                },
            }

            if Instant::now() >= deadline {
                warn!(table = %self.table_name, "timed out waiting for table to become active");
                return Err(StoreError::Timeout {
                    table: self.table_name.clone(),
                    secs: self.ready_timeout.as_secs(),
                });
            }
            sleep(TABLE_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl FortuneStore for DynamoTable {
    async fn exists(&self) -> Result<bool, StoreError> {
        match self
            .client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => match err.into_service_error() {
                DescribeTableError::ResourceNotFoundException(_) => {
                    info!(table = %self.table_name, "table does not exist");
                    Ok(false)
                }
                other => {
                    warn!(table = %self.table_name, error = %DisplayErrorContext(&other), "couldn't determine table existence");
                    Err(StoreError::Backend(format!(
                        "DescribeTable failed: {}",
                        DisplayErrorContext(&other)
                    )))
                }
            },
        }
    }

    async fn create_table(&self) -> Result<TableDescription, StoreError> {
        let deadline = Instant::now()
            .checked_add(self.ready_timeout)
            .ok_or(StoreError::TimeoutOutOfRange(self.ready_timeout.as_secs()))?;
        let build_err = |e: aws_sdk_dynamodb::error::BuildError| StoreError::Backend(e.to_string());

        let key_definition = AttributeDefinition::builder()
            .attribute_name(KEY_ATTRIBUTE)
            .attribute_type(ScalarAttributeType::N)
            .build()
            .map_err(build_err)?;
        let key_schema = KeySchemaElement::builder()
            .attribute_name(KEY_ATTRIBUTE)
            .key_type(KeyType::Hash)
            .build()
            .map_err(build_err)?;
        let throughput = ProvisionedThroughput::builder()
            .read_capacity_units(READ_CAPACITY_UNITS)
            .write_capacity_units(WRITE_CAPACITY_UNITS)
            .build()
            .map_err(build_err)?;

        self.client
            .create_table()
            .table_name(&self.table_name)
            .attribute_definitions(key_definition)
            .key_schema(key_schema)
            .provisioned_throughput(throughput)
            .send()
            .await
            .map_err(|e| {
                warn!(table = %self.table_name, error = %DisplayErrorContext(&e), "couldn't create table");
                StoreError::Backend(format!("CreateTable failed: {}", DisplayErrorContext(&e)))
            })?;

        info!(
            table = %self.table_name,
            timeout_secs = self.ready_timeout.as_secs(),
            "table creation requested; waiting for it to become active"
        );
        self.wait_until_active(deadline).await
    }

    async fn put(&self, fortune: &Fortune) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(fortune_to_item(fortune)))
            .send()
            .await
            .map_err(|e| {
                warn!(table = %self.table_name, id = fortune.id, error = %DisplayErrorContext(&e), "couldn't add fortune");
                StoreError::Backend(format!("PutItem failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }

    async fn get(&self, id: i64) -> Result<Option<Fortune>, StoreError> {
        let resp = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(fortune_key(id)))
            .send()
            .await
            .map_err(|e| {
                warn!(table = %self.table_name, id, error = %DisplayErrorContext(&e), "couldn't get fortune");
                StoreError::Backend(format!("GetItem failed: {}", DisplayErrorContext(&e)))
            })?;

        match resp.item() {
            None => {
                debug!(table = %self.table_name, id, "no fortune with this id");
                Ok(None)
            }
            Some(item) => item_to_fortune(item).map(Some).map_err(|e| {
                warn!(table = %self.table_name, id, error = %e, "couldn't decode fortune");
                e
            }),
        }
    }

    async fn scan(&self) -> Result<Vec<Fortune>, StoreError> {
        let resp = self
            .client
            .scan()
            .table_name(&self.table_name)
            .projection_expression("#id, #name")
            .expression_attribute_names("#id", KEY_ATTRIBUTE)
            .expression_attribute_names("#name", NAME_ATTRIBUTE)
            .send()
            .await
            .map_err(|e| {
                warn!(table = %self.table_name, error = %DisplayErrorContext(&e), "couldn't scan fortunes");
                StoreError::Backend(format!("Scan failed: {}", DisplayErrorContext(&e)))
            })?;

        if resp.last_evaluated_key().is_some() {
            warn!(table = %self.table_name, returned = resp.items().len(), "scan truncated; returning first page only");
        }

        resp.items()
            .iter()
            .map(item_to_fortune)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                warn!(table = %self.table_name, error = %e, "couldn't decode scan results");
                e
            })
    }

    async fn delete(&self, fortune: &Fortune) -> Result<(), StoreError> {
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(fortune_key(fortune.id)))
            .send()
            .await
            .map_err(|e| {
                warn!(table = %self.table_name, id = fortune.id, error = %DisplayErrorContext(&e), "couldn't delete fortune");
                StoreError::Backend(format!("DeleteItem failed: {}", DisplayErrorContext(&e)))
            })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    use aws_sdk_dynamodb::config::retry::RetryConfig;
    use aws_sdk_dynamodb::config::{BehaviorVersion, Credentials, Region};
    use axum::{
        extract::State,
        http::{header, HeaderMap, StatusCode},
        response::{IntoResponse, Response},
        routing::post,
        Router,
    };
    use serde_json::{json, Value};

    type Calls = Arc<Mutex<Vec<(String, Value)>>>;
    type Responder = Arc<dyn Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync>;

    /// Local stand-in for the DynamoDB JSON API, answering by `X-Amz-Target`.
    #[derive(Clone)]
    struct FakeDynamo {
        calls: Calls,
        respond: Responder,
    }

    async fn dispatch(State(fake): State<FakeDynamo>, headers: HeaderMap, body: String) -> Response {
        let op = headers
            .get("x-amz-target")
            .and_then(|v| v.to_str().ok())
            .and_then(|t| t.strip_prefix("DynamoDB_20120810."))
            .unwrap_or_default()
            .to_string();
        let body: Value = serde_json::from_str(&body).unwrap_or(Value::Null);
        let (status, reply) = (fake.respond)(&op, &body);
        fake.calls.lock().unwrap().push((op, body));
        (
            status,
            [(header::CONTENT_TYPE, "application/x-amz-json-1.0")],
            reply.to_string(),
        )
            .into_response()
    }

    async fn fake_table(
        ready_timeout: Duration,
        respond: impl Fn(&str, &Value) -> (StatusCode, Value) + Send + Sync + 'static,
    ) -> (DynamoTable, Calls) {
        let calls = Calls::default();
        let app = Router::new().route("/", post(dispatch)).with_state(FakeDynamo {
            calls: calls.clone(),
            respond: Arc::new(respond),
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

        let conf = aws_sdk_dynamodb::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("us-east-1"))
            .credentials_provider(Credentials::new("test", "test", None, None, "test"))
            .retry_config(RetryConfig::disabled())
            .endpoint_url(format!("http://{addr}"))
            .build();
        let table = DynamoTable::new(Client::from_conf(conf), "fortunes", ready_timeout);
        (table, calls)
    }

    fn ok(body: Value) -> (StatusCode, Value) {
        (StatusCode::OK, body)
    }

    fn service_error(kind: &str) -> (StatusCode, Value) {
        (
            StatusCode::BAD_REQUEST,
            json!({"__type": format!("com.amazonaws.dynamodb.v20120810#{kind}"), "message": kind}),
        )
    }

    fn table_with_status(status: &str) -> Value {
        json!({"TableName": "fortunes", "TableStatus": status})
    }

    fn recorded(calls: &Calls) -> Vec<(String, Value)> {
        calls.lock().unwrap().clone()
    }

    #[tokio::test]
    async fn exists_is_false_when_table_missing() {
        let (table, calls) =
            fake_table(Duration::ZERO, |_, _| service_error("ResourceNotFoundException")).await;

        assert!(!table.exists().await.unwrap());
        let calls = recorded(&calls);
        assert_eq!(calls[0].0, "DescribeTable");
        assert_eq!(calls[0].1["TableName"], "fortunes");
    }

    #[tokio::test]
    async fn exists_is_true_when_described() {
        let (table, _) = fake_table(Duration::ZERO, |_, _| {
            ok(json!({"Table": table_with_status("ACTIVE")}))
        })
        .await;

        assert!(table.exists().await.unwrap());
    }

    #[tokio::test]
    async fn exists_surfaces_other_failures() {
        let (table, _) =
            fake_table(Duration::ZERO, |_, _| service_error("ValidationException")).await;

        assert!(matches!(table.exists().await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn create_table_sends_numeric_hash_key_and_fixed_throughput() {
        let (table, calls) = fake_table(Duration::from_secs(60), |op, _| match op {
            "CreateTable" => ok(json!({"TableDescription": table_with_status("CREATING")})),
            _ => ok(json!({"Table": table_with_status("ACTIVE")})),
        })
        .await;

        let desc = table.create_table().await.unwrap();
        assert_eq!(desc.table_status(), Some(&TableStatus::Active));

        let calls = recorded(&calls);
        let (op, body) = &calls[0];
        assert_eq!(op, "CreateTable");
        assert_eq!(body["TableName"], "fortunes");
        assert_eq!(
            body["KeySchema"],
            json!([{"AttributeName": "id", "KeyType": "HASH"}])
        );
        assert_eq!(
            body["AttributeDefinitions"],
            json!([{"AttributeName": "id", "AttributeType": "N"}])
        );
        assert_eq!(
            body["ProvisionedThroughput"],
            json!({"ReadCapacityUnits": 5, "WriteCapacityUnits": 5})
        );
        assert_eq!(calls[1].0, "DescribeTable");
    }

    #[tokio::test]
    async fn create_table_times_out_when_never_active() {
        let (table, calls) = fake_table(Duration::ZERO, |op, _| match op {
            "CreateTable" => ok(json!({"TableDescription": table_with_status("CREATING")})),
            _ => ok(json!({"Table": table_with_status("CREATING")})),
        })
        .await;

        let err = table.create_table().await.unwrap_err();
        assert!(matches!(err, StoreError::Timeout { ref table, secs: 0 } if table == "fortunes"));
        assert_eq!(recorded(&calls).len(), 2);
    }

    #[tokio::test]
    async fn create_table_rejects_unrepresentable_timeout_before_calling() {
        let (table, calls) = fake_table(Duration::from_secs(u64::MAX), |_, _| {
            ok(json!({"TableDescription": table_with_status("CREATING")}))
        })
        .await;

        let err = table.create_table().await.unwrap_err();
        assert!(matches!(err, StoreError::TimeoutOutOfRange(u64::MAX)));
        assert!(recorded(&calls).is_empty());
    }

    #[tokio::test]
    async fn create_table_failure_is_backend_error() {
        let (table, _) =
            fake_table(Duration::from_secs(60), |_, _| service_error("ResourceInUseException"))
                .await;

        assert!(matches!(table.create_table().await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn put_sends_full_item() {
        let (table, calls) = fake_table(Duration::ZERO, |_, _| ok(json!({}))).await;

        table.put(&Fortune::new(7, "lucky")).await.unwrap();
        let calls = recorded(&calls);
        assert_eq!(calls[0].0, "PutItem");
        assert_eq!(
            calls[0].1["Item"],
            json!({"id": {"N": "7"}, "name": {"S": "lucky"}})
        );
        assert!(calls[0].1.get("ConditionExpression").is_none());
    }

    #[tokio::test]
    async fn get_missing_item_is_none() {
        let (table, calls) = fake_table(Duration::ZERO, |_, _| ok(json!({}))).await;

        assert_eq!(table.get(8).await.unwrap(), None);
        let calls = recorded(&calls);
        assert_eq!(calls[0].0, "GetItem");
        assert_eq!(calls[0].1["Key"], json!({"id": {"N": "8"}}));
    }

    #[tokio::test]
    async fn get_existing_item() {
        let (table, _) = fake_table(Duration::ZERO, |_, _| {
            ok(json!({"Item": {"id": {"N": "7"}, "name": {"S": "lucky"}}}))
        })
        .await;

        assert_eq!(table.get(7).await.unwrap(), Some(Fortune::new(7, "lucky")));
    }

    #[tokio::test]
    async fn get_backend_failure_is_error() {
        let (table, _) = fake_table(Duration::ZERO, |_, _| {
            service_error("ProvisionedThroughputExceededException")
        })
        .await;

        assert!(matches!(table.get(1).await, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn scan_projects_id_and_name() {
        let (table, calls) = fake_table(Duration::ZERO, |_, _| {
            ok(json!({
                "Items": [
                    {"id": {"N": "1"}, "name": {"S": "one"}},
                    {"id": {"N": "2"}, "name": {"S": "two"}}
                ],
                "Count": 2,
                "ScannedCount": 2
            }))
        })
        .await;

        let fortunes = table.scan().await.unwrap();
        assert_eq!(fortunes, vec![Fortune::new(1, "one"), Fortune::new(2, "two")]);

        let calls = recorded(&calls);
        assert_eq!(calls[0].0, "Scan");
        assert_eq!(calls[0].1["ProjectionExpression"], "#id, #name");
        assert_eq!(
            calls[0].1["ExpressionAttributeNames"],
            json!({"#id": "id", "#name": "name"})
        );
    }

    #[tokio::test]
    async fn scan_of_truncated_page_returns_first_page() {
        let (table, _) = fake_table(Duration::ZERO, |_, _| {
            ok(json!({
                "Items": [{"id": {"N": "1"}, "name": {"S": "one"}}],
                "LastEvaluatedKey": {"id": {"N": "1"}}
            }))
        })
        .await;

        assert_eq!(table.scan().await.unwrap(), vec![Fortune::new(1, "one")]);
    }

    #[tokio::test]
    async fn delete_of_missing_key_succeeds() {
        let (table, calls) = fake_table(Duration::ZERO, |_, _| ok(json!({}))).await;

        table.delete(&Fortune::new(404, "")).await.unwrap();
        let calls = recorded(&calls);
        assert_eq!(calls[0].0, "DeleteItem");
        assert_eq!(calls[0].1["Key"], json!({"id": {"N": "404"}}));
    }
}
