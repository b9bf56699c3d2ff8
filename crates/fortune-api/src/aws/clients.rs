//! AWS SDK client bundle.

use anyhow::Result;
use aws_config::BehaviorVersion;
use tracing::info;

/// Bundle of AWS SDK clients used by the service.
///
/// Constructed once at startup and cloned into whatever needs it; SDK clients
/// are `Arc`-backed and pool their own connections.
#[derive(Clone, Debug)]
pub struct AwsClients {
    /// DynamoDB client backing the fortune table.
    pub dynamodb: aws_sdk_dynamodb::Client,
}

impl AwsClients {
    /// Resolve the ambient AWS configuration and build all SDK clients.
    ///
    /// Credentials and region come from the standard AWS provider chain
    /// (environment, shared profile, container or instance metadata).
    /// `endpoint_url` overrides the DynamoDB endpoint, e.g. for DynamoDB Local.
    ///
    /// # Errors
    ///
    /// Returns an error if no region can be resolved.
    pub async fn init(endpoint_url: Option<&str>) -> Result<Self> {
        let config = aws_config::defaults(BehaviorVersion::latest()).load().await;

        let Some(region) = config.region() else {
            anyhow::bail!("no AWS region configured; set AWS_REGION or a profile region");
        };
        info!(region = %region, endpoint_override = endpoint_url.is_some(), "AWS config resolved");

        let mut builder = aws_sdk_dynamodb::config::Builder::from(&config);
        if let Some(url) = endpoint_url {
            builder = builder.endpoint_url(url);
        }
        let dynamodb = aws_sdk_dynamodb::Client::from_conf(builder.build());

        Ok(Self { dynamodb })
    }
}
