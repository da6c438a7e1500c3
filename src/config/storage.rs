//! Storage configuration types.

use serde::Deserialize;

/// Storage type discriminator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageType {
    /// In-memory store. Nothing survives the process.
    #[default]
    Mock,
    /// Amazon DynamoDB (requires the `dynamo` feature).
    Dynamo,
}

impl std::fmt::Display for StorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageType::Mock => f.write_str("mock"),
            StorageType::Dynamo => f.write_str("dynamo"),
        }
    }
}

/// Storage configuration (discriminated union).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Storage type discriminator.
    #[serde(rename = "type")]
    pub storage_type: StorageType,
    /// DynamoDB-specific configuration.
    pub dynamo: DynamoConfig,
}

/// DynamoDB-specific configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DynamoConfig {
    /// Table holding every record. Must define `PK`/`SK` plus the `GSI1` and
    /// `GSI2` indexes.
    pub table_name: String,
    /// AWS region. Uses the SDK default chain when unset.
    pub region: Option<String>,
    /// Endpoint override (e.g. LocalStack).
    pub endpoint: Option<String>,
    /// Per-operation timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

impl Default for DynamoConfig {
    fn default() -> Self {
        Self {
            table_name: "documents".to_string(),
            region: None,
            endpoint: None,
            timeout_ms: None,
        }
    }
}
