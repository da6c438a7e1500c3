//! DynamoDB key store integration tests using testcontainers.
//!
//! Run with: cargo test --test keystore_dynamo --features dynamo -- --nocapture
//!
//! Uses LocalStack to emulate DynamoDB locally.
//! Tests share a single LocalStack container to avoid rootless port conflicts.

#![cfg(feature = "dynamo")]

mod keystore;

use std::sync::Arc;
use std::time::Duration;

use aws_sdk_dynamodb::types::{
    AttributeDefinition, BillingMode, GlobalSecondaryIndex, KeySchemaElement, KeyType,
    Projection, ProjectionType, ScalarAttributeType,
};
use serial_test::serial;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};
use tokio::sync::OnceCell;

use docindex::config::DynamoConfig;
use docindex::folders::FolderIndexProcessor;
use docindex::keys::{GSI1, GSI1_PK, GSI1_SK, GSI2, GSI2_PK, GSI2_SK, PK, SK};
use docindex::storage::DynamoKeyStore;

/// Shared LocalStack container and endpoint URL.
static LOCALSTACK: OnceCell<(ContainerAsync<GenericImage>, String)> = OnceCell::const_new();

/// Get the shared LocalStack endpoint, starting the container if needed.
async fn get_localstack_endpoint() -> String {
    let (_, endpoint) = LOCALSTACK
        .get_or_init(|| async {
            println!("Starting shared LocalStack container...");
            let (container, endpoint) = start_localstack_internal().await;
            println!("LocalStack available at: {}", endpoint);
            (container, endpoint)
        })
        .await;
    endpoint.clone()
}

/// Start LocalStack with DynamoDB only.
async fn start_localstack_internal() -> (ContainerAsync<GenericImage>, String) {
    let image = GenericImage::new("localstack/localstack", "latest")
        .with_exposed_port(4566.tcp())
        .with_wait_for(WaitFor::message_on_stdout("Ready."));

    let container = image
        .with_env_var("SERVICES", "dynamodb")
        .with_env_var("AWS_DEFAULT_REGION", "us-east-1")
        .with_env_var("EAGER_SERVICE_LOADING", "1")
        .with_env_var("DISABLE_EVENTS", "1")
        .with_env_var("SKIP_INFRA_DOWNLOADS", "1")
        .with_startup_timeout(Duration::from_secs(180))
        .start()
        .await
        .expect("Failed to start localstack container");

    let host_port = container
        .get_host_port_ipv4(4566)
        .await
        .expect("Failed to get mapped port");

    let host = container
        .get_host()
        .await
        .expect("Failed to get container host");

    (container, format!("http://{}:{}", host, host_port))
}

fn set_test_credentials() {
    // Dummy AWS credentials for LocalStack
    std::env::set_var("AWS_ACCESS_KEY_ID", "test");
    std::env::set_var("AWS_SECRET_ACCESS_KEY", "test");
    std::env::set_var("AWS_DEFAULT_REGION", "us-east-1");
}

fn string_attribute(name: &str) -> AttributeDefinition {
    AttributeDefinition::builder()
        .attribute_name(name)
        .attribute_type(ScalarAttributeType::S)
        .build()
        .expect("valid attribute definition")
}

fn key_element(name: &str, key_type: KeyType) -> KeySchemaElement {
    KeySchemaElement::builder()
        .attribute_name(name)
        .key_type(key_type)
        .build()
        .expect("valid key schema element")
}

fn secondary_index(name: &str, pk: &str, sk: &str) -> GlobalSecondaryIndex {
    GlobalSecondaryIndex::builder()
        .index_name(name)
        .key_schema(key_element(pk, KeyType::Hash))
        .key_schema(key_element(sk, KeyType::Range))
        .projection(
            Projection::builder()
                .projection_type(ProjectionType::All)
                .build(),
        )
        .build()
        .expect("valid secondary index")
}

/// Create a fresh documents table and return a store over it.
async fn create_store(endpoint: &str) -> DynamoKeyStore {
    set_test_credentials();

    let config = DynamoConfig {
        table_name: format!("documents-{}", uuid::Uuid::new_v4().simple()),
        region: Some("us-east-1".to_string()),
        endpoint: Some(endpoint.to_string()),
        timeout_ms: Some(30_000),
    };

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new("us-east-1"))
        .endpoint_url(endpoint)
        .load()
        .await;
    let client = aws_sdk_dynamodb::Client::new(&sdk_config);

    client
        .create_table()
        .table_name(&config.table_name)
        .billing_mode(BillingMode::PayPerRequest)
        .attribute_definitions(string_attribute(PK))
        .attribute_definitions(string_attribute(SK))
        .attribute_definitions(string_attribute(GSI1_PK))
        .attribute_definitions(string_attribute(GSI1_SK))
        .attribute_definitions(string_attribute(GSI2_PK))
        .attribute_definitions(string_attribute(GSI2_SK))
        .key_schema(key_element(PK, KeyType::Hash))
        .key_schema(key_element(SK, KeyType::Range))
        .global_secondary_indexes(secondary_index(GSI1, GSI1_PK, GSI1_SK))
        .global_secondary_indexes(secondary_index(GSI2, GSI2_PK, GSI2_SK))
        .send()
        .await
        .expect("Failed to create table");

    DynamoKeyStore::new(&config)
        .await
        .expect("Failed to connect key store")
}

#[tokio::test]
#[serial]
async fn test_dynamo_keystore() {
    println!("=== DynamoDB KeyStore Tests ===");

    let endpoint = get_localstack_endpoint().await;
    let store = create_store(&endpoint).await;
    println!("Using table: {}", store.table_name());

    run_keystore_tests!(&store);

    println!("=== All DynamoDB KeyStore tests PASSED ===");
}

#[tokio::test]
#[serial]
async fn test_dynamo_concurrent_folder_creation() {
    let endpoint = get_localstack_endpoint().await;
    let store: Arc<DynamoKeyStore> = Arc::new(create_store(&endpoint).await);

    let first = FolderIndexProcessor::new(store.clone());
    let second = FolderIndexProcessor::new(store.clone());

    let (a, b) = tokio::join!(
        first.create_folders(Some("acme"), "shared/inner/", None),
        second.create_folders(Some("acme"), "shared/inner/", None),
    );
    let a = a.expect("first caller should succeed");
    let b = b.expect("second caller should succeed");

    let ids = |records: &[docindex::folders::FolderIndexRecord]| -> Vec<String> {
        records.iter().map(|r| r.document_id.clone()).collect()
    };
    assert_eq!(ids(&a), ids(&b), "both callers should see the same folders");
}
