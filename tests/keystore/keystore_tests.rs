//! KeyStore interface tests.
//!
//! These tests verify the contract of the KeyStore trait. Every test works in
//! its own partitions so implementations backed by a shared table can run
//! them side by side.

use std::collections::{HashMap, HashSet};

use uuid::Uuid;

use docindex::interfaces::{
    item_str, AttrValue, IndexName, Item, KeyStore, PutOutcome, QueryRequest, SkCondition,
};
use docindex::keys::{GSI1_PK, GSI1_SK, PK, SK};

/// A partition key no other test uses.
pub fn unique_pk(name: &str) -> String {
    format!("test#{}#{}", name, Uuid::new_v4())
}

/// Create an item with the given primary key and extra string attributes.
pub fn make_item(pk: &str, sk: &str, attributes: &[(&str, &str)]) -> Item {
    let mut item = Item::new();
    item.insert(PK.to_string(), AttrValue::s(pk));
    item.insert(SK.to_string(), AttrValue::s(sk));
    for (name, value) in attributes {
        item.insert(name.to_string(), AttrValue::s(*value));
    }
    item
}

fn sort_keys(items: &[Item]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item_str(item, SK).map(str::to_string))
        .collect()
}

/// Run a query to exhaustion, returning every item and the number of pages.
pub async fn drain_query<S: KeyStore + ?Sized>(
    store: &S,
    request: QueryRequest,
) -> (Vec<Item>, usize) {
    let mut items = Vec::new();
    let mut pages = 0;
    let mut start_key = None;
    loop {
        let page = store
            .query(request.clone().start_key(start_key))
            .await
            .expect("query should succeed");
        if !page.items.is_empty() {
            pages += 1;
        }
        items.extend(page.items);
        match page.last_key {
            Some(key) => start_key = Some(key),
            None => return (items, pages),
        }
    }
}

// =============================================================================
// Point reads and writes
// =============================================================================

pub async fn test_put_and_get<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("put_get");
    let mut item = make_item(&pk, "a", &[("name", "alpha")]);
    item.insert("count".to_string(), AttrValue::N("42".to_string()));
    item.insert("flag".to_string(), AttrValue::Bool(true));
    item.insert(
        "list".to_string(),
        AttrValue::L(vec![AttrValue::s("x"), AttrValue::s("y")]),
    );

    store.put(item.clone()).await.expect("put should succeed");

    let stored = store
        .get(&pk, "a")
        .await
        .expect("get should succeed")
        .expect("item should exist");
    assert_eq!(stored, item);
}

pub async fn test_get_missing<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("get_missing");
    let stored = store.get(&pk, "nothing").await.expect("get should succeed");
    assert!(stored.is_none(), "missing item should be None");
}

pub async fn test_put_replaces<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("put_replaces");
    store
        .put(make_item(&pk, "a", &[("old", "1")]))
        .await
        .expect("put should succeed");
    store
        .put(make_item(&pk, "a", &[("new", "2")]))
        .await
        .expect("put should succeed");

    let stored = store.get(&pk, "a").await.unwrap().unwrap();
    assert_eq!(item_str(&stored, "new"), Some("2"));
    assert!(!stored.contains_key("old"), "put should replace, not merge");
}

pub async fn test_put_if_absent<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("put_if_absent");
    let first = make_item(&pk, "a", &[("owner", "first")]);
    let second = make_item(&pk, "a", &[("owner", "second")]);

    let outcome = store.put_if_absent(first.clone()).await.unwrap();
    assert_eq!(outcome, PutOutcome::Created);

    match store.put_if_absent(second).await.unwrap() {
        PutOutcome::Exists(winner) => {
            assert_eq!(item_str(&winner, "owner"), Some("first"));
        }
        PutOutcome::Created => panic!("second create should see the first item"),
    }

    let stored = store.get(&pk, "a").await.unwrap().unwrap();
    assert_eq!(stored, first);
}

pub async fn test_delete<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("delete");
    store.put(make_item(&pk, "a", &[])).await.unwrap();

    assert!(store.delete(&pk, "a").await.unwrap(), "first delete removes");
    assert!(!store.delete(&pk, "a").await.unwrap(), "second delete is a no-op");
    assert!(store.get(&pk, "a").await.unwrap().is_none());
}

pub async fn test_update_values<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("update");
    store
        .put(make_item(&pk, "a", &[("keep", "1"), ("change", "old")]))
        .await
        .unwrap();

    let values = Item::from([("change".to_string(), AttrValue::s("new"))]);
    store.update_values(&pk, "a", values).await.unwrap();

    let stored = store.get(&pk, "a").await.unwrap().unwrap();
    assert_eq!(item_str(&stored, "keep"), Some("1"));
    assert_eq!(item_str(&stored, "change"), Some("new"));

    let values = Item::from([("fresh".to_string(), AttrValue::s("yes"))]);
    store.update_values(&pk, "b", values).await.unwrap();
    let created = store.get(&pk, "b").await.unwrap().unwrap();
    assert_eq!(item_str(&created, "fresh"), Some("yes"));
}

pub async fn test_put_items_in_chunks<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("put_items");
    let items: Vec<Item> = (0..60)
        .map(|i| make_item(&pk, &format!("{:03}", i), &[]))
        .collect();

    store.put_items(items).await.expect("put_items should succeed");

    let (stored, _) = drain_query(store, QueryRequest::new(&pk)).await;
    assert_eq!(stored.len(), 60);
}

// =============================================================================
// Queries
// =============================================================================

async fn seed_sort_keys<S: KeyStore + ?Sized>(store: &S, pk: &str) {
    let items = ["fi#b.txt", "fi#a.txt", "ff#docs", "ff#archive"]
        .iter()
        .map(|sk| make_item(pk, sk, &[]))
        .collect();
    store.put_items(items).await.unwrap();
}

pub async fn test_query_sort_key_conditions<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("query_conditions");
    seed_sort_keys(store, &pk).await;

    let all = store.query(QueryRequest::new(&pk)).await.unwrap();
    assert_eq!(
        sort_keys(&all.items),
        vec!["ff#archive", "ff#docs", "fi#a.txt", "fi#b.txt"]
    );

    let files = store
        .query(QueryRequest::new(&pk).sk(SkCondition::BeginsWith("fi#".to_string())))
        .await
        .unwrap();
    assert_eq!(sort_keys(&files.items), vec!["fi#a.txt", "fi#b.txt"]);

    let between = store
        .query(QueryRequest::new(&pk).sk(SkCondition::Between(
            "ff#b".to_string(),
            "fi#a.txt".to_string(),
        )))
        .await
        .unwrap();
    assert_eq!(sort_keys(&between.items), vec!["ff#docs", "fi#a.txt"]);

    let exact = store
        .query(QueryRequest::new(&pk).sk(SkCondition::Eq("ff#docs".to_string())))
        .await
        .unwrap();
    assert_eq!(sort_keys(&exact.items), vec!["ff#docs"]);
}

pub async fn test_query_descending<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("query_descending");
    seed_sort_keys(store, &pk).await;

    let page = store
        .query(QueryRequest::new(&pk).descending().limit(2))
        .await
        .unwrap();
    assert_eq!(sort_keys(&page.items), vec!["fi#b.txt", "fi#a.txt"]);
}

pub async fn test_query_secondary_index_is_sparse<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("gsi_sparse");
    let gsi_pk = unique_pk("gsi_sparse_index");
    let items = vec![
        make_item(&pk, "indexed-2", &[(GSI1_PK, gsi_pk.as_str()), (GSI1_SK, "2")]),
        make_item(&pk, "plain", &[]),
        make_item(&pk, "indexed-1", &[(GSI1_PK, gsi_pk.as_str()), (GSI1_SK, "1")]),
    ];
    store.put_items(items).await.unwrap();

    let (found, _) = drain_query(store, QueryRequest::new(&gsi_pk).index(IndexName::Gsi1)).await;
    assert_eq!(sort_keys(&found), vec!["indexed-1", "indexed-2"]);
}

pub async fn test_query_pages_resume<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("query_pages");
    let items = (0..5).map(|i| make_item(&pk, &format!("k{}", i), &[])).collect();
    store.put_items(items).await.unwrap();

    let first = store.query(QueryRequest::new(&pk).limit(2)).await.unwrap();
    assert_eq!(sort_keys(&first.items), vec!["k0", "k1"]);
    let resume = first.last_key.expect("first page should have a resume key");

    let second = store
        .query(QueryRequest::new(&pk).limit(2).start_key(Some(resume)))
        .await
        .unwrap();
    assert_eq!(sort_keys(&second.items), vec!["k2", "k3"]);

    let (all, pages) = drain_query(store, QueryRequest::new(&pk).limit(2)).await;
    assert_eq!(sort_keys(&all), vec!["k0", "k1", "k2", "k3", "k4"]);
    assert_eq!(pages, 3);
}

// =============================================================================
// Batch reads
// =============================================================================

pub async fn test_batch_get<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("batch_get");
    let items = (0..3)
        .map(|i| {
            let n = i.to_string();
            make_item(&pk, &format!("k{}", i), &[("n", n.as_str())])
        })
        .collect();
    store.put_items(items).await.unwrap();

    let keys = vec![
        (pk.clone(), "k2".to_string()),
        (pk.clone(), "missing".to_string()),
        (pk.clone(), "k0".to_string()),
        (pk.clone(), "k2".to_string()),
    ];
    let found = store.batch_get(keys).await.expect("batch_get should succeed");

    let by_sk: HashMap<String, Item> = found
        .into_iter()
        .map(|item| (item_str(&item, SK).unwrap_or_default().to_string(), item))
        .collect();
    let returned: HashSet<&str> = by_sk.keys().map(String::as_str).collect();
    assert_eq!(returned, HashSet::from(["k0", "k2"]));
    assert_eq!(item_str(&by_sk["k2"], "n"), Some("2"));
}

pub async fn test_batch_get_many<S: KeyStore + ?Sized>(store: &S) {
    let pk = unique_pk("batch_get_many");
    let items: Vec<Item> = (0..150)
        .map(|i| make_item(&pk, &format!("{:03}", i), &[]))
        .collect();
    store.put_items(items).await.unwrap();

    let keys = (0..150)
        .map(|i| (pk.clone(), format!("{:03}", i)))
        .collect();
    let found = store.batch_get(keys).await.unwrap();
    assert_eq!(found.len(), 150);

    assert!(store.batch_get(Vec::new()).await.unwrap().is_empty());
}

// =============================================================================
// Test runner macro
// =============================================================================

/// Run all KeyStore interface tests against a store implementation.
#[macro_export]
macro_rules! run_keystore_tests {
    ($store:expr) => {
        use $crate::keystore::keystore_tests::*;

        test_put_and_get($store).await;
        println!("  test_put_and_get: PASSED");

        test_get_missing($store).await;
        println!("  test_get_missing: PASSED");

        test_put_replaces($store).await;
        println!("  test_put_replaces: PASSED");

        test_put_if_absent($store).await;
        println!("  test_put_if_absent: PASSED");

        test_delete($store).await;
        println!("  test_delete: PASSED");

        test_update_values($store).await;
        println!("  test_update_values: PASSED");

        test_put_items_in_chunks($store).await;
        println!("  test_put_items_in_chunks: PASSED");

        test_query_sort_key_conditions($store).await;
        println!("  test_query_sort_key_conditions: PASSED");

        test_query_descending($store).await;
        println!("  test_query_descending: PASSED");

        test_query_secondary_index_is_sparse($store).await;
        println!("  test_query_secondary_index_is_sparse: PASSED");

        test_query_pages_resume($store).await;
        println!("  test_query_pages_resume: PASSED");

        test_batch_get($store).await;
        println!("  test_batch_get: PASSED");

        test_batch_get_many($store).await;
        println!("  test_batch_get_many: PASSED");
    };
}
