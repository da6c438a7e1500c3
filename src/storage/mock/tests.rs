use super::*;
use crate::interfaces::{IndexName, SkCondition};
use crate::keys::{GSI1_PK, GSI1_SK};

fn item(pk: &str, sk: &str) -> Item {
    Item::from([
        (PK.to_string(), AttrValue::s(pk)),
        (SK.to_string(), AttrValue::s(sk)),
    ])
}

fn gsi1_item(pk: &str, sk: &str, gsi_pk: &str, gsi_sk: &str) -> Item {
    let mut i = item(pk, sk);
    i.insert(GSI1_PK.to_string(), AttrValue::s(gsi_pk));
    i.insert(GSI1_SK.to_string(), AttrValue::s(gsi_sk));
    i
}

#[tokio::test]
async fn test_put_and_get() {
    let store = MockKeyStore::new();
    store.put(item("docs#1", "document")).await.unwrap();

    let found = store.get("docs#1", "document").await.unwrap();
    assert!(found.is_some());
    assert!(store.get("docs#2", "document").await.unwrap().is_none());
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_put_requires_key_attributes() {
    let store = MockKeyStore::new();
    let mut bad = Item::new();
    bad.insert(PK.to_string(), AttrValue::s("docs#1"));

    let result = store.put(bad).await;
    assert!(matches!(result, Err(StorageError::MissingAttribute(name)) if name == SK));
    assert_eq!(store.write_count(), 0);
}

#[tokio::test]
async fn test_put_if_absent_returns_winner() {
    let store = MockKeyStore::new();
    let mut first = item("global#folders#", "ff#a");
    first.insert("documentId".to_string(), AttrValue::s("winner"));
    let mut second = item("global#folders#", "ff#a");
    second.insert("documentId".to_string(), AttrValue::s("loser"));

    assert_eq!(store.put_if_absent(first).await.unwrap(), PutOutcome::Created);
    match store.put_if_absent(second).await.unwrap() {
        PutOutcome::Exists(existing) => {
            assert_eq!(item_str(&existing, "documentId"), Some("winner"));
        }
        PutOutcome::Created => panic!("second insert must lose"),
    }
    assert_eq!(store.write_count(), 1);
}

#[tokio::test]
async fn test_delete_reports_removal() {
    let store = MockKeyStore::new();
    store.put(item("a", "b")).await.unwrap();

    assert!(store.delete("a", "b").await.unwrap());
    assert!(!store.delete("a", "b").await.unwrap());
    assert!(store.is_empty().await);
}

#[tokio::test]
async fn test_update_values_merges() {
    let store = MockKeyStore::new();
    let mut original = item("docs#1", "document");
    original.insert("path".to_string(), AttrValue::s("a.txt"));
    original.insert("userId".to_string(), AttrValue::s("joe"));
    store.put(original).await.unwrap();

    let values = Item::from([("path".to_string(), AttrValue::s("b.txt"))]);
    store.update_values("docs#1", "document", values).await.unwrap();

    let updated = store.get("docs#1", "document").await.unwrap().unwrap();
    assert_eq!(item_str(&updated, "path"), Some("b.txt"));
    assert_eq!(item_str(&updated, "userId"), Some("joe"));
}

#[tokio::test]
async fn test_query_sort_key_conditions() {
    let store = MockKeyStore::new();
    for sk in ["ff#a", "ff#b", "fi#a.txt", "fi#b.txt"] {
        store.put(item("parent", sk)).await.unwrap();
    }
    store.put(item("other", "fi#c.txt")).await.unwrap();

    let files = store
        .query(QueryRequest::new("parent").sk(SkCondition::BeginsWith("fi#".to_string())))
        .await
        .unwrap();
    assert_eq!(files.items.len(), 2);
    assert!(files.last_key.is_none());

    let range = store
        .query(
            QueryRequest::new("parent")
                .sk(SkCondition::Between("ff#b".to_string(), "fi#a.txt".to_string())),
        )
        .await
        .unwrap();
    let sks: Vec<_> = range.items.iter().map(|i| item_str(i, SK).unwrap()).collect();
    assert_eq!(sks, vec!["ff#b", "fi#a.txt"]);

    let desc = store
        .query(QueryRequest::new("parent").descending().limit(1))
        .await
        .unwrap();
    assert_eq!(item_str(&desc.items[0], SK), Some("fi#b.txt"));
    assert!(desc.last_key.is_some());
}

#[tokio::test]
async fn test_gsi_query_is_sparse() {
    let store = MockKeyStore::new();
    store
        .put(gsi1_item("docs#1", "attr#k#v", "docs#attr#k", "v"))
        .await
        .unwrap();
    store.put(item("docs#2", "attr#k#v")).await.unwrap();

    let page = store
        .query(QueryRequest::new("docs#attr#k").index(IndexName::Gsi1))
        .await
        .unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(item_str(&page.items[0], PK), Some("docs#1"));
}

#[tokio::test]
async fn test_query_pages_resume_after_last_key() {
    let store = MockKeyStore::new();
    for n in 0..5 {
        store
            .put(gsi1_item(&format!("docs#{}", n), "attr#k#v", "docs#attr#k", "v"))
            .await
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut start_key = None;
    loop {
        let page = store
            .query(
                QueryRequest::new("docs#attr#k")
                    .index(IndexName::Gsi1)
                    .limit(2)
                    .start_key(start_key.take()),
            )
            .await
            .unwrap();
        seen.extend(page.items.iter().map(|i| item_str(i, PK).unwrap().to_string()));
        match page.last_key {
            Some(key) => {
                assert!(key.contains_key(GSI1_PK));
                assert!(key.contains_key(PK));
                start_key = Some(key);
            }
            None => break,
        }
    }

    assert_eq!(seen, vec!["docs#0", "docs#1", "docs#2", "docs#3", "docs#4"]);
}

#[tokio::test]
async fn test_batch_get_omits_missing() {
    let store = MockKeyStore::new();
    store.put(item("a", "1")).await.unwrap();
    store.put(item("b", "1")).await.unwrap();

    let found = store
        .batch_get(vec![
            ("a".to_string(), "1".to_string()),
            ("missing".to_string(), "1".to_string()),
            ("b".to_string(), "1".to_string()),
        ])
        .await
        .unwrap();
    assert_eq!(found.len(), 2);
}

#[tokio::test]
async fn test_fail_on_write() {
    let store = MockKeyStore::new();
    store.set_fail_on_write(true).await;

    assert!(matches!(
        store.put(item("a", "1")).await,
        Err(StorageError::Backend(_))
    ));
    assert_eq!(store.write_count(), 0);
}
