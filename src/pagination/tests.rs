use super::*;
use crate::keys::{GSI1_PK, GSI1_SK, PK, SK};

fn gsi1_key() -> Item {
    let mut key = Item::new();
    key.insert(PK.to_string(), AttrValue::s("acme/docs#doc1"));
    key.insert(SK.to_string(), AttrValue::s("attr#category#invoice"));
    key.insert(GSI1_PK.to_string(), AttrValue::s("acme/docs#attr#category"));
    key.insert(GSI1_SK.to_string(), AttrValue::s("invoice"));
    key
}

#[test]
fn test_empty_key_has_no_token() {
    assert!(encode_token(None).unwrap().is_none());
    assert!(encode_token(Some(&Item::new())).unwrap().is_none());
}

#[test]
fn test_token_preserves_index_attribute_names() {
    let key = gsi1_key();
    let token = encode_token(Some(&key)).unwrap().unwrap();
    let decoded = decode_token(&token).unwrap();
    assert_eq!(decoded, key);
}

#[test]
fn test_token_preserves_typed_values() {
    let mut key = Item::new();
    key.insert("PK".to_string(), AttrValue::s("docs#1"));
    key.insert("version".to_string(), AttrValue::N("42".to_string()));
    key.insert("flag".to_string(), AttrValue::Bool(true));

    let token = encode_token(Some(&key)).unwrap().unwrap();
    assert_eq!(decode_token(&token).unwrap(), key);
}

#[test]
fn test_token_is_deterministic_and_url_safe() {
    let a = encode_token(Some(&gsi1_key())).unwrap().unwrap();
    let b = encode_token(Some(&gsi1_key())).unwrap().unwrap();
    assert_eq!(a, b);
    assert!(a
        .as_str()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
}

#[test]
fn test_garbage_token_is_rejected() {
    let result = decode_token(&PaginationToken::new("not base64 !!"));
    assert!(matches!(result, Err(IndexError::InvalidToken(_))));

    let not_json = PaginationToken::new(URL_SAFE_NO_PAD.encode(b"hello"));
    assert!(matches!(
        decode_token(&not_json),
        Err(IndexError::InvalidToken(_))
    ));

    let empty = PaginationToken::new(URL_SAFE_NO_PAD.encode(b"{}"));
    assert!(matches!(decode_token(&empty), Err(IndexError::InvalidToken(_))));
}

#[test]
fn test_decode_optional() {
    assert!(decode_optional(None).unwrap().is_none());
    let token = encode_token(Some(&gsi1_key())).unwrap().unwrap();
    assert_eq!(decode_optional(Some(&token)).unwrap(), Some(gsi1_key()));
}
