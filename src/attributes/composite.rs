//! Composite attribute key generation.
//!
//! A composite key over attributes `A1..An` turns a document's values into
//! one synthetic record per element of `values(A1) x ... x values(An)`, so a
//! single range query on the composite key answers an AND over all of them.

use std::collections::HashMap;

use chrono::Utc;
use tracing::debug;

use super::record::{format_number, AttributeValueType, DocumentAttributeRecord};
use super::schema::{CompositeKeySpec, Schema};
use crate::error::{IndexError, Result};
use crate::keys::COMPOSITE_KEY_DELIMITER;

/// Every combination taking one element from each group, in mixed-radix
/// order: the last group varies fastest.
///
/// Returns nothing when any group is empty.
pub fn cartesian_product<T: Clone>(groups: &[Vec<T>]) -> Vec<Vec<T>> {
    let total: usize = groups.iter().map(Vec::len).product();
    if groups.is_empty() || total == 0 {
        return Vec::new();
    }

    let mut strides = vec![1usize; groups.len()];
    for i in (0..groups.len() - 1).rev() {
        strides[i] = strides[i + 1] * groups[i + 1].len();
    }

    (0..total)
        .map(|row| {
            groups
                .iter()
                .zip(&strides)
                .map(|(group, stride)| group[(row / stride) % group.len()].clone())
                .collect()
        })
        .collect()
}

/// Composite records for every composite key of `schema`.
///
/// A composite key is skipped when the document has no value for one of its
/// attributes. Classification records never take part.
pub fn build_composite_records(
    schema: &Schema,
    document_id: &str,
    records: &[DocumentAttributeRecord],
) -> Result<Vec<DocumentAttributeRecord>> {
    let mut by_key: HashMap<&str, Vec<&DocumentAttributeRecord>> = HashMap::new();
    for record in records
        .iter()
        .filter(|r| r.value_type != AttributeValueType::Classification)
    {
        by_key.entry(record.key.as_str()).or_default().push(record);
    }

    let now = Utc::now();
    let mut composites = Vec::new();
    for spec in &schema.composite_keys {
        let Some(values) = composite_values(spec, &by_key)? else {
            debug!(
                document_id = %document_id,
                composite_key = %spec.key(),
                "Skipping composite key with missing attribute"
            );
            continue;
        };

        let key = spec.key();
        composites.extend(cartesian_product(&values).into_iter().map(|combination| {
            let mut record = DocumentAttributeRecord::composite(
                key.as_str(),
                document_id,
                combination.join(COMPOSITE_KEY_DELIMITER),
            );
            record.inserted_date = Some(now);
            record
        }));
    }

    Ok(composites)
}

/// Canonical values of each attribute of `spec`, in schema order, or `None`
/// when an attribute is absent.
fn composite_values(
    spec: &CompositeKeySpec,
    by_key: &HashMap<&str, Vec<&DocumentAttributeRecord>>,
) -> Result<Option<Vec<Vec<String>>>> {
    if spec.attribute_keys.is_empty() {
        return Ok(None);
    }

    let mut values = Vec::with_capacity(spec.attribute_keys.len());
    for attribute in &spec.attribute_keys {
        let Some(records) = by_key.get(attribute.as_str()) else {
            return Ok(None);
        };
        values.push(
            records
                .iter()
                .copied()
                .map(component_value)
                .collect::<Result<Vec<_>>>()?,
        );
    }
    Ok(Some(values))
}

fn component_value(record: &DocumentAttributeRecord) -> Result<String> {
    let mismatch = || IndexError::SchemaTypeMismatch {
        key: record.key.clone(),
        value_type: record.value_type.to_string(),
    };

    match record.value_type {
        AttributeValueType::String => record.string_value.clone().ok_or_else(mismatch),
        AttributeValueType::Number => record.number_value.map(format_number).ok_or_else(mismatch),
        _ => Err(mismatch()),
    }
}
