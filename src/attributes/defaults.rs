//! Default values for required attributes a document does not carry.

use std::collections::HashSet;

use tracing::debug;

use super::catalog::{AttributeCatalog, AttributeDataType};
use super::record::DocumentAttributeRecord;
use super::schema::{RequiredAttribute, Schema};
use crate::error::{IndexError, Result};

/// Attribute records filling in the schema's required attributes that are
/// missing from `present`.
///
/// A required attribute contributes one record per default value, or a
/// single key-only record when the attribute is declared key-only. Required
/// attributes with neither are left for validation to report.
pub async fn build_required_defaults(
    schema: &Schema,
    catalog: &dyn AttributeCatalog,
    site: Option<&str>,
    document_id: &str,
    present: &HashSet<String>,
) -> Result<Vec<DocumentAttributeRecord>> {
    let missing: Vec<&RequiredAttribute> = schema
        .required
        .iter()
        .filter(|r| !present.contains(&r.attribute_key))
        .collect();
    if missing.is_empty() {
        return Ok(Vec::new());
    }

    let keys: Vec<String> = missing.iter().map(|r| r.attribute_key.clone()).collect();
    let definitions = catalog.definitions(site, &keys).await?;

    let mut records = Vec::new();
    for (required, definition) in missing.into_iter().zip(definitions) {
        let definition = definition.ok_or_else(|| {
            IndexError::not_found(format!("attribute '{}'", required.attribute_key))
        })?;

        let defaults = required.defaults();
        if definition.data_type == AttributeDataType::KeyOnly {
            records.push(DocumentAttributeRecord::key_only(
                &required.attribute_key,
                document_id,
            ));
            continue;
        }
        if defaults.is_empty() {
            debug!(
                site = ?site,
                attribute = %required.attribute_key,
                "Required attribute has no default"
            );
            continue;
        }

        for value in defaults {
            records.push(default_record(
                &required.attribute_key,
                document_id,
                definition.data_type,
                value,
            )?);
        }
    }

    Ok(records)
}

fn default_record(
    key: &str,
    document_id: &str,
    data_type: AttributeDataType,
    value: &str,
) -> Result<DocumentAttributeRecord> {
    Ok(match data_type {
        AttributeDataType::String => DocumentAttributeRecord::string(key, document_id, value),
        AttributeDataType::Number => {
            let number = value.trim().parse::<f64>().map_err(|_| {
                IndexError::invalid(format!(
                    "default '{}' of attribute '{}' is not a number",
                    value, key
                ))
            })?;
            DocumentAttributeRecord::number(key, document_id, number)
        }
        AttributeDataType::Boolean => {
            DocumentAttributeRecord::boolean(key, document_id, value.eq_ignore_ascii_case("true"))
        }
        AttributeDataType::KeyOnly => DocumentAttributeRecord::key_only(key, document_id),
    })
}
