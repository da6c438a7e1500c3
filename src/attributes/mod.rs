//! Document attributes: record addressing, schemas, and the records derived
//! from them before an attribute save.

mod catalog;
mod composite;
mod defaults;
mod record;
mod schema;

pub use catalog::{
    AttributeCatalog, AttributeDataType, AttributeDefinition, KeyStoreAttributeCatalog,
};
pub use composite::{build_composite_records, cartesian_product};
pub use defaults::build_required_defaults;
pub use record::{
    attribute_index_partition, format_number, AttributeValueType, DocumentAttributeRecord,
    KEY_ONLY_MARKER,
};
pub use schema::{CompositeKeySpec, RequiredAttribute, Schema};
