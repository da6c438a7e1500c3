//! Search criteria composition.
//!
//! The store answers one range condition per query, so a filter over several
//! attributes is folded into one condition on the composite key that indexes
//! them together (see [`crate::attributes::build_composite_records`]).

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attributes::{
    attribute_index_partition, cartesian_product, format_number, CompositeKeySpec,
};
use crate::error::{IndexError, Result};
use crate::interfaces::{IndexName, QueryRequest, SkCondition};
use crate::keys::COMPOSITE_KEY_DELIMITER;

/// Interpretation of range bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RangeKind {
    #[default]
    String,
    Number,
}

/// Inclusive range over one attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: String,
    pub end: String,
    #[serde(default, rename = "type")]
    pub kind: RangeKind,
}

impl Range {
    pub fn new(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end: end.into(),
            kind: RangeKind::String,
        }
    }

    pub fn number(start: f64, end: f64) -> Self {
        Self {
            start: start.to_string(),
            end: end.to_string(),
            kind: RangeKind::Number,
        }
    }

    /// Bounds in index form. Numeric bounds that do not parse are kept as
    /// given.
    fn canonical(&self) -> (String, String) {
        let canonical = |bound: &str| match self.kind {
            RangeKind::Number => bound
                .trim()
                .parse::<f64>()
                .map(format_number)
                .unwrap_or_else(|_| bound.to_string()),
            RangeKind::String => bound.to_string(),
        };
        (canonical(&self.start), canonical(&self.end))
    }
}

/// Filter on one attribute. Values compare against the indexed form, so
/// numeric equality values must be given as [`format_number`] renders them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Criterion {
    Eq(String),
    EqOr(Vec<String>),
    BeginsWith(String),
    Range(Range),
}

impl Criterion {
    fn name(&self) -> &'static str {
        match self {
            Criterion::Eq(_) => "eq",
            Criterion::EqOr(_) => "eqOr",
            Criterion::BeginsWith(_) => "beginsWith",
            Criterion::Range(_) => "range",
        }
    }
}

/// A filter predicate on one attribute key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeCriteria {
    pub key: String,
    pub criterion: Criterion,
}

impl AttributeCriteria {
    pub fn eq(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(key, Criterion::Eq(value.into()))
    }

    pub fn eq_or<I, S>(key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(key, Criterion::EqOr(values.into_iter().map(Into::into).collect()))
    }

    pub fn begins_with(key: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self::new(key, Criterion::BeginsWith(prefix.into()))
    }

    pub fn range(key: impl Into<String>, range: Range) -> Self {
        Self::new(key, Criterion::Range(range))
    }

    fn new(key: impl Into<String>, criterion: Criterion) -> Self {
        Self {
            key: key.into(),
            criterion,
        }
    }
}

/// Condition on a composite value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompositeCondition {
    Eq(String),
    BeginsWith(String),
    Range { start: String, end: String },
    /// Sorted candidates; each needs its own query.
    EqOr(Vec<String>),
}

/// A single predicate over a composite key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeCriteria {
    pub key: String,
    pub condition: CompositeCondition,
}

impl CompositeCriteria {
    /// Number of range queries needed to answer this predicate.
    pub fn query_count(&self) -> usize {
        match &self.condition {
            CompositeCondition::EqOr(candidates) => candidates.len(),
            _ => 1,
        }
    }

    /// GSI1 queries over the composite key's value index.
    pub fn to_queries(&self, site: Option<&str>) -> Vec<QueryRequest> {
        let partition = attribute_index_partition(site, &self.key);
        let query = |condition: SkCondition| {
            QueryRequest::new(partition.clone())
                .index(IndexName::Gsi1)
                .sk(condition)
        };

        match &self.condition {
            CompositeCondition::Eq(value) => vec![query(SkCondition::Eq(value.clone()))],
            CompositeCondition::BeginsWith(prefix) => {
                vec![query(SkCondition::BeginsWith(prefix.clone()))]
            }
            CompositeCondition::Range { start, end } => {
                vec![query(SkCondition::Between(start.clone(), end.clone()))]
            }
            CompositeCondition::EqOr(candidates) => candidates
                .iter()
                .map(|value| query(SkCondition::Eq(value.clone())))
                .collect(),
        }
    }
}

/// Fold per-attribute filters into one predicate on a composite key.
///
/// Attribute order comes from `composite_key`, or from `predicates` when no
/// composite key is given. Precedence:
/// 1. a range or begins-with on the last attribute takes the equality values
///    of every earlier attribute as its prefix;
/// 2. otherwise any equals-any-of expands, with the plain equalities, into
///    the sorted set of candidate composite values;
/// 3. otherwise the equalities join into one composite value.
pub fn compose_search_criteria(
    composite_key: Option<&CompositeKeySpec>,
    predicates: &[AttributeCriteria],
) -> Result<CompositeCriteria> {
    if predicates.is_empty() {
        return Err(IndexError::invalid("at least one search attribute is required"));
    }

    let mut by_key: HashMap<&str, &Criterion> = HashMap::new();
    for predicate in predicates {
        if by_key
            .insert(predicate.key.as_str(), &predicate.criterion)
            .is_some()
        {
            return Err(IndexError::invalid(format!(
                "duplicate search attribute '{}'",
                predicate.key
            )));
        }
    }

    let order: Vec<&str> = match composite_key {
        Some(spec) => spec.attribute_keys.iter().map(String::as_str).collect(),
        None => predicates.iter().map(|p| p.key.as_str()).collect(),
    };
    if let Some(extra) = predicates
        .iter()
        .find(|p| !order.contains(&p.key.as_str()))
    {
        return Err(IndexError::invalid(format!(
            "attribute '{}' is not part of the composite key",
            extra.key
        )));
    }

    let Some((last, leading)) = order.split_last() else {
        return Err(IndexError::invalid("composite key has no attributes"));
    };
    let last_criterion = *by_key.get(last).ok_or_else(|| {
        IndexError::invalid(format!("composite key attribute '{}' has no filter", last))
    })?;

    let key = order.join(COMPOSITE_KEY_DELIMITER);
    let condition = match last_criterion {
        Criterion::BeginsWith(prefix) => {
            let eq = equality_prefix(leading, &by_key)?;
            CompositeCondition::BeginsWith(with_prefix(&eq, prefix))
        }
        Criterion::Range(range) => {
            let eq = equality_prefix(leading, &by_key)?;
            let (start, end) = range.canonical();
            CompositeCondition::Range {
                start: with_prefix(&eq, &start),
                end: with_prefix(&eq, &end),
            }
        }
        _ if by_key.values().any(|c| matches!(c, Criterion::EqOr(_))) => {
            CompositeCondition::EqOr(candidates(&order, &by_key)?)
        }
        _ => CompositeCondition::Eq(equality_prefix(&order, &by_key)?),
    };

    debug!(composite_key = %key, condition = ?condition, "Composed search criteria");
    Ok(CompositeCriteria { key, condition })
}

/// Equality values of `keys` joined with the composite delimiter.
fn equality_prefix(keys: &[&str], by_key: &HashMap<&str, &Criterion>) -> Result<String> {
    let values = keys
        .iter()
        .map(|key| match by_key.get(key) {
            Some(Criterion::Eq(value)) => Ok(value.as_str()),
            Some(other) => Err(IndexError::invalid(format!(
                "attribute '{}' must use eq before the last composite attribute, not {}",
                key,
                other.name()
            ))),
            None => Err(IndexError::invalid(format!(
                "composite key attribute '{}' has no filter",
                key
            ))),
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(values.join(COMPOSITE_KEY_DELIMITER))
}

fn with_prefix(prefix: &str, value: &str) -> String {
    if prefix.is_empty() {
        value.to_string()
    } else {
        format!("{}{}{}", prefix, COMPOSITE_KEY_DELIMITER, value)
    }
}

/// Sorted composite values covering every combination of the equality sets.
fn candidates(order: &[&str], by_key: &HashMap<&str, &Criterion>) -> Result<Vec<String>> {
    let groups = order
        .iter()
        .map(|key| match by_key.get(key) {
            Some(Criterion::Eq(value)) => Ok(vec![value.clone()]),
            Some(Criterion::EqOr(values)) if !values.is_empty() => Ok(values.clone()),
            Some(Criterion::EqOr(_)) => Err(IndexError::invalid(format!(
                "attribute '{}' has an empty eqOr",
                key
            ))),
            Some(other) => Err(IndexError::invalid(format!(
                "attribute '{}' cannot combine {} with eqOr",
                key,
                other.name()
            ))),
            None => Err(IndexError::invalid(format!(
                "composite key attribute '{}' has no filter",
                key
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    let unique: BTreeSet<String> = cartesian_product(&groups)
        .into_iter()
        .map(|row| row.join(COMPOSITE_KEY_DELIMITER))
        .collect();
    Ok(unique.into_iter().collect())
}
