//! Filter expression tree
//!
//! A filter is either a single condition or a group of child nodes joined by
//! AND/OR. The tree is plain data; the builder functions below return new
//! trees and never mutate their input.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::QueryError;
use super::operators::{Operator, check_value};
use super::search::QueryLimits;
use crate::domain::entity::EntityDescriptor;

/// A single JSON scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::Bool(b)
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::Number(n.into())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(b) => write!(f, "{}", b),
            Scalar::Number(n) => write!(f, "{}", n),
            Scalar::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Unit of a relative date window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelativeUnit {
    Days,
    Weeks,
    Months,
    Years,
}

impl RelativeUnit {
    pub const fn as_str(&self) -> &'static str {
        match self {
            RelativeUnit::Days => "days",
            RelativeUnit::Weeks => "weeks",
            RelativeUnit::Months => "months",
            RelativeUnit::Years => "years",
        }
    }
}

/// Raw value of a condition, interpreted per operator arity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Scalar(Scalar),
    List(Vec<Scalar>),
    Range { from: Scalar, to: Scalar },
    Relative { unit: RelativeUnit, value: u32 },
}

impl From<Scalar> for FilterValue {
    fn from(s: Scalar) -> Self {
        FilterValue::Scalar(s)
    }
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Scalar(s.into())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Scalar(s.into())
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Scalar(b.into())
    }
}

impl From<i64> for FilterValue {
    fn from(n: i64) -> Self {
        FilterValue::Scalar(n.into())
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Scalar(s) => write!(f, "{}", s),
            FilterValue::List(items) => {
                let items: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", items.join(", "))
            }
            FilterValue::Range { from, to } => write!(f, "{} and {}", from, to),
            FilterValue::Relative { unit, value } => write!(f, "{} {}", value, unit.as_str()),
        }
    }
}

/// Leaf of the tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterCondition {
    pub field: String,
    pub operator: Operator,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<FilterValue>,
}

impl FilterCondition {
    pub fn new(field: impl Into<String>, operator: Operator, value: Option<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

impl fmt::Display for FilterCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.operator.symbol())?;
        if let Some(value) = &self.value {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    And,
    Or,
}

impl Combinator {
    pub const fn sql(&self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Node of the filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FilterNode {
    Condition(FilterCondition),
    Group {
        combinator: Combinator,
        children: Vec<FilterNode>,
    },
}

impl FilterNode {
    pub fn condition(
        field: impl Into<String>,
        operator: Operator,
        value: Option<FilterValue>,
    ) -> Self {
        FilterNode::Condition(FilterCondition::new(field, operator, value))
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            combinator: Combinator::And,
            children,
        }
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Group {
            combinator: Combinator::Or,
            children,
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterNode::Condition(c) => write!(f, "{}", c),
            FilterNode::Group {
                combinator,
                children,
            } => {
                let parts: Vec<String> = children.iter().map(ToString::to_string).collect();
                let sep = format!(" {} ", combinator.sql());
                write!(f, "({})", parts.join(&sep))
            }
        }
    }
}

/// Add a condition to the tree
///
/// An empty tree becomes the condition, a lone condition is paired with the
/// new one under AND, and a group gains a child under its own combinator.
pub fn add_condition(filter: Option<FilterNode>, condition: FilterCondition) -> FilterNode {
    match filter {
        None => FilterNode::Condition(condition),
        Some(existing @ FilterNode::Condition(_)) => {
            FilterNode::and(vec![existing, FilterNode::Condition(condition)])
        }
        Some(FilterNode::Group {
            combinator,
            mut children,
        }) => {
            children.push(FilterNode::Condition(condition));
            FilterNode::Group {
                combinator,
                children,
            }
        }
    }
}

/// Remove every condition on `field`
///
/// Groups left empty disappear and groups left with one child collapse into
/// it. Returns `None` when nothing remains.
pub fn remove_condition(filter: Option<FilterNode>, field: &str) -> Option<FilterNode> {
    match filter? {
        FilterNode::Condition(c) if c.field == field => None,
        node @ FilterNode::Condition(_) => Some(node),
        FilterNode::Group {
            combinator,
            children,
        } => {
            let mut remaining: Vec<FilterNode> = children
                .into_iter()
                .filter_map(|child| remove_condition(Some(child), field))
                .collect();
            match remaining.len() {
                0 => None,
                1 => remaining.pop(),
                _ => Some(FilterNode::Group {
                    combinator,
                    children: remaining,
                }),
            }
        }
    }
}

/// Replace any conditions on `field` with a single new one
pub fn set_condition(
    filter: Option<FilterNode>,
    field: &str,
    operator: Operator,
    value: Option<FilterValue>,
) -> FilterNode {
    let remaining = remove_condition(filter, field);
    add_condition(remaining, FilterCondition::new(field, operator, value))
}

/// AND a new group of conditions onto the tree
pub fn add_group(
    filter: Option<FilterNode>,
    combinator: Combinator,
    conditions: Vec<FilterCondition>,
) -> FilterNode {
    let group = FilterNode::Group {
        combinator,
        children: conditions.into_iter().map(FilterNode::Condition).collect(),
    };
    match filter {
        None => group,
        Some(existing) => FilterNode::and(vec![existing, group]),
    }
}

/// Nest the whole tree one level deeper under `combinator`
pub fn wrap_in_group(filter: Option<FilterNode>, combinator: Combinator) -> Option<FilterNode> {
    filter.map(|node| FilterNode::Group {
        combinator,
        children: vec![node],
    })
}

/// Leaf conditions in pre-order
pub fn flatten(node: &FilterNode) -> Vec<&FilterCondition> {
    let mut out = Vec::new();
    collect_conditions(node, &mut out);
    out
}

fn collect_conditions<'a>(node: &'a FilterNode, out: &mut Vec<&'a FilterCondition>) {
    match node {
        FilterNode::Condition(c) => out.push(c),
        FilterNode::Group { children, .. } => {
            for child in children {
                collect_conditions(child, out);
            }
        }
    }
}

pub fn count_conditions(node: &FilterNode) -> usize {
    match node {
        FilterNode::Condition(_) => 1,
        FilterNode::Group { children, .. } => children.iter().map(count_conditions).sum(),
    }
}

/// Distinct field names referenced anywhere in the tree
pub fn used_fields(node: &FilterNode) -> BTreeSet<&str> {
    flatten(node).into_iter().map(|c| c.field.as_str()).collect()
}

/// Nesting depth: a lone condition is 1, each group adds a level
pub fn depth(node: &FilterNode) -> usize {
    match node {
        FilterNode::Condition(_) => 1,
        FilterNode::Group { children, .. } => {
            1 + children.iter().map(depth).max().unwrap_or(0)
        }
    }
}

/// Check the tree against the entity and limits
///
/// Verifies size bounds first, then every condition's field, operator and
/// value. Empty groups are legal here.
pub fn validate(
    node: &FilterNode,
    descriptor: &EntityDescriptor,
    limits: &QueryLimits,
) -> Result<(), QueryError> {
    let tree_depth = depth(node);
    if tree_depth > limits.max_depth {
        return Err(QueryError::MalformedQuery(format!(
            "filter depth {} exceeds maximum of {}",
            tree_depth, limits.max_depth
        )));
    }
    let count = count_conditions(node);
    if count > limits.max_conditions {
        return Err(QueryError::MalformedQuery(format!(
            "filter has {} conditions, maximum is {}",
            count, limits.max_conditions
        )));
    }

    for condition in flatten(node) {
        validate_condition(condition, descriptor)?;
    }
    Ok(())
}

pub(crate) fn validate_condition(
    condition: &FilterCondition,
    descriptor: &EntityDescriptor,
) -> Result<(), QueryError> {
    let field = descriptor.field(&condition.field).ok_or_else(|| {
        QueryError::invalid_field(
            &condition.field,
            format!("not a field of '{}'", descriptor.name()),
        )
    })?;
    if !field.filterable {
        return Err(QueryError::invalid_field(&condition.field, "not filterable"));
    }
    check_value(field, condition.operator, condition.value.as_ref())?;
    Ok(())
}
