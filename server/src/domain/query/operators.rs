//! Operator registry
//!
//! Static whitelist of which operators apply to which field variant, how many
//! values each takes, and the value coercion applied before compilation.
//! Anything not listed here never reaches the compiler.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::QueryError;
use super::filter::{FilterValue, RelativeUnit, Scalar};
use crate::core::constants::MAX_LIST_VALUES;
use crate::domain::entity::{FieldDescriptor, FieldVariant};
use crate::utils::time::{millis_to_datetime, parse_timestamp};

/// Comparison applied by a filter condition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum Operator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsEmpty,
    IsNotEmpty,
    Before,
    After,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Between,
    RelativeToToday,
}

/// Number of values an operator consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Arity {
    None,
    One,
    Two,
    List,
}

impl Operator {
    pub const ALL: [Operator; 18] = [
        Operator::Equals,
        Operator::NotEquals,
        Operator::Contains,
        Operator::NotContains,
        Operator::StartsWith,
        Operator::EndsWith,
        Operator::In,
        Operator::NotIn,
        Operator::IsEmpty,
        Operator::IsNotEmpty,
        Operator::Before,
        Operator::After,
        Operator::GreaterThan,
        Operator::GreaterThanOrEqual,
        Operator::LessThan,
        Operator::LessThanOrEqual,
        Operator::Between,
        Operator::RelativeToToday,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Operator::Equals => "equals",
            Operator::NotEquals => "notEquals",
            Operator::Contains => "contains",
            Operator::NotContains => "notContains",
            Operator::StartsWith => "startsWith",
            Operator::EndsWith => "endsWith",
            Operator::In => "in",
            Operator::NotIn => "notIn",
            Operator::IsEmpty => "isEmpty",
            Operator::IsNotEmpty => "isNotEmpty",
            Operator::Before => "before",
            Operator::After => "after",
            Operator::GreaterThan => "greaterThan",
            Operator::GreaterThanOrEqual => "greaterThanOrEqual",
            Operator::LessThan => "lessThan",
            Operator::LessThanOrEqual => "lessThanOrEqual",
            Operator::Between => "between",
            Operator::RelativeToToday => "relativeToToday",
        }
    }

    pub const fn arity(&self) -> Arity {
        match self {
            Operator::IsEmpty | Operator::IsNotEmpty => Arity::None,
            Operator::Between => Arity::Two,
            Operator::In | Operator::NotIn => Arity::List,
            _ => Arity::One,
        }
    }

    /// Human label shown by filter builders
    pub const fn label(&self) -> &'static str {
        match self {
            Operator::Equals => "is",
            Operator::NotEquals => "is not",
            Operator::Contains => "contains",
            Operator::NotContains => "does not contain",
            Operator::StartsWith => "starts with",
            Operator::EndsWith => "ends with",
            Operator::In => "is any of",
            Operator::NotIn => "is none of",
            Operator::IsEmpty => "is empty",
            Operator::IsNotEmpty => "is not empty",
            Operator::Before => "is before",
            Operator::After => "is after",
            Operator::GreaterThan => "is greater than",
            Operator::GreaterThanOrEqual => "is at least",
            Operator::LessThan => "is less than",
            Operator::LessThanOrEqual => "is at most",
            Operator::Between => "is between",
            Operator::RelativeToToday => "is within the last",
        }
    }

    /// Short form used when rendering a filter tree
    pub const fn symbol(&self) -> &'static str {
        match self {
            Operator::GreaterThan => ">",
            Operator::GreaterThanOrEqual => ">=",
            Operator::LessThan => "<",
            Operator::LessThanOrEqual => "<=",
            _ => self.as_str(),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Operator::ALL
            .iter()
            .find(|op| op.as_str() == s)
            .copied()
            .ok_or_else(|| format!("unknown operator '{}'", s))
    }
}

/// One registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OperatorSpec {
    pub operator: Operator,
    pub arity: Arity,
    pub label: &'static str,
}

impl OperatorSpec {
    const fn of(operator: Operator) -> Self {
        Self {
            operator,
            arity: operator.arity(),
            label: operator.label(),
        }
    }
}

use Operator as Op;

static TEXT_OPS: [OperatorSpec; 10] = [
    OperatorSpec::of(Op::Equals),
    OperatorSpec::of(Op::NotEquals),
    OperatorSpec::of(Op::Contains),
    OperatorSpec::of(Op::NotContains),
    OperatorSpec::of(Op::StartsWith),
    OperatorSpec::of(Op::EndsWith),
    OperatorSpec::of(Op::In),
    OperatorSpec::of(Op::NotIn),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static NUMBER_OPS: [OperatorSpec; 11] = [
    OperatorSpec::of(Op::Equals),
    OperatorSpec::of(Op::NotEquals),
    OperatorSpec::of(Op::GreaterThan),
    OperatorSpec::of(Op::GreaterThanOrEqual),
    OperatorSpec::of(Op::LessThan),
    OperatorSpec::of(Op::LessThanOrEqual),
    OperatorSpec::of(Op::Between),
    OperatorSpec::of(Op::In),
    OperatorSpec::of(Op::NotIn),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static RANGE_OPS: [OperatorSpec; 8] = [
    OperatorSpec::of(Op::Between),
    OperatorSpec::of(Op::Equals),
    OperatorSpec::of(Op::GreaterThan),
    OperatorSpec::of(Op::GreaterThanOrEqual),
    OperatorSpec::of(Op::LessThan),
    OperatorSpec::of(Op::LessThanOrEqual),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static BOOLEAN_OPS: [OperatorSpec; 4] = [
    OperatorSpec::of(Op::Equals),
    OperatorSpec::of(Op::NotEquals),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static DATE_OPS: [OperatorSpec; 7] = [
    OperatorSpec::of(Op::Equals),
    OperatorSpec::of(Op::Before),
    OperatorSpec::of(Op::After),
    OperatorSpec::of(Op::Between),
    OperatorSpec::of(Op::RelativeToToday),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static DATE_RANGE_OPS: [OperatorSpec; 5] = [
    OperatorSpec::of(Op::Before),
    OperatorSpec::of(Op::After),
    OperatorSpec::of(Op::Between),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static SELECT_OPS: [OperatorSpec; 6] = [
    OperatorSpec::of(Op::Equals),
    OperatorSpec::of(Op::NotEquals),
    OperatorSpec::of(Op::In),
    OperatorSpec::of(Op::NotIn),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

static MULTI_SELECT_OPS: [OperatorSpec; 4] = [
    OperatorSpec::of(Op::In),
    OperatorSpec::of(Op::NotIn),
    OperatorSpec::of(Op::IsEmpty),
    OperatorSpec::of(Op::IsNotEmpty),
];

/// Operators registered for a variant, in display order
pub fn operators_for(variant: FieldVariant) -> &'static [OperatorSpec] {
    match variant {
        FieldVariant::Text => &TEXT_OPS,
        FieldVariant::Number => &NUMBER_OPS,
        FieldVariant::Range => &RANGE_OPS,
        FieldVariant::Boolean => &BOOLEAN_OPS,
        FieldVariant::Date => &DATE_OPS,
        FieldVariant::DateRange => &DATE_RANGE_OPS,
        FieldVariant::Select => &SELECT_OPS,
        FieldVariant::MultiSelect => &MULTI_SELECT_OPS,
    }
}

/// Operator a filter builder preselects for a new condition
pub fn default_operator_for(variant: FieldVariant) -> Operator {
    match variant {
        FieldVariant::Text => Op::Contains,
        FieldVariant::Number | FieldVariant::Boolean | FieldVariant::Select => Op::Equals,
        FieldVariant::Range | FieldVariant::DateRange => Op::Between,
        FieldVariant::Date => Op::After,
        FieldVariant::MultiSelect => Op::In,
    }
}

pub fn lookup(variant: FieldVariant, operator: Operator) -> Option<&'static OperatorSpec> {
    operators_for(variant)
        .iter()
        .find(|spec| spec.operator == operator)
}

pub fn is_allowed(variant: FieldVariant, operator: Operator) -> bool {
    lookup(variant, operator).is_some()
}

/// A filter value after coercion to the field's type
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    None,
    Text(String),
    Number(f64),
    Bool(bool),
    Date(DateTime<Utc>),
    TextList(Vec<String>),
    NumberList(Vec<f64>),
    NumberRange(f64, f64),
    DateRange(DateTime<Utc>, DateTime<Utc>),
    Relative { unit: RelativeUnit, value: u32 },
}

/// Check that `operator` applies to `field` and coerce `value` to typed operands
pub fn check_value(
    field: &FieldDescriptor,
    operator: Operator,
    value: Option<&FilterValue>,
) -> Result<Operand, QueryError> {
    let Some(spec) = lookup(field.variant, operator) else {
        return Err(QueryError::invalid_operator(
            &field.name,
            operator.as_str(),
            field.variant,
        ));
    };

    let checker = ValueChecker { field, operator };
    match spec.arity {
        Arity::None => match value {
            None => Ok(Operand::None),
            Some(_) => Err(checker.fail("takes no value")),
        },
        Arity::One => checker.one(value),
        Arity::Two => checker.two(value),
        Arity::List => checker.list(value),
    }
}

struct ValueChecker<'a> {
    field: &'a FieldDescriptor,
    operator: Operator,
}

impl ValueChecker<'_> {
    fn fail(&self, reason: impl Into<String>) -> QueryError {
        QueryError::invalid_value(&self.field.name, self.operator.as_str(), reason)
    }

    fn one(&self, value: Option<&FilterValue>) -> Result<Operand, QueryError> {
        if self.operator == Op::RelativeToToday {
            return match value {
                Some(FilterValue::Relative { unit, value }) => Ok(Operand::Relative {
                    unit: *unit,
                    value: *value,
                }),
                _ => Err(self.fail("expects an object with 'unit' and 'value'")),
            };
        }

        let scalar = match value {
            Some(FilterValue::Scalar(s)) => s,
            Some(_) => return Err(self.fail("expects a single value")),
            None => return Err(self.fail("requires a value")),
        };

        match self.field.variant {
            FieldVariant::Text => Ok(Operand::Text(self.text(scalar)?)),
            FieldVariant::Select => Ok(Operand::Text(self.option(scalar)?)),
            FieldVariant::Number | FieldVariant::Range => Ok(Operand::Number(self.number(scalar)?)),
            FieldVariant::Boolean => Ok(Operand::Bool(self.boolean(scalar)?)),
            FieldVariant::Date | FieldVariant::DateRange => Ok(Operand::Date(self.date(scalar)?)),
            FieldVariant::MultiSelect => Err(self.fail("expects a list")),
        }
    }

    fn two(&self, value: Option<&FilterValue>) -> Result<Operand, QueryError> {
        let (from, to) = match value {
            Some(FilterValue::Range { from, to }) => (from, to),
            Some(FilterValue::List(items)) if items.len() == 2 => (&items[0], &items[1]),
            _ => return Err(self.fail("requires exactly two values")),
        };

        match self.field.variant {
            FieldVariant::Number | FieldVariant::Range => {
                let (min, max) = (self.number(from)?, self.number(to)?);
                if min > max {
                    return Err(self.fail("lower bound is greater than upper bound"));
                }
                Ok(Operand::NumberRange(min, max))
            }
            FieldVariant::Date | FieldVariant::DateRange => {
                let (start, end) = (self.date(from)?, self.date(to)?);
                if start > end {
                    return Err(self.fail("start is after end"));
                }
                Ok(Operand::DateRange(start, end))
            }
            _ => Err(self.fail("is not supported for this field")),
        }
    }

    fn list(&self, value: Option<&FilterValue>) -> Result<Operand, QueryError> {
        let items: Vec<&Scalar> = match value {
            Some(FilterValue::List(items)) => items.iter().collect(),
            Some(FilterValue::Scalar(s)) => vec![s],
            _ => return Err(self.fail("expects a list of values")),
        };
        if items.is_empty() {
            return Err(self.fail("requires at least one value"));
        }
        if items.len() > MAX_LIST_VALUES {
            return Err(self.fail(format!("accepts at most {} values", MAX_LIST_VALUES)));
        }

        match self.field.variant {
            FieldVariant::Number => items
                .into_iter()
                .map(|s| self.number(s))
                .collect::<Result<_, _>>()
                .map(Operand::NumberList),
            FieldVariant::Select | FieldVariant::MultiSelect => items
                .into_iter()
                .map(|s| self.option(s))
                .collect::<Result<_, _>>()
                .map(Operand::TextList),
            _ => items
                .into_iter()
                .map(|s| self.text(s))
                .collect::<Result<_, _>>()
                .map(Operand::TextList),
        }
    }

    fn text(&self, scalar: &Scalar) -> Result<String, QueryError> {
        match scalar {
            Scalar::Text(s) => Ok(s.clone()),
            Scalar::Number(n) => Ok(n.to_string()),
            Scalar::Bool(_) => Err(self.fail("expects text")),
        }
    }

    fn option(&self, scalar: &Scalar) -> Result<String, QueryError> {
        let text = self.text(scalar)?;
        if !self.field.allows_option(&text) {
            return Err(self.fail(format!(
                "'{}' is not one of: {}",
                text,
                self.field.options.join(", ")
            )));
        }
        Ok(text)
    }

    fn number(&self, scalar: &Scalar) -> Result<f64, QueryError> {
        let n = match scalar {
            Scalar::Number(n) => n.as_f64(),
            Scalar::Text(s) => s.trim().parse::<f64>().ok(),
            Scalar::Bool(_) => None,
        };
        n.filter(|n| n.is_finite())
            .ok_or_else(|| self.fail("expects a number"))
    }

    fn boolean(&self, scalar: &Scalar) -> Result<bool, QueryError> {
        match scalar {
            Scalar::Bool(b) => Ok(*b),
            Scalar::Text(s) if s == "true" => Ok(true),
            Scalar::Text(s) if s == "false" => Ok(false),
            _ => Err(self.fail("expects true or false")),
        }
    }

    fn date(&self, scalar: &Scalar) -> Result<DateTime<Utc>, QueryError> {
        let dt = match scalar {
            Scalar::Text(s) => parse_timestamp(s),
            Scalar::Number(n) => n.as_i64().and_then(millis_to_datetime),
            Scalar::Bool(_) => None,
        };
        dt.ok_or_else(|| self.fail("expects an RFC 3339 date or epoch milliseconds"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn value(v: serde_json::Value) -> FilterValue {
        serde_json::from_value(v).unwrap()
    }

    fn check(
        field: &FieldDescriptor,
        op: Operator,
        v: Option<serde_json::Value>,
    ) -> Result<Operand, QueryError> {
        let v = v.map(value);
        check_value(field, op, v.as_ref())
    }

    #[test]
    fn test_registry_matches_defaults() {
        let variants = [
            FieldVariant::Text,
            FieldVariant::Number,
            FieldVariant::Boolean,
            FieldVariant::Date,
            FieldVariant::DateRange,
            FieldVariant::Select,
            FieldVariant::MultiSelect,
            FieldVariant::Range,
        ];
        for variant in variants {
            let default = default_operator_for(variant);
            assert!(
                is_allowed(variant, default),
                "default {} missing for {}",
                default,
                variant
            );
        }
    }

    #[test]
    fn test_operator_whitelist() {
        assert!(!is_allowed(FieldVariant::Boolean, Op::Contains));
        assert!(!is_allowed(FieldVariant::Text, Op::GreaterThan));
        assert!(!is_allowed(FieldVariant::MultiSelect, Op::Equals));
        assert!(is_allowed(FieldVariant::Date, Op::RelativeToToday));
        assert_eq!(operators_for(FieldVariant::Text).len(), 10);
    }

    #[test]
    fn test_operator_from_str() {
        for op in Operator::ALL {
            assert_eq!(op.as_str().parse::<Operator>(), Ok(op));
        }
        assert!("like".parse::<Operator>().is_err());
        assert!("'; DROP TABLE documents; --".parse::<Operator>().is_err());
    }

    #[test]
    fn test_check_value_rejects_unregistered_operator() {
        let err = check(&FieldDescriptor::boolean("active"), Op::Contains, Some(json!("x")))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATOR");
    }

    #[test]
    fn test_between_requires_two_ordered_values() {
        let age = FieldDescriptor::number("age");
        assert_eq!(
            check(&age, Op::Between, Some(json!({"from": 1, "to": "5"}))).unwrap(),
            Operand::NumberRange(1.0, 5.0)
        );
        assert_eq!(
            check(&age, Op::Between, Some(json!([2, 3]))).unwrap(),
            Operand::NumberRange(2.0, 3.0)
        );
        for bad in [json!(3), json!([1]), json!([1, 2, 3]), json!({"from": 9, "to": 1})] {
            let err = check(&age, Op::Between, Some(bad)).unwrap_err();
            assert_eq!(err.code(), "INVALID_VALUE_ARITY");
        }
        assert!(check(&age, Op::Between, None).is_err());
    }

    #[test]
    fn test_arity_none_rejects_value() {
        let name = FieldDescriptor::text("name");
        assert_eq!(check(&name, Op::IsEmpty, None).unwrap(), Operand::None);
        assert!(check(&name, Op::IsEmpty, Some(json!("x"))).is_err());
    }

    #[test]
    fn test_list_values() {
        let role = FieldDescriptor::select("role", ["owner", "member"]);
        assert_eq!(
            check(&role, Op::In, Some(json!(["owner"]))).unwrap(),
            Operand::TextList(vec!["owner".into()])
        );
        assert_eq!(
            check(&role, Op::In, Some(json!("member"))).unwrap(),
            Operand::TextList(vec!["member".into()])
        );
        assert!(check(&role, Op::In, Some(json!([]))).is_err());
        assert!(check(&role, Op::In, Some(json!(["admin"]))).is_err());

        let too_many: Vec<i64> = (0..=MAX_LIST_VALUES as i64).collect();
        let age = FieldDescriptor::number("age");
        assert!(check(&age, Op::In, Some(json!(too_many))).is_err());
    }

    #[test]
    fn test_scalar_coercion() {
        let active = FieldDescriptor::boolean("active");
        assert_eq!(
            check(&active, Op::Equals, Some(json!("true"))).unwrap(),
            Operand::Bool(true)
        );
        assert!(check(&active, Op::Equals, Some(json!("yes"))).is_err());

        let age = FieldDescriptor::number("age");
        assert_eq!(
            check(&age, Op::GreaterThan, Some(json!("42.5"))).unwrap(),
            Operand::Number(42.5)
        );
        assert!(check(&age, Op::GreaterThan, Some(json!("forty"))).is_err());

        let joined = FieldDescriptor::date("joined");
        let expected = parse_timestamp("2024-01-01T00:00:00Z").unwrap();
        assert_eq!(
            check(&joined, Op::After, Some(json!("2024-01-01"))).unwrap(),
            Operand::Date(expected)
        );
        assert_eq!(
            check(&joined, Op::After, Some(json!(1_704_067_200_000_i64))).unwrap(),
            Operand::Date(expected)
        );
        assert!(check(&joined, Op::After, Some(json!("soon"))).is_err());
    }

    #[test]
    fn test_relative_to_today() {
        let joined = FieldDescriptor::date("joined");
        assert_eq!(
            check(
                &joined,
                Op::RelativeToToday,
                Some(json!({"unit": "weeks", "value": 2}))
            )
            .unwrap(),
            Operand::Relative {
                unit: RelativeUnit::Weeks,
                value: 2
            }
        );
        assert!(check(&joined, Op::RelativeToToday, Some(json!(7))).is_err());
    }
}
