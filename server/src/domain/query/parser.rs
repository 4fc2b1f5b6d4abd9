//! List endpoint query parameters
//!
//! Parses the flat query-string form of a list request into a [`SearchQuery`].
//! Filters arrive as JSON in `filters` (array of conditions, ANDed) and
//! `filter` (a full tree). Operators are read as plain strings first so an
//! unknown name is reported against its field instead of as a JSON error.

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::error::QueryError;
use super::filter::{Combinator, FilterCondition, FilterNode, FilterValue};
use super::operators::Operator;
use super::search::{DateRange, PageRequest, QueryLimits, SearchQuery, SortDirection, SortSpec};
use crate::core::constants::MAX_FILTER_JSON_SIZE;
use crate::domain::entity::EntityDescriptor;
use crate::utils::time::parse_timestamp;

/// Query string of `GET /api/v1/{entity}`
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// JSON array of conditions, ANDed
    pub filters: Option<String>,
    /// JSON filter tree
    pub filter: Option<String>,
    #[validate(length(min = 1, max = 64))]
    pub sort_by: Option<String>,
    pub sort_direction: Option<String>,
    /// `field:dir` pairs separated by commas
    #[validate(length(max = 1024))]
    pub sort: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u64>,
    pub page: Option<u32>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum RawNode {
    Condition(RawCondition),
    Group {
        combinator: Combinator,
        children: Vec<RawNode>,
    },
}

#[derive(Debug, Deserialize)]
struct RawCondition {
    field: String,
    operator: String,
    #[serde(default)]
    value: Option<FilterValue>,
}

impl ListQuery {
    /// Build a validated search query for `descriptor`
    pub fn into_search_query(
        self,
        descriptor: &EntityDescriptor,
        limits: &QueryLimits,
    ) -> Result<SearchQuery, QueryError> {
        let mut parts = Vec::new();
        if let Some(json) = &self.filters {
            let raw: Vec<RawCondition> = parse_json(json)?;
            for condition in raw {
                parts.push(FilterNode::Condition(resolve_condition(condition, descriptor)?));
            }
        }
        let tree = match &self.filter {
            Some(json) => Some(resolve_node(parse_json(json)?, descriptor)?),
            None => None,
        };

        let filter = match (parts.len(), tree) {
            (0, tree) => tree,
            (1, None) => parts.pop(),
            (_, None) => Some(FilterNode::and(parts)),
            (_, Some(tree)) => {
                parts.push(tree);
                Some(FilterNode::and(parts))
            }
        };

        let query = SearchQuery {
            filter,
            sort: self.sort_specs()?,
            page: self.page_request(limits)?,
            date_range: self.date_range()?,
        };
        query.validate(descriptor, limits)?;
        Ok(query)
    }

    fn sort_specs(&self) -> Result<Vec<SortSpec>, QueryError> {
        let mut specs = Vec::new();
        if let Some(field) = &self.sort_by {
            let direction = match &self.sort_direction {
                Some(d) => parse_direction(field, d)?,
                None => SortDirection::Desc,
            };
            specs.push(SortSpec {
                field: field.clone(),
                direction,
            });
        }
        if let Some(sort) = &self.sort {
            for item in sort.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                let (field, direction) = match item.split_once(':') {
                    Some((field, dir)) => (field, parse_direction(field, dir)?),
                    None => (item, SortDirection::Asc),
                };
                if specs.iter().any(|s: &SortSpec| s.field == field) {
                    continue;
                }
                specs.push(SortSpec {
                    field: field.to_string(),
                    direction,
                });
            }
        }
        Ok(specs)
    }

    fn page_request(&self, limits: &QueryLimits) -> Result<PageRequest, QueryError> {
        let size = self.limit.unwrap_or(limits.default_page_size);
        if size == 0 || size > limits.max_page_size {
            return Err(QueryError::InvalidPagination(format!(
                "limit must be between 1 and {}",
                limits.max_page_size
            )));
        }

        let number = match (self.offset, self.page) {
            (Some(_), Some(_)) => {
                return Err(QueryError::InvalidPagination(
                    "use either offset or page, not both".to_string(),
                ));
            }
            (Some(offset), None) => {
                if offset % u64::from(size) != 0 {
                    return Err(QueryError::InvalidPagination(format!(
                        "offset {} is not a multiple of limit {}",
                        offset, size
                    )));
                }
                u32::try_from(offset / u64::from(size) + 1).map_err(|_| {
                    QueryError::InvalidPagination("offset is out of range".to_string())
                })?
            }
            (None, Some(0)) => {
                return Err(QueryError::InvalidPagination(
                    "page must be at least 1".to_string(),
                ));
            }
            (None, Some(page)) => page,
            (None, None) => 1,
        };

        Ok(PageRequest::new(number, size))
    }

    fn date_range(&self) -> Result<Option<DateRange>, QueryError> {
        let parse = |raw: &Option<String>, name: &str| -> Result<_, QueryError> {
            raw.as_deref()
                .map(|s| {
                    parse_timestamp(s).ok_or_else(|| {
                        QueryError::invalid_value(name, "between", format!("invalid date '{}'", s))
                    })
                })
                .transpose()
        };
        let range = DateRange {
            start: parse(&self.start_date, "startDate")?,
            end: parse(&self.end_date, "endDate")?,
        };
        Ok((!range.is_empty()).then_some(range))
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(json: &str) -> Result<T, QueryError> {
    if json.len() > MAX_FILTER_JSON_SIZE {
        return Err(QueryError::MalformedQuery(format!(
            "filter JSON exceeds maximum size of {} bytes",
            MAX_FILTER_JSON_SIZE
        )));
    }
    serde_json::from_str(json).map_err(|e| QueryError::MalformedQuery(e.to_string()))
}

fn parse_direction(field: &str, raw: &str) -> Result<SortDirection, QueryError> {
    SortDirection::parse(raw).ok_or_else(|| {
        QueryError::invalid_field(field, format!("unknown sort direction '{}'", raw))
    })
}

fn resolve_node(raw: RawNode, descriptor: &EntityDescriptor) -> Result<FilterNode, QueryError> {
    match raw {
        RawNode::Condition(c) => Ok(FilterNode::Condition(resolve_condition(c, descriptor)?)),
        RawNode::Group {
            combinator,
            children,
        } => {
            if children.is_empty() {
                return Err(QueryError::MalformedQuery(
                    "filter groups must contain at least one child".to_string(),
                ));
            }
            let children = children
                .into_iter()
                .map(|child| resolve_node(child, descriptor))
                .collect::<Result<_, _>>()?;
            Ok(FilterNode::Group {
                combinator,
                children,
            })
        }
    }
}

fn resolve_condition(
    raw: RawCondition,
    descriptor: &EntityDescriptor,
) -> Result<FilterCondition, QueryError> {
    let field = descriptor.field(&raw.field).ok_or_else(|| {
        QueryError::invalid_field(&raw.field, format!("not a field of '{}'", descriptor.name()))
    })?;
    let operator = raw
        .operator
        .parse::<Operator>()
        .map_err(|_| QueryError::InvalidOperator {
            field: raw.field.clone(),
            operator: raw.operator.clone(),
            variant: field.variant,
        })?;
    Ok(FilterCondition::new(raw.field, operator, raw.value))
}
