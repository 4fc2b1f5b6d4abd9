//! Search query contract
//!
//! One canonical value combining filter, sort and pagination. Route handlers
//! build it from query parameters; the filter synchronizer builds it from
//! client state; the compiler consumes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::QueryError;
use super::filter::{self, FilterNode};
use crate::core::constants::{
    DEFAULT_MAX_FILTER_CONDITIONS, DEFAULT_MAX_FILTER_DEPTH, DEFAULT_MAX_PAGE_SIZE,
    DEFAULT_PAGE_SIZE,
};
use crate::domain::entity::EntityDescriptor;
use crate::utils::time::canonical;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// One sort key; the first key in a list is primary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

impl SortSpec {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Desc,
        }
    }
}

/// 1-based page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub number: u32,
    pub size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            number: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(number: u32, size: u32) -> Self {
        Self { number, size }
    }

    /// Rows skipped before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.number.saturating_sub(1)) * u64::from(self.size)
    }
}

/// Optional creation-time window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange {
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_timestamp")]
    pub start: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none", with = "optional_timestamp")]
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

mod optional_timestamp {
    use super::canonical;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        dt: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match dt {
            Some(dt) => canonical::serialize(dt, serializer),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        #[derive(Deserialize)]
        struct Wrapper(#[serde(with = "canonical")] DateTime<Utc>);

        Ok(Option::<Wrapper>::deserialize(deserializer)?.map(|w| w.0))
    }
}

/// Bounds applied to every search query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub max_depth: usize,
    pub max_conditions: usize,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            max_depth: DEFAULT_MAX_FILTER_DEPTH,
            max_conditions: DEFAULT_MAX_FILTER_CONDITIONS,
        }
    }
}

/// Filter, sort and page for one list request
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<FilterNode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortSpec>,
    #[serde(default)]
    pub page: PageRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn with_page(mut self, number: u32, size: u32) -> Self {
        self.page = PageRequest::new(number, size);
        self
    }

    pub fn with_date_range(mut self, range: DateRange) -> Self {
        self.date_range = Some(range);
        self
    }

    /// Check pagination, sort keys and the filter tree against the entity
    pub fn validate(
        &self,
        descriptor: &EntityDescriptor,
        limits: &QueryLimits,
    ) -> Result<(), QueryError> {
        if self.page.number < 1 {
            return Err(QueryError::InvalidPagination(
                "page number must be at least 1".to_string(),
            ));
        }
        if self.page.size < 1 || self.page.size > limits.max_page_size {
            return Err(QueryError::InvalidPagination(format!(
                "page size must be between 1 and {}",
                limits.max_page_size
            )));
        }

        for sort in &self.sort {
            let field = descriptor.field(&sort.field).ok_or_else(|| {
                QueryError::invalid_field(
                    &sort.field,
                    format!("not a field of '{}'", descriptor.name()),
                )
            })?;
            if !field.sortable {
                return Err(QueryError::invalid_field(&sort.field, "not sortable"));
            }
        }

        if let Some(range) = &self.date_range
            && let (Some(start), Some(end)) = (range.start, range.end)
            && start > end
        {
            return Err(QueryError::invalid_value(
                "createdAt",
                "between",
                "start date is after end date",
            ));
        }

        if let Some(node) = &self.filter {
            filter::validate(node, descriptor, limits)?;
        }
        Ok(())
    }
}
