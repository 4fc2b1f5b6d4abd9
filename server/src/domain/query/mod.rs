//! Entity query engine
//!
//! - `operators` - per-variant operator whitelist and value coercion
//! - `filter` - filter expression tree and its builder operations
//! - `search` - the canonical search query (filter + sort + page)
//! - `parser` - list endpoint query parameters to search query
//! - `compiler` - search query to parameterised SQL, plus execution

pub mod compiler;
pub mod error;
pub mod filter;
pub mod operators;
pub mod parser;
pub mod search;

pub use compiler::{QueryResult, compile, execute};
pub use error::QueryError;
pub use filter::{
    Combinator, FilterCondition, FilterNode, FilterValue, RelativeUnit, Scalar, add_condition,
    add_group, count_conditions, flatten, remove_condition, set_condition, used_fields,
    wrap_in_group,
};
pub use operators::{Arity, Operator, OperatorSpec, default_operator_for, operators_for};
pub use parser::ListQuery;
pub use search::{DateRange, PageRequest, QueryLimits, SearchQuery, SortDirection, SortSpec};
