//! Parameterised store requests
//!
//! The query compiler produces these; the store only splices `sql` fragments
//! built from descriptor-approved expressions and binds every user value.

/// A single bound SQL value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Integer(i64),
    Real(f64),
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i64> for SqlValue {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Integer(i64::from(v))
    }
}

/// Collects SQL parameters during query building (maintains insertion order)
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SqlParams {
    pub values: Vec<SqlValue>,
}

impl SqlParams {
    /// Record a value and return its placeholder
    pub fn bind(&mut self, value: impl Into<SqlValue>) -> &'static str {
        self.values.push(value.into());
        "?"
    }

    /// Record a list of values and return `?, ?, ...`
    pub fn bind_list<I, V>(&mut self, values: I) -> String
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        values
            .into_iter()
            .map(|v| self.bind(v))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// WHERE clause fragment plus its binds
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub params: SqlParams,
}

impl Predicate {
    /// Predicate matching every row
    pub fn match_all() -> Self {
        Self {
            sql: "1=1".to_string(),
            params: SqlParams::default(),
        }
    }
}

/// One ORDER BY key
#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub expr: String,
    pub descending: bool,
}

/// A fully compiled list request for one entity
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub entity: String,
    pub predicate: Predicate,
    pub order: Vec<OrderTerm>,
    pub skip: u64,
    pub take: u64,
}

impl CompiledQuery {
    /// Render the ORDER BY list (without the keyword)
    pub fn order_by_sql(&self) -> String {
        if self.order.is_empty() {
            return "id ASC".to_string();
        }
        self.order
            .iter()
            .map(|term| {
                format!(
                    "{} {}",
                    term.expr,
                    if term.descending { "DESC" } else { "ASC" }
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}
