//! Query compiler
//!
//! Turns a validated [`SearchQuery`] into a [`CompiledQuery`] for the document
//! store. Field names only ever reach SQL through the descriptor's
//! precomputed column expressions; every user value is bound.

use chrono::{DateTime, Duration, Months, Utc};
use serde::Serialize;

use super::error::QueryError;
use super::filter::{Combinator, FilterCondition, FilterNode, RelativeUnit};
use super::operators::{Operand, Operator, check_value};
use super::search::{QueryLimits, SearchQuery, SortDirection};
use crate::data::types::{CompiledQuery, Document, OrderTerm, Predicate, SqlParams};
use crate::data::{DataError, DocumentStore};
use crate::domain::entity::{
    EntityDescriptor, FIELD_CREATED_AT, FIELD_ID, FieldDescriptor, FieldVariant,
};
use crate::utils::sql::{escape_like_pattern, json_path};
use crate::utils::time::{format_timestamp, start_of_day};

/// One page of results plus the unpaginated match count
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult<T> {
    pub items: Vec<T>,
    pub total_count: u64,
}

/// Compile a search query for one entity
pub fn compile(
    query: &SearchQuery,
    descriptor: &EntityDescriptor,
    limits: &QueryLimits,
) -> Result<CompiledQuery, QueryError> {
    compile_at(query, descriptor, limits, Utc::now())
}

/// Compile relative to a fixed "now" (relative date windows depend on it)
pub fn compile_at(
    query: &SearchQuery,
    descriptor: &EntityDescriptor,
    limits: &QueryLimits,
    now: DateTime<Utc>,
) -> Result<CompiledQuery, QueryError> {
    query.validate(descriptor, limits)?;

    let mut compiler = Compiler {
        descriptor,
        params: SqlParams::default(),
        now,
    };
    let mut clauses = Vec::new();
    if let Some(node) = &query.filter {
        clauses.push(compiler.node(node)?);
    }
    if let Some(range) = query.date_range.filter(|r| !r.is_empty()) {
        let created = compiler.filterable(FIELD_CREATED_AT)?;
        let column = created.column().to_string();
        if let Some(start) = range.start {
            let p = compiler.params.bind(format_timestamp(start));
            clauses.push(format!("{} >= {}", column, p));
        }
        if let Some(end) = range.end {
            let p = compiler.params.bind(format_timestamp(end));
            clauses.push(format!("{} <= {}", column, p));
        }
    }

    let sql = match clauses.len() {
        0 => "1=1".to_string(),
        1 => clauses.remove(0),
        _ => clauses.join(" AND "),
    };

    Ok(CompiledQuery {
        entity: descriptor.name().to_string(),
        predicate: Predicate {
            sql,
            params: compiler.params,
        },
        order: order_terms(query, descriptor)?,
        skip: query.page.offset(),
        take: u64::from(query.page.size),
    })
}

/// Run a compiled query: one page plus the total count
///
/// The two reads are independent statements, so a concurrent write may land
/// between them and make `total_count` disagree with `items` by a row.
pub async fn execute(
    compiled: &CompiledQuery,
    store: &dyn DocumentStore,
) -> Result<QueryResult<Document>, DataError> {
    let (items, total_count) = tokio::try_join!(
        store.find_documents(compiled),
        store.count_documents(compiled)
    )?;
    Ok(QueryResult { items, total_count })
}

fn order_terms(
    query: &SearchQuery,
    descriptor: &EntityDescriptor,
) -> Result<Vec<OrderTerm>, QueryError> {
    let mut terms = Vec::with_capacity(query.sort.len() + 1);
    let mut has_id = false;

    if query.sort.is_empty() {
        let created = descriptor
            .field(FIELD_CREATED_AT)
            .ok_or_else(|| QueryError::invalid_field(FIELD_CREATED_AT, "missing system field"))?;
        terms.push(OrderTerm {
            expr: created.sort_column(),
            descending: true,
        });
    }
    for sort in &query.sort {
        let field = descriptor
            .field(&sort.field)
            .ok_or_else(|| QueryError::invalid_field(&sort.field, "unknown sort field"))?;
        has_id |= field.name == FIELD_ID;
        terms.push(OrderTerm {
            expr: field.sort_column(),
            descending: sort.direction == SortDirection::Desc,
        });
    }
    if !has_id {
        terms.push(OrderTerm {
            expr: "id".to_string(),
            descending: false,
        });
    }
    Ok(terms)
}

struct Compiler<'a> {
    descriptor: &'a EntityDescriptor,
    params: SqlParams,
    now: DateTime<Utc>,
}

impl<'a> Compiler<'a> {
    fn filterable(&self, name: &str) -> Result<&'a FieldDescriptor, QueryError> {
        let field = self
            .descriptor
            .field(name)
            .ok_or_else(|| QueryError::invalid_field(name, "unknown field"))?;
        if !field.filterable {
            return Err(QueryError::invalid_field(name, "not filterable"));
        }
        Ok(field)
    }

    fn node(&mut self, node: &FilterNode) -> Result<String, QueryError> {
        match node {
            FilterNode::Condition(c) => self.condition(c),
            FilterNode::Group {
                combinator,
                children,
            } => {
                if children.is_empty() {
                    return Ok(match combinator {
                        Combinator::And => "1=1".to_string(),
                        Combinator::Or => "1=0".to_string(),
                    });
                }
                if children.len() == 1 {
                    return self.node(&children[0]);
                }
                let parts = children
                    .iter()
                    .map(|child| self.node(child))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(format!("({})", parts.join(&format!(" {} ", combinator.sql()))))
            }
        }
    }

    fn condition(&mut self, condition: &FilterCondition) -> Result<String, QueryError> {
        let field = self.filterable(&condition.field)?;
        let operand = check_value(field, condition.operator, condition.value.as_ref())?;

        match field.variant {
            FieldVariant::MultiSelect => self.multi_select(field, condition.operator, operand),
            FieldVariant::DateRange => self.date_range(field, condition.operator, operand),
            _ => self.scalar(field, condition.operator, operand),
        }
    }

    fn scalar(
        &mut self,
        field: &FieldDescriptor,
        op: Operator,
        operand: Operand,
    ) -> Result<String, QueryError> {
        let col = field.column();
        let textual = matches!(
            field.variant,
            FieldVariant::Text | FieldVariant::Select | FieldVariant::Date
        );

        let sql = match (op, operand) {
            (Operator::IsEmpty, _) if textual => format!("({} IS NULL OR {} = '')", col, col),
            (Operator::IsEmpty, _) => format!("{} IS NULL", col),
            (Operator::IsNotEmpty, _) if textual => {
                format!("({} IS NOT NULL AND {} != '')", col, col)
            }
            (Operator::IsNotEmpty, _) => format!("{} IS NOT NULL", col),

            (Operator::Equals, Operand::Date(day)) => {
                let start = start_of_day(day);
                let a = self.params.bind(format_timestamp(start));
                let b = self.params.bind(format_timestamp(start + Duration::days(1)));
                format!("({} >= {} AND {} < {})", col, a, col, b)
            }
            (Operator::Before, Operand::Date(dt)) => self.compare(col, "<", dt),
            (Operator::After, Operand::Date(dt)) => self.compare(col, ">", dt),
            (Operator::Between, Operand::DateRange(start, end)) => {
                let a = self.params.bind(format_timestamp(start));
                let b = self.params.bind(format_timestamp(end));
                format!("({} >= {} AND {} <= {})", col, a, col, b)
            }
            (Operator::RelativeToToday, Operand::Relative { unit, value }) => {
                let since = relative_start(self.now, unit, value);
                let p = self.params.bind(format_timestamp(since));
                format!("{} >= {}", col, p)
            }

            (Operator::Contains, Operand::Text(s)) => {
                self.like(col, format!("%{}%", escape_like_pattern(&s)), false)
            }
            (Operator::NotContains, Operand::Text(s)) => {
                self.like(col, format!("%{}%", escape_like_pattern(&s)), true)
            }
            (Operator::StartsWith, Operand::Text(s)) => {
                self.like(col, format!("{}%", escape_like_pattern(&s)), false)
            }
            (Operator::EndsWith, Operand::Text(s)) => {
                self.like(col, format!("%{}", escape_like_pattern(&s)), false)
            }

            (Operator::Between, Operand::NumberRange(min, max)) => {
                let a = self.params.bind(min);
                let b = self.params.bind(max);
                format!("{} BETWEEN {} AND {}", col, a, b)
            }
            (Operator::In, Operand::TextList(items)) => {
                format!("{} IN ({})", col, self.params.bind_list(items))
            }
            (Operator::In, Operand::NumberList(items)) => {
                format!("{} IN ({})", col, self.params.bind_list(items))
            }
            (Operator::NotIn, Operand::TextList(items)) => {
                format!("({} IS NULL OR {} NOT IN ({}))", col, col, self.params.bind_list(items))
            }
            (Operator::NotIn, Operand::NumberList(items)) => {
                format!("({} IS NULL OR {} NOT IN ({}))", col, col, self.params.bind_list(items))
            }

            (op, operand) => {
                let symbol = match op {
                    Operator::Equals => "=",
                    Operator::NotEquals => "!=",
                    Operator::GreaterThan => ">",
                    Operator::GreaterThanOrEqual => ">=",
                    Operator::LessThan => "<",
                    Operator::LessThanOrEqual => "<=",
                    _ => return Err(unsupported(field, op)),
                };
                let p = match operand {
                    Operand::Text(s) => self.params.bind(s),
                    Operand::Number(n) => self.params.bind(n),
                    Operand::Bool(b) => self.params.bind(b),
                    Operand::Date(dt) => self.params.bind(format_timestamp(dt)),
                    _ => return Err(unsupported(field, op)),
                };
                if op == Operator::NotEquals {
                    format!("({} IS NULL OR {} {} {})", col, col, symbol, p)
                } else {
                    format!("{} {} {}", col, symbol, p)
                }
            }
        };
        Ok(sql)
    }

    fn compare(&mut self, col: &str, symbol: &str, dt: DateTime<Utc>) -> String {
        let p = self.params.bind(format_timestamp(dt));
        format!("{} {} {}", col, symbol, p)
    }

    fn like(&mut self, col: &str, pattern: String, negate: bool) -> String {
        let p = self.params.bind(pattern);
        if negate {
            format!("({} IS NULL OR {} NOT LIKE {} ESCAPE '\\')", col, col, p)
        } else {
            format!("{} LIKE {} ESCAPE '\\'", col, p)
        }
    }

    fn date_range(
        &mut self,
        field: &FieldDescriptor,
        op: Operator,
        operand: Operand,
    ) -> Result<String, QueryError> {
        let start = field.subcolumn("start");
        let end = field.subcolumn("end");
        let sql = match (op, operand) {
            (Operator::IsEmpty, _) => format!("{} IS NULL", field.column()),
            (Operator::IsNotEmpty, _) => format!("{} IS NOT NULL", field.column()),
            (Operator::Before, Operand::Date(dt)) => self.compare(&end, "<", dt),
            (Operator::After, Operand::Date(dt)) => self.compare(&start, ">", dt),
            (Operator::Between, Operand::DateRange(a, b)) => {
                let a = self.params.bind(format_timestamp(a));
                let b = self.params.bind(format_timestamp(b));
                format!("({} >= {} AND {} <= {})", start, a, end, b)
            }
            (op, _) => return Err(unsupported(field, op)),
        };
        Ok(sql)
    }

    fn multi_select(
        &mut self,
        field: &FieldDescriptor,
        op: Operator,
        operand: Operand,
    ) -> Result<String, QueryError> {
        let path = json_path(&field.name);
        let sql = match (op, operand) {
            (Operator::IsEmpty, _) => format!(
                "({} IS NULL OR json_array_length(data, '{}') = 0)",
                field.column(),
                path
            ),
            (Operator::IsNotEmpty, _) => format!("json_array_length(data, '{}') > 0", path),
            (Operator::In, Operand::TextList(items)) => format!(
                "EXISTS (SELECT 1 FROM json_each(data, '{}') WHERE value IN ({}))",
                path,
                self.params.bind_list(items)
            ),
            (Operator::NotIn, Operand::TextList(items)) => format!(
                "NOT EXISTS (SELECT 1 FROM json_each(data, '{}') WHERE value IN ({}))",
                path,
                self.params.bind_list(items)
            ),
            (op, _) => return Err(unsupported(field, op)),
        };
        Ok(sql)
    }
}

/// A registered operator whose operand shape has no SQL rendering
fn unsupported(field: &FieldDescriptor, op: Operator) -> QueryError {
    QueryError::invalid_operator(&field.name, op.as_str(), field.variant)
}

/// Start of the window "within the last `value` units", counted from the start of today
fn relative_start(now: DateTime<Utc>, unit: RelativeUnit, value: u32) -> DateTime<Utc> {
    let today = start_of_day(now);
    let value = i64::from(value);
    let since = match unit {
        RelativeUnit::Days => today.checked_sub_signed(Duration::days(value)),
        RelativeUnit::Weeks => today.checked_sub_signed(Duration::days(value * 7)),
        RelativeUnit::Months => today.checked_sub_months(Months::new(value as u32)),
        RelativeUnit::Years => u32::try_from(value * 12)
            .ok()
            .and_then(|months| today.checked_sub_months(Months::new(months))),
    };
    since.unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::data::SqliteService;
    use crate::data::types::SqlValue;
    use crate::domain::entity::FieldDescriptor;
    use crate::domain::query::filter::FilterValue;
    use crate::domain::query::search::{DateRange, SortSpec};
    use crate::utils::time::parse_timestamp;
    use serde_json::json;

    fn members() -> EntityDescriptor {
        EntityDescriptor::builder("members")
            .field(FieldDescriptor::text("name").sortable())
            .field(FieldDescriptor::select("status", ["active", "inactive"]).sortable())
            .field(FieldDescriptor::number("age").sortable())
            .field(FieldDescriptor::boolean("verified"))
            .field(FieldDescriptor::date("joined"))
            .field(FieldDescriptor::multi_select("tags", ["a", "b", "c"]))
            .field(FieldDescriptor::date_range("tenure"))
            .field(FieldDescriptor::text("notes").not_filterable())
            .build()
            .unwrap()
    }

    fn cond(field: &str, op: Operator, value: Option<FilterValue>) -> FilterNode {
        FilterNode::condition(field, op, value)
    }

    fn compile_filter(node: FilterNode) -> CompiledQuery {
        compile(
            &SearchQuery::new().with_filter(node),
            &members(),
            &QueryLimits::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_empty_query_matches_all_with_default_order() {
        let compiled = compile(&SearchQuery::new(), &members(), &QueryLimits::default()).unwrap();
        assert_eq!(compiled.predicate, Predicate::match_all());
        assert_eq!(compiled.order_by_sql(), "created_at DESC, id ASC");
        assert_eq!((compiled.skip, compiled.take), (0, 10));
    }

    #[test]
    fn test_empty_groups() {
        let and = compile_filter(FilterNode::and(vec![]));
        assert_eq!(and.predicate.sql, "1=1");
        let or = compile_filter(FilterNode::or(vec![]));
        assert_eq!(or.predicate.sql, "1=0");
    }

    #[test]
    fn test_single_child_group_compiles_to_child() {
        let compiled = compile_filter(FilterNode::Group {
            combinator: Combinator::Or,
            children: vec![cond("age", Operator::GreaterThan, Some(3_i64.into()))],
        });
        assert_eq!(compiled.predicate.sql, "json_extract(data, '$.age') > ?");
        assert_eq!(compiled.predicate.params.values, vec![SqlValue::Real(3.0)]);
    }

    #[test]
    fn test_nested_groups_are_parenthesized() {
        let compiled = compile_filter(FilterNode::and(vec![
            cond("status", Operator::Equals, Some("active".into())),
            FilterNode::or(vec![
                cond("age", Operator::LessThan, Some(18_i64.into())),
                cond("verified", Operator::Equals, Some(true.into())),
            ]),
        ]));
        assert_eq!(
            compiled.predicate.sql,
            "(json_extract(data, '$.status') = ? AND (json_extract(data, '$.age') < ? OR json_extract(data, '$.verified') = ?))"
        );
        assert_eq!(
            compiled.predicate.params.values,
            vec![
                SqlValue::Text("active".into()),
                SqlValue::Real(18.0),
                SqlValue::Integer(1)
            ]
        );
    }

    #[test]
    fn test_like_operators_escape_input() {
        let compiled = compile_filter(cond("name", Operator::Contains, Some("50%_off".into())));
        assert_eq!(
            compiled.predicate.sql,
            "json_extract(data, '$.name') LIKE ? ESCAPE '\\'"
        );
        assert_eq!(
            compiled.predicate.params.values,
            vec![SqlValue::Text("%50\\%\\_off%".into())]
        );
    }

    #[test]
    fn test_negations_include_missing_values() {
        let compiled = compile_filter(cond("status", Operator::NotEquals, Some("active".into())));
        assert_eq!(
            compiled.predicate.sql,
            "(json_extract(data, '$.status') IS NULL OR json_extract(data, '$.status') != ?)"
        );
    }

    #[test]
    fn test_rejects_non_filterable_and_bad_operator() {
        let limits = QueryLimits::default();
        let hidden =
            SearchQuery::new().with_filter(cond("notes", Operator::Contains, Some("x".into())));
        assert_eq!(
            compile(&hidden, &members(), &limits).unwrap_err().code(),
            "INVALID_FIELD"
        );
        let bad =
            SearchQuery::new().with_filter(cond("verified", Operator::Contains, Some("x".into())));
        assert_eq!(
            compile(&bad, &members(), &limits).unwrap_err().code(),
            "INVALID_OPERATOR"
        );
    }

    #[test]
    fn test_unrenderable_operand_is_an_error() {
        let descriptor = members();
        let mut compiler = Compiler {
            descriptor: &descriptor,
            params: SqlParams::default(),
            now: Utc::now(),
        };
        let name = descriptor.field("name").unwrap();
        let err = compiler
            .scalar(name, Operator::StartsWith, Operand::Number(1.0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATOR");
        let err = compiler
            .scalar(name, Operator::Between, Operand::None)
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATOR");

        let tags = descriptor.field("tags").unwrap();
        let err = compiler
            .multi_select(tags, Operator::Equals, Operand::Text("a".into()))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATOR");

        let tenure = descriptor.field("tenure").unwrap();
        let err = compiler
            .date_range(tenure, Operator::Before, Operand::Number(1.0))
            .unwrap_err();
        assert_eq!(err.code(), "INVALID_OPERATOR");
        assert!(compiler.params.is_empty());
    }

    #[test]
    fn test_sort_and_tie_break() {
        let limits = QueryLimits::default();
        let query = SearchQuery::new()
            .with_sort(SortSpec::asc("status"))
            .with_page(3, 20);
        let compiled = compile(&query, &members(), &limits).unwrap();
        assert_eq!(
            compiled.order_by_sql(),
            "json_extract(data, '$.status') ASC, id ASC"
        );
        assert_eq!((compiled.skip, compiled.take), (40, 20));

        let by_id = SearchQuery::new().with_sort(SortSpec::desc("id"));
        let compiled = compile(&by_id, &members(), &limits).unwrap();
        assert_eq!(compiled.order_by_sql(), "id DESC");
    }

    #[test]
    fn test_relative_to_today() {
        let now = parse_timestamp("2024-03-15T15:30:00Z").unwrap();
        let query = SearchQuery::new().with_filter(cond(
            "joined",
            Operator::RelativeToToday,
            Some(FilterValue::Relative {
                unit: RelativeUnit::Weeks,
                value: 2,
            }),
        ));
        let compiled = compile_at(&query, &members(), &QueryLimits::default(), now).unwrap();
        assert_eq!(compiled.predicate.sql, "json_extract(data, '$.joined') >= ?");
        assert_eq!(
            compiled.predicate.params.values,
            vec![SqlValue::Text("2024-03-01T00:00:00.000Z".into())]
        );

        assert_eq!(
            format_timestamp(relative_start(now, RelativeUnit::Months, 1)),
            "2024-02-15T00:00:00.000Z"
        );
    }

    #[test]
    fn test_date_range_param_compiles_on_created_at() {
        let query = SearchQuery::new()
            .with_filter(cond("age", Operator::IsEmpty, None))
            .with_date_range(DateRange {
                start: parse_timestamp("2024-01-01"),
                end: parse_timestamp("2024-01-31"),
            });
        let compiled = compile(&query, &members(), &QueryLimits::default()).unwrap();
        assert_eq!(
            compiled.predicate.sql,
            "json_extract(data, '$.age') IS NULL AND created_at >= ? AND created_at <= ?"
        );
        assert_eq!(compiled.predicate.params.len(), 2);
    }

    async fn seeded_store() -> Arc<SqliteService> {
        let store = Arc::new(SqliteService::init_in_memory().await.unwrap());
        let rows = [
            (
                "m01",
                "2024-01-01T00:00:00Z",
                json!({
                    "name": "Ada", "status": "active", "age": 36, "verified": true,
                    "joined": "2024-01-01T00:00:00.000Z", "tags": ["a", "b"],
                    "tenure": {"start": "2020-01-01T00:00:00.000Z", "end": "2022-01-01T00:00:00.000Z"}
                }),
            ),
            (
                "m02",
                "2024-01-02T00:00:00Z",
                json!({
                    "name": "Grace", "status": "inactive", "age": 85, "verified": false,
                    "tags": ["c"]
                }),
            ),
            (
                "m03",
                "2024-01-03T00:00:00Z",
                json!({"name": "Linus", "age": 54, "joined": "2024-01-01T12:00:00.000Z", "tags": []}),
            ),
            (
                "m04",
                "2024-01-04T00:00:00Z",
                json!({
                    "name": "Barbara 100%", "status": "active",
                    "tenure": {"start": "2023-01-01T00:00:00.000Z", "end": "2023-06-01T00:00:00.000Z"}
                }),
            ),
        ];
        for (id, at, data) in rows {
            let data = data.as_object().cloned().unwrap();
            let doc = Document::new(id, data, parse_timestamp(at).unwrap());
            store.insert_document("members", &doc).await.unwrap();
        }
        store
    }

    async fn ids(store: &Arc<SqliteService>, node: FilterNode) -> Vec<String> {
        let compiled = compile_filter(node);
        let result = execute(&compiled, store).await.unwrap();
        result.items.into_iter().map(|d| d.id).collect()
    }

    #[tokio::test]
    async fn test_execute_against_store() {
        let store = seeded_store().await;

        assert_eq!(
            ids(&store, cond("status", Operator::NotEquals, Some("active".into()))).await,
            vec!["m03", "m02"]
        );
        assert_eq!(
            ids(&store, cond("name", Operator::Contains, Some("100%".into()))).await,
            vec!["m04"]
        );
        assert_eq!(
            ids(
                &store,
                cond(
                    "age",
                    Operator::Between,
                    Some(FilterValue::List(vec![40_i64.into(), 90_i64.into()]))
                )
            )
            .await,
            vec!["m03", "m02"]
        );
        assert_eq!(
            ids(&store, cond("verified", Operator::Equals, Some(false.into()))).await,
            vec!["m02"]
        );
        assert_eq!(
            ids(&store, cond("joined", Operator::Equals, Some("2024-01-01".into()))).await,
            vec!["m03", "m01"]
        );
        assert_eq!(
            ids(
                &store,
                cond(
                    "tags",
                    Operator::In,
                    Some(FilterValue::List(vec!["b".into(), "c".into()]))
                )
            )
            .await,
            vec!["m02", "m01"]
        );
        assert_eq!(
            ids(&store, cond("tags", Operator::IsEmpty, None)).await,
            vec!["m04", "m03"]
        );
        assert_eq!(
            ids(&store, cond("tenure", Operator::After, Some("2021-01-01".into()))).await,
            vec!["m04"]
        );
        assert_eq!(
            ids(&store, FilterNode::or(vec![])).await,
            Vec::<String>::new()
        );
    }

    #[tokio::test]
    async fn test_execute_counts_beyond_page() {
        let store = seeded_store().await;
        let query = SearchQuery::new()
            .with_sort(SortSpec::asc("name"))
            .with_page(2, 3);
        let compiled = compile(&query, &members(), &QueryLimits::default()).unwrap();
        let result = execute(&compiled, &store).await.unwrap();
        assert_eq!(result.total_count, 4);
        let ids: Vec<_> = result.items.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["m03"]);
    }
}
