//! Query arguments and their compilation into SQL clauses.
//!
//! # Example
//!
//! ```ignore
//! let args = QueryArgs::new()
//!     .where_eq("name", "max_upload_size")
//!     .order_by("id", Direction::Desc)
//!     .limit(10)
//!     .offset(20);
//! let compiled = compile(&args, ConfigOption::columns(), &["id"], Dialect::Sqlite)?;
//! let sql = compiled.select_sql("\"config_options\"");
//! ```

use crate::dialect::Dialect;
use crate::entity::Column;
use crate::error::DataError;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl Operator {
    fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Like => "LIKE",
            Operator::In => "IN",
            Operator::NotIn => "NOT IN",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    /// Trusted SQL fragment, emitted verbatim.
    Raw(String),
}

impl Condition {
    pub fn new(column: &str, op: Operator, value: impl Into<Value>) -> Self {
        Condition::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }
}

/// WHERE criteria: a trusted raw fragment, or a list of conditions ANDed
/// together.
#[derive(Debug, Clone, PartialEq)]
pub enum Conditions {
    Raw(String),
    All(Vec<Condition>),
}

impl Conditions {
    pub fn raw(sql: impl Into<String>) -> Self {
        Conditions::Raw(sql.into())
    }

    pub fn eq(column: &str, value: impl Into<Value>) -> Self {
        Conditions::All(vec![Condition::new(column, Operator::Eq, value)])
    }

    /// AND another condition onto these.
    pub fn and(self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        self.push(Condition::new(column, op, value))
    }

    pub fn and_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.and(column, Operator::Eq, value)
    }

    fn push(self, condition: Condition) -> Self {
        match self {
            Conditions::All(mut list) => {
                list.push(condition);
                Conditions::All(list)
            }
            Conditions::Raw(raw) => Conditions::All(vec![Condition::Raw(raw), condition]),
        }
    }
}

impl From<&str> for Conditions {
    fn from(raw: &str) -> Self {
        Conditions::Raw(raw.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    fn sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Order {
    /// Trusted ORDER BY body, emitted verbatim.
    Raw(String),
    Columns(Vec<(String, Direction)>),
}

/// Arguments accepted by the repository finders.
///
/// `offset` is ignored unless `limit` is set; `one` forces a limit of 1.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryArgs {
    pub one: bool,
    pub conditions: Option<Conditions>,
    pub order: Option<Order>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl QueryArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn one(mut self) -> Self {
        self.one = true;
        self
    }

    pub fn conditions(mut self, conditions: impl Into<Conditions>) -> Self {
        self.conditions = Some(conditions.into());
        self
    }

    pub fn where_op(mut self, column: &str, op: Operator, value: impl Into<Value>) -> Self {
        let condition = Condition::new(column, op, value);
        self.conditions = Some(match self.conditions.take() {
            Some(existing) => existing.push(condition),
            None => Conditions::All(vec![condition]),
        });
        self
    }

    pub fn where_eq(self, column: &str, value: impl Into<Value>) -> Self {
        self.where_op(column, Operator::Eq, value)
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        match &mut self.order {
            Some(Order::Columns(columns)) => columns.push((column.to_string(), direction)),
            _ => self.order = Some(Order::Columns(vec![(column.to_string(), direction)])),
        }
        self
    }

    pub fn order_raw(mut self, order: impl Into<String>) -> Self {
        self.order = Some(Order::Raw(order.into()));
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// Clause strings produced by [`compile`]. Each one is either empty or
/// starts with its keyword.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledQuery {
    pub where_clause: String,
    pub order_clause: String,
    pub limit_clause: String,
}

impl CompiledQuery {
    pub fn select_sql(&self, escaped_table: &str) -> String {
        let mut sql = format!("SELECT * FROM {escaped_table}");
        for clause in [&self.where_clause, &self.order_clause, &self.limit_clause] {
            if !clause.is_empty() {
                sql.push(' ');
                sql.push_str(clause);
            }
        }
        sql
    }
}

/// Compile query arguments against an entity's columns.
///
/// Structured conditions and ordering may only name declared columns.
/// Without an explicit order the primary key is sorted ascending.
pub fn compile(
    args: &QueryArgs,
    columns: &[Column],
    pk_columns: &[&str],
    dialect: Dialect,
) -> Result<CompiledQuery, DataError> {
    Ok(CompiledQuery {
        where_clause: compile_where(args.conditions.as_ref(), columns, dialect)?,
        order_clause: compile_order(args.order.as_ref(), columns, pk_columns, dialect)?,
        limit_clause: compile_limit(args)?,
    })
}

/// `WHERE ...` for the given conditions, or an empty string.
pub fn compile_where(
    conditions: Option<&Conditions>,
    columns: &[Column],
    dialect: Dialect,
) -> Result<String, DataError> {
    let parts = match conditions {
        None => return Ok(String::new()),
        Some(Conditions::Raw(raw)) if raw.trim().is_empty() => return Ok(String::new()),
        Some(Conditions::Raw(raw)) => vec![format!("({raw})")],
        Some(Conditions::All(list)) => list
            .iter()
            .map(|condition| compile_condition(condition, columns, dialect))
            .collect::<Result<Vec<_>, _>>()?,
    };
    if parts.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("WHERE {}", parts.join(" AND ")))
}

fn declared_column(name: &str, columns: &[Column], dialect: Dialect) -> Result<String, DataError> {
    if columns.iter().any(|c| c.name == name) {
        Ok(dialect.escape_identifier(name))
    } else {
        Err(DataError::InvalidArgument(format!(
            "unknown column '{name}'"
        )))
    }
}

fn compile_condition(
    condition: &Condition,
    columns: &[Column],
    dialect: Dialect,
) -> Result<String, DataError> {
    let (column, op, value) = match condition {
        Condition::Raw(raw) => return Ok(format!("({raw})")),
        Condition::Compare { column, op, value } => (column, *op, value),
    };
    let col = declared_column(column, columns, dialect)?;

    match (op, value) {
        (Operator::IsNull, _) | (Operator::Eq, Value::Null) => Ok(format!("{col} IS NULL")),
        (Operator::IsNotNull, _) | (Operator::NotEq, Value::Null) => {
            Ok(format!("{col} IS NOT NULL"))
        }
        (Operator::In | Operator::NotIn, Value::List(items)) if items.is_empty() => {
            Ok(if op == Operator::In { "0 = 1" } else { "1 = 1" }.to_string())
        }
        (Operator::In | Operator::NotIn, value) => {
            Ok(format!("{col} {} ({})", op.sql(), dialect.escape_value(value)?))
        }
        (_, Value::Null) => Err(DataError::InvalidArgument(format!(
            "operator {} cannot compare '{column}' with NULL",
            op.sql()
        ))),
        (_, Value::List(_)) => Err(DataError::InvalidArgument(format!(
            "operator {} does not accept a list for '{column}'",
            op.sql()
        ))),
        (_, value) => Ok(format!("{col} {} {}", op.sql(), dialect.escape_value(value)?)),
    }
}

fn compile_order(
    order: Option<&Order>,
    columns: &[Column],
    pk_columns: &[&str],
    dialect: Dialect,
) -> Result<String, DataError> {
    let parts = match order {
        Some(Order::Raw(raw)) if !raw.trim().is_empty() => vec![raw.trim().to_string()],
        Some(Order::Columns(list)) if !list.is_empty() => list
            .iter()
            .map(|(column, direction)| -> Result<String, DataError> {
                Ok(format!(
                    "{} {}",
                    declared_column(column, columns, dialect)?,
                    direction.sql()
                ))
            })
            .collect::<Result<Vec<_>, _>>()?,
        _ => pk_columns
            .iter()
            .map(|pk| format!("{} ASC", dialect.escape_identifier(pk)))
            .collect(),
    };
    if parts.is_empty() {
        return Ok(String::new());
    }
    Ok(format!("ORDER BY {}", parts.join(", ")))
}

fn compile_limit(args: &QueryArgs) -> Result<String, DataError> {
    let limit = if args.one { Some(1) } else { args.limit };
    // Without a limit the offset is ignored.
    let Some(limit) = limit else {
        return Ok(String::new());
    };
    if limit <= 0 {
        return Err(DataError::InvalidArgument(format!(
            "limit must be positive, got {limit}"
        )));
    }
    if let Some(offset) = args.offset {
        if offset < 0 {
            return Err(DataError::InvalidArgument(format!(
                "offset must not be negative, got {offset}"
            )));
        }
    }
    Ok(match args.offset {
        Some(offset) if offset > 0 => format!("LIMIT {limit} OFFSET {offset}"),
        _ => format!("LIMIT {limit}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::ColumnType;
    use proptest::prelude::*;

    const COLUMNS: &[Column] = &[
        Column::new("id", ColumnType::Integer),
        Column::new("name", ColumnType::String),
        Column::new("value", ColumnType::String),
    ];

    fn sqlite(args: &QueryArgs) -> Result<CompiledQuery, DataError> {
        compile(args, COLUMNS, &["id"], Dialect::Sqlite)
    }

    #[test]
    fn test_empty_args_order_by_primary_key() {
        let q = sqlite(&QueryArgs::new()).unwrap();
        assert_eq!(q.where_clause, "");
        assert_eq!(q.order_clause, "ORDER BY \"id\" ASC");
        assert_eq!(q.limit_clause, "");
        assert_eq!(
            q.select_sql("\"config_options\""),
            "SELECT * FROM \"config_options\" ORDER BY \"id\" ASC"
        );
    }

    #[test]
    fn test_structured_conditions_are_escaped() {
        let q = sqlite(
            &QueryArgs::new()
                .where_eq("name", "O'Brien")
                .where_op("id", Operator::Gt, 3),
        )
        .unwrap();
        assert_eq!(q.where_clause, "WHERE \"name\" = 'O''Brien' AND \"id\" > 3");
    }

    #[test]
    fn test_null_comparisons_become_is_null() {
        let q = sqlite(
            &QueryArgs::new()
                .where_eq("value", Value::Null)
                .where_op("name", Operator::NotEq, Value::Null),
        )
        .unwrap();
        assert_eq!(q.where_clause, "WHERE \"value\" IS NULL AND \"name\" IS NOT NULL");
    }

    #[test]
    fn test_in_lists() {
        let q = sqlite(&QueryArgs::new().where_op("id", Operator::In, vec![1, 2, 3])).unwrap();
        assert_eq!(q.where_clause, "WHERE \"id\" IN (1, 2, 3)");

        let empty: Vec<i64> = Vec::new();
        let q = sqlite(&QueryArgs::new().where_op("id", Operator::In, empty.clone())).unwrap();
        assert_eq!(q.where_clause, "WHERE 0 = 1");
        let q = sqlite(&QueryArgs::new().where_op("id", Operator::NotIn, empty)).unwrap();
        assert_eq!(q.where_clause, "WHERE 1 = 1");
    }

    #[test]
    fn test_raw_conditions_are_parenthesised() {
        let q = sqlite(&QueryArgs::new().conditions("id = 1 OR id = 2")).unwrap();
        assert_eq!(q.where_clause, "WHERE (id = 1 OR id = 2)");

        let q = sqlite(&QueryArgs::new().conditions("id > 1").where_eq("name", "x")).unwrap();
        assert_eq!(q.where_clause, "WHERE (id > 1) AND \"name\" = 'x'");
    }

    #[test]
    fn test_unknown_column_rejected() {
        let err = sqlite(&QueryArgs::new().where_eq("password", "x")).unwrap_err();
        assert!(matches!(err, DataError::InvalidArgument(_)));
        let err = sqlite(&QueryArgs::new().order_by("password", Direction::Asc)).unwrap_err();
        assert!(matches!(err, DataError::InvalidArgument(_)));
    }

    #[test]
    fn test_explicit_order() {
        let q = sqlite(
            &QueryArgs::new()
                .order_by("name", Direction::Desc)
                .order_by("id", Direction::Asc),
        )
        .unwrap();
        assert_eq!(q.order_clause, "ORDER BY \"name\" DESC, \"id\" ASC");

        let q = sqlite(&QueryArgs::new().order_raw("RANDOM()")).unwrap();
        assert_eq!(q.order_clause, "ORDER BY RANDOM()");
    }

    #[test]
    fn test_limit_and_offset() {
        let q = sqlite(&QueryArgs::new().limit(10).offset(20)).unwrap();
        assert_eq!(q.limit_clause, "LIMIT 10 OFFSET 20");
        let q = sqlite(&QueryArgs::new().offset(20)).unwrap();
        assert_eq!(q.limit_clause, "");
    }

    #[test]
    fn test_one_overrides_limit() {
        let q = sqlite(&QueryArgs::new().one().limit(50)).unwrap();
        assert_eq!(q.limit_clause, "LIMIT 1");
        let q = sqlite(&QueryArgs::new().one().limit(0)).unwrap();
        assert_eq!(q.limit_clause, "LIMIT 1");
    }

    #[test]
    fn test_invalid_limit_and_offset() {
        assert!(sqlite(&QueryArgs::new().limit(0)).is_err());
        assert!(sqlite(&QueryArgs::new().limit(-5)).is_err());
        assert!(sqlite(&QueryArgs::new().limit(5).offset(-1)).is_err());
        assert!(sqlite(&QueryArgs::new().one().offset(-1)).is_err());
    }

    #[test]
    fn test_negative_offset_without_limit_is_ignored() {
        let q = sqlite(&QueryArgs::new().offset(-1)).unwrap();
        assert_eq!(q.limit_clause, "");
        assert_eq!(
            q.select_sql("\"config_options\""),
            "SELECT * FROM \"config_options\" ORDER BY \"id\" ASC"
        );
    }

    #[test]
    fn test_mysql_quoting() {
        let q = compile(
            &QueryArgs::new().where_eq("name", "a\"b"),
            COLUMNS,
            &["id"],
            Dialect::MySql,
        )
        .unwrap();
        assert_eq!(q.where_clause, "WHERE `name` = 'a\\\"b'");
        assert_eq!(q.order_clause, "ORDER BY `id` ASC");
    }

    proptest! {
        #[test]
        fn prop_no_limit_clause_without_limit(offset in -10_000i64..10_000, one in any::<bool>()) {
            let result = sqlite(&QueryArgs { one, offset: Some(offset), ..QueryArgs::default() });
            if !one {
                prop_assert_eq!(result.unwrap().limit_clause, "");
            } else if offset < 0 {
                prop_assert!(result.is_err());
            } else {
                prop_assert!(result.unwrap().limit_clause.starts_with("LIMIT 1"));
            }
        }

        #[test]
        fn prop_positive_limit_is_emitted(limit in 1i64..10_000, offset in 0i64..10_000) {
            let q = sqlite(&QueryArgs::new().limit(limit).offset(offset)).unwrap();
            let expected_prefix = format!("LIMIT {limit}");
            prop_assert!(q.limit_clause.starts_with(&expected_prefix));
            prop_assert_eq!(q.limit_clause.contains("OFFSET"), offset > 0);
        }

        #[test]
        fn prop_text_values_stay_inside_quotes(s in ".*") {
            let q = sqlite(&QueryArgs::new().where_eq("name", s.as_str())).unwrap();
            let literal = q.where_clause.trim_start_matches("WHERE \"name\" = ");
            prop_assert!(literal.starts_with('\'') && literal.ends_with('\''));
            let body = &literal[1..literal.len() - 1];
            prop_assert_eq!(
                body.replace("'||char(0)||'", "\0").replace("''", ""),
                s.replace('\'', "")
            );
        }
    }
}
