//! Translation of a [`Filter`] into a parameterised WHERE clause.

use layerhub_core::filter::Filter;
use sqlx::postgres::PgArguments;
use sqlx::query::{QueryAs, QueryScalar};
use sqlx::Postgres;

/// Which filter fields a table can honour. Fields a table lacks are ignored.
#[derive(Debug, Clone, Copy)]
pub struct FilterColumns {
    pub short_id: bool,
    pub user_id: bool,
    pub visibility: bool,
}

/// A value to bind, in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterBind {
    Text(String),
    Int(i64),
}

/// WHERE and LIMIT/OFFSET fragments plus their bind values.
#[derive(Debug, Clone, Default)]
pub struct FilterClause {
    pub where_clause: String,
    pub pagination: String,
    pub binds: Vec<FilterBind>,
}

/// Build the clause for `filter` against `table`. Placeholders start at `$1`.
pub fn filter_clause(table: &str, filter: &Filter, columns: FilterColumns) -> FilterClause {
    let mut conditions: Vec<String> = Vec::new();
    let mut binds = Vec::new();
    let mut bind_idx = 1u32;

    if let Some(id) = &filter.id {
        conditions.push(format!("{table}.id = ${bind_idx}"));
        binds.push(FilterBind::Text(id.clone()));
        bind_idx += 1;
    }
    if columns.short_id {
        if let Some(short_id) = &filter.short_id {
            conditions.push(format!("{table}.short_id = ${bind_idx}"));
            binds.push(FilterBind::Text(short_id.clone()));
            bind_idx += 1;
        }
    }
    if let Some(id) = &filter.regular_or_short_id {
        if columns.short_id {
            conditions.push(format!(
                "({table}.id = ${bind_idx} OR {table}.short_id = ${bind_idx})"
            ));
        } else {
            conditions.push(format!("{table}.id = ${bind_idx}"));
        }
        binds.push(FilterBind::Text(id.clone()));
        bind_idx += 1;
    }
    if columns.user_id {
        if let Some(user_id) = &filter.user_id {
            conditions.push(format!(
                "({table}.user_id = ${bind_idx} OR {table}.user_id = '')"
            ));
            binds.push(FilterBind::Text(user_id.clone()));
            bind_idx += 1;
        }
    }
    if columns.visibility {
        if let Some(visibility) = filter.visibility {
            conditions.push(format!("{table}.visibility = ${bind_idx}"));
            binds.push(FilterBind::Text(visibility.as_str().to_string()));
            bind_idx += 1;
        }
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let mut pagination = Vec::new();
    if let Some(limit) = filter.limit {
        pagination.push(format!("LIMIT ${bind_idx}"));
        binds.push(FilterBind::Int(limit));
        bind_idx += 1;
    }
    if let Some(offset) = filter.offset {
        pagination.push(format!("OFFSET ${bind_idx}"));
        binds.push(FilterBind::Int(offset));
    }

    FilterClause {
        where_clause,
        pagination: pagination.join(" "),
        binds,
    }
}

/// Bind filter values onto a row query, in placeholder order.
pub fn bind_rows<'q, O>(
    mut query: QueryAs<'q, Postgres, O, PgArguments>,
    binds: Vec<FilterBind>,
) -> QueryAs<'q, Postgres, O, PgArguments> {
    for bind in binds {
        query = match bind {
            FilterBind::Text(value) => query.bind(value),
            FilterBind::Int(value) => query.bind(value),
        };
    }
    query
}

/// Bind filter values onto a scalar (count) query, in placeholder order.
pub fn bind_scalar<'q, O>(
    mut query: QueryScalar<'q, Postgres, O, PgArguments>,
    binds: Vec<FilterBind>,
) -> QueryScalar<'q, Postgres, O, PgArguments> {
    for bind in binds {
        query = match bind {
            FilterBind::Text(value) => query.bind(value),
            FilterBind::Int(value) => query.bind(value),
        };
    }
    query
}
