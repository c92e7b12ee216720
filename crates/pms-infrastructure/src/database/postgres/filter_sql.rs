//! Filter → SQL translation. Every value is bound; paths are bound as `text[]`.

use serde_json::{Map, Value};
use sqlx::{types::Json, Postgres, QueryBuilder};

use pms_core::query::{Filter, SortDirection, SortKey};

pub(crate) fn path_array(path: &str) -> Vec<String> {
    path.split('.').map(str::to_string).collect()
}

/// `a.b` + value → `{"a": {"b": value}}` for `@>` containment
fn containment(path: &str, value: Value) -> Value {
    path.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        map.insert(segment.to_string(), inner);
        Value::Object(map)
    })
}

/// Escape LIKE metacharacters so the term matches literally
pub(crate) fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub(crate) fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::All => {
            qb.push("TRUE");
        }
        Filter::Eq { path, value } if value.is_null() => {
            qb.push("(doc #> ");
            qb.push_bind(path_array(path));
            qb.push(" IS NULL OR doc #> ");
            qb.push_bind(path_array(path));
            qb.push(" = 'null'::jsonb)");
        }
        Filter::Eq { path, value } => {
            qb.push("doc @> ");
            qb.push_bind(Json(containment(path, value.clone())));
        }
        Filter::HasTag { path, value } => {
            qb.push("doc @> ");
            qb.push_bind(Json(containment(path, Value::Array(vec![value.clone()]))));
        }
        Filter::Contains { path, term } => {
            qb.push("doc #>> ");
            qb.push_bind(path_array(path));
            qb.push(" ILIKE ");
            qb.push_bind(format!("%{}%", escape_like(term)));
        }
        Filter::And { filters } => push_group(qb, filters, " AND ", "TRUE"),
        Filter::Or { filters } => push_group(qb, filters, " OR ", "FALSE"),
    }
}

fn push_group(qb: &mut QueryBuilder<'_, Postgres>, filters: &[Filter], joiner: &str, empty: &str) {
    if filters.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, filter) in filters.iter().enumerate() {
        if i > 0 {
            qb.push(joiner);
        }
        push_filter(qb, filter);
    }
    qb.push(")");
}

pub(crate) fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: &SortKey) {
    let direction = match sort.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    qb.push(" ORDER BY ");
    if sort.path == "createdAt" {
        qb.push("created_at ").push(direction);
    } else {
        qb.push("doc #> ");
        qb.push_bind(path_array(&sort.path));
        qb.push(" ").push(direction);
        qb.push(", created_at DESC");
    }
    qb.push(", id ASC");
}
