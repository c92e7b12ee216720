//! Translates list parameters into a store query.
//!
//! The engine is pure: it never touches a store and never fails. Unknown
//! filter keys are dropped, uncoercible values become constraints that match
//! nothing, and an invalid sort falls back to newest first.

use serde_json::{Map, Value};
use uuid::Uuid;

use super::filter::Filter;
use super::list_query::{ListQuery, Scope};
use crate::entity::{EntityDescriptor, FieldKind};

pub const DEFAULT_SORT_FIELD: &str = "createdAt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub path: String,
    pub direction: SortDirection,
}

impl Default for SortKey {
    fn default() -> Self {
        Self {
            path: DEFAULT_SORT_FIELD.to_string(),
            direction: SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreQuery {
    pub filter: Filter,
    pub sort: SortKey,
    pub skip: u64,
    pub limit: u64,
}

pub struct QueryEngine;

impl QueryEngine {
    pub fn build(desc: &EntityDescriptor, query: &ListQuery, scope: &Scope) -> StoreQuery {
        StoreQuery {
            filter: Self::filter(desc, query, scope),
            sort: Self::sort(query.sort.as_deref()),
            skip: u64::from(query.page.saturating_sub(1)) * u64::from(query.limit),
            limit: u64::from(query.limit),
        }
    }

    /// The full list filter; also used for the separate count
    pub fn filter(desc: &EntityDescriptor, query: &ListQuery, scope: &Scope) -> Filter {
        let mut clauses = vec![Self::scope_filter(desc, scope)];

        if !query.filters.contains_key("isActive") {
            clauses.push(Filter::eq("isActive", true));
        }

        for (param, raw) in &query.filters {
            if let Some(field) = desc.filter_field(param) {
                clauses.push(Self::constraint(field.path, field.kind, raw));
            }
        }

        if let Some(term) = query.query.as_deref() {
            clauses.push(Self::search(desc, term));
        }

        Filter::and(clauses)
    }

    /// Tenant ownership plus any gate-imposed constraints
    pub fn scope_filter(desc: &EntityDescriptor, scope: &Scope) -> Filter {
        let mut clauses = vec![Filter::eq(desc.owner_path, scope.tenant_id.to_string())];
        for (path, id) in &scope.constraints {
            clauses.push(Filter::eq(path, id.to_string()));
        }
        Filter::and(clauses)
    }

    fn search(desc: &EntityDescriptor, term: &str) -> Filter {
        Filter::Or {
            filters: desc
                .search_fields
                .iter()
                .map(|path| Filter::Contains {
                    path: path.to_string(),
                    term: term.to_string(),
                })
                .collect(),
        }
    }

    fn constraint(path: &str, kind: FieldKind, raw: &str) -> Filter {
        let value = match kind {
            FieldKind::Text | FieldKind::Tag => Value::String(raw.to_string()),
            FieldKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" => Value::Bool(true),
                "false" | "0" => Value::Bool(false),
                _ => Value::String(raw.to_string()),
            },
            FieldKind::Number => raw
                .parse::<f64>()
                .ok()
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number)
                .unwrap_or_else(|| Value::String(raw.to_string())),
            FieldKind::Uuid => match Uuid::parse_str(raw) {
                Ok(id) => Value::String(id.to_string()),
                Err(_) => Value::String(raw.to_string()),
            },
        };

        if kind == FieldKind::Tag {
            Filter::HasTag {
                path: path.to_string(),
                value,
            }
        } else {
            Filter::Eq {
                path: path.to_string(),
                value,
            }
        }
    }

    /// Accepts `field`, `-field`, `field:asc` and `field:desc`
    pub fn sort(raw: Option<&str>) -> SortKey {
        let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
            return SortKey::default();
        };

        let (path, direction) = if let Some(field) = raw.strip_prefix('-') {
            (field, SortDirection::Desc)
        } else if let Some((field, dir)) = raw.split_once(':') {
            match dir.to_ascii_lowercase().as_str() {
                "asc" => (field, SortDirection::Asc),
                "desc" => (field, SortDirection::Desc),
                _ => return SortKey::default(),
            }
        } else {
            (raw, SortDirection::Asc)
        };

        let valid = !path.is_empty()
            && !path.starts_with('.')
            && !path.ends_with('.')
            && path
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if !valid {
            return SortKey::default();
        }

        SortKey {
            path: path.to_string(),
            direction,
        }
    }

    /// Keep only the requested top-level keys; `id` always survives
    pub fn project(doc: Value, fields: &[String]) -> Value {
        let Value::Object(mut map) = doc else {
            return doc;
        };
        let mut out = Map::new();
        if let Some(id) = map.remove("id") {
            out.insert("id".to_string(), id);
        }
        for field in fields {
            let key = field.split('.').next().unwrap_or(field);
            if let Some(value) = map.remove(key) {
                out.insert(key.to_string(), value);
            }
        }
        Value::Object(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::property::PROPERTY_DESCRIPTOR;
    use crate::domain::Role;
    use serde_json::json;
    use std::collections::HashMap;

    fn query(pairs: &[(&str, &str)]) -> ListQuery {
        let params: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ListQuery::from_params(&params)
    }

    fn doc(tenant: Uuid, city: &str, active: bool) -> Value {
        json!({
            "id": Uuid::new_v4(),
            "tenantId": tenant,
            "name": "Griya 100% Asri",
            "type": "villa",
            "address": { "city": city },
            "amenities": ["pool"],
            "totalUnits": 10,
            "isActive": active
        })
    }

    #[test]
    fn test_active_only_by_default() {
        let tenant = Uuid::new_v4();
        let filter = QueryEngine::filter(&PROPERTY_DESCRIPTOR, &query(&[]), &Scope::tenant(tenant, Role::Admin));
        assert!(filter.matches(&doc(tenant, "Bandung", true)));
        assert!(!filter.matches(&doc(tenant, "Bandung", false)));
    }

    #[test]
    fn test_explicit_is_active_overrides_default() {
        let tenant = Uuid::new_v4();
        let filter = QueryEngine::filter(
            &PROPERTY_DESCRIPTOR,
            &query(&[("isActive", "false")]),
            &Scope::tenant(tenant, Role::Admin),
        );
        assert!(filter.matches(&doc(tenant, "Bandung", false)));
        assert!(!filter.matches(&doc(tenant, "Bandung", true)));
    }

    #[test]
    fn test_other_tenant_excluded() {
        let filter = QueryEngine::filter(
            &PROPERTY_DESCRIPTOR,
            &query(&[]),
            &Scope::tenant(Uuid::new_v4(), Role::Admin),
        );
        assert!(!filter.matches(&doc(Uuid::new_v4(), "Bandung", true)));
    }

    #[test]
    fn test_unknown_filters_ignored_and_known_coerced() {
        let tenant = Uuid::new_v4();
        let scope = Scope::tenant(tenant, Role::Admin);
        let filter = QueryEngine::filter(
            &PROPERTY_DESCRIPTOR,
            &query(&[("city", "Bandung"), ("totalUnits", "10"), ("bogus", "x"), ("amenity", "pool")]),
            &scope,
        );
        assert!(filter.matches(&doc(tenant, "Bandung", true)));
        assert!(!filter.matches(&doc(tenant, "Jakarta", true)));
    }

    #[test]
    fn test_uncoercible_value_matches_nothing() {
        let tenant = Uuid::new_v4();
        let filter = QueryEngine::filter(
            &PROPERTY_DESCRIPTOR,
            &query(&[("totalUnits", "ten")]),
            &Scope::tenant(tenant, Role::Admin),
        );
        assert!(!filter.matches(&doc(tenant, "Bandung", true)));
    }

    #[test]
    fn test_search_is_literal_and_case_insensitive() {
        let tenant = Uuid::new_v4();
        let scope = Scope::tenant(tenant, Role::Admin);
        let hit = QueryEngine::filter(&PROPERTY_DESCRIPTOR, &query(&[("query", "100% asri")]), &scope);
        assert!(hit.matches(&doc(tenant, "Bandung", true)));
        let miss = QueryEngine::filter(&PROPERTY_DESCRIPTOR, &query(&[("query", "1_0")]), &scope);
        assert!(!miss.matches(&doc(tenant, "Bandung", true)));
    }

    #[test]
    fn test_sort_parsing() {
        assert_eq!(QueryEngine::sort(None), SortKey::default());
        assert_eq!(
            QueryEngine::sort(Some("-price")),
            SortKey { path: "price".into(), direction: SortDirection::Desc }
        );
        assert_eq!(
            QueryEngine::sort(Some("address.city:asc")),
            SortKey { path: "address.city".into(), direction: SortDirection::Asc }
        );
        assert_eq!(QueryEngine::sort(Some("name; drop")), SortKey::default());
        assert_eq!(QueryEngine::sort(Some("name:sideways")), SortKey::default());
    }

    #[test]
    fn test_paging_window() {
        let q = QueryEngine::build(
            &PROPERTY_DESCRIPTOR,
            &query(&[("page", "3"), ("limit", "20")]),
            &Scope::tenant(Uuid::new_v4(), Role::Admin),
        );
        assert_eq!(q.skip, 40);
        assert_eq!(q.limit, 20);
    }

    #[test]
    fn test_projection_keeps_id() {
        let d = doc(Uuid::new_v4(), "Bandung", true);
        let id = d["id"].clone();
        let projected = QueryEngine::project(d, &["name".to_string(), "address.city".to_string()]);
        let keys: Vec<_> = projected.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 3);
        assert_eq!(projected["id"], id);
        assert_eq!(projected["address"]["city"], "Bandung");
    }
}
