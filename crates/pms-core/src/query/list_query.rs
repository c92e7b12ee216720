//! List request parameters

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;
use uuid::Uuid;

use pms_shared::types::{coerce_limit, coerce_page};

use crate::domain::Role;

const RESERVED_PARAMS: &[&str] = &["query", "page", "limit", "sort", "fields"];

/// Parsed list parameters. Serialized into the list cache key, so two
/// requests with the same parameters in any order share one entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListQuery {
    pub query: Option<String>,
    pub page: u32,
    pub limit: u32,
    pub sort: Option<String>,
    pub fields: Option<Vec<String>>,
    pub filters: BTreeMap<String, String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            query: None,
            page: pms_shared::constants::DEFAULT_PAGE,
            limit: pms_shared::constants::DEFAULT_PAGE_SIZE,
            sort: None,
            fields: None,
            filters: BTreeMap::new(),
        }
    }
}

impl ListQuery {
    pub fn from_params(params: &HashMap<String, String>) -> Self {
        let non_empty = |key: &str| {
            params
                .get(key)
                .map(|v| v.trim())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let fields = non_empty("fields").map(|raw| {
            raw.split(',')
                .map(|f| f.trim().to_string())
                .filter(|f| !f.is_empty())
                .collect::<Vec<_>>()
        });

        let filters = params
            .iter()
            .filter(|(key, _)| !RESERVED_PARAMS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.trim().to_string()))
            .collect();

        Self {
            query: non_empty("query"),
            page: coerce_page(params.get("page").map(String::as_str)),
            limit: coerce_limit(params.get("limit").map(String::as_str)),
            sort: non_empty("sort"),
            fields: fields.filter(|f| !f.is_empty()),
            filters,
        }
    }
}

/// Who is asking, and which extra constraints the access gate imposes
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Scope {
    pub tenant_id: Uuid,
    pub role: Role,
    /// Extra `path = uuid` constraints, e.g. a resident's own documents
    pub constraints: BTreeMap<String, Uuid>,
}

impl Scope {
    pub fn tenant(tenant_id: Uuid, role: Role) -> Self {
        Self {
            tenant_id,
            role,
            constraints: BTreeMap::new(),
        }
    }

    pub fn with_constraint(mut self, path: &str, id: Uuid) -> Self {
        self.constraints.insert(path.to_string(), id);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_reserved_keys_are_not_filters() {
        let q = ListQuery::from_params(&params(&[
            ("query", " griya "),
            ("page", "2"),
            ("limit", "500"),
            ("sort", "-price"),
            ("fields", "name, price,"),
            ("type", "villa"),
        ]));
        assert_eq!(q.query.as_deref(), Some("griya"));
        assert_eq!(q.page, 2);
        assert_eq!(q.limit, 100);
        assert_eq!(q.sort.as_deref(), Some("-price"));
        assert_eq!(q.fields, Some(vec!["name".to_string(), "price".to_string()]));
        assert_eq!(q.filters.len(), 1);
        assert_eq!(q.filters["type"], "villa");
    }

    #[test]
    fn test_invalid_paging_falls_back() {
        let q = ListQuery::from_params(&params(&[("page", "0"), ("limit", "abc")]));
        assert_eq!(q.page, 1);
        assert_eq!(q.limit, 10);
    }

    #[test]
    fn test_param_order_does_not_change_serialization() {
        let a = ListQuery::from_params(&params(&[("status", "open"), ("category", "noise")]));
        let b = ListQuery::from_params(&params(&[("category", "noise"), ("status", "open")]));
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
