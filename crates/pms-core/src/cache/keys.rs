//! Cache key layout

use serde::Serialize;
use uuid::Uuid;

use crate::query::{ListQuery, Scope};

#[derive(Serialize)]
struct ListKey<'a> {
    scope: &'a Scope,
    query: &'a ListQuery,
}

pub fn list_key(collection: &str, scope: &Scope, query: &ListQuery) -> String {
    let params = serde_json::to_string(&ListKey { scope, query }).unwrap_or_default();
    format!("{}:list:{}", collection, params)
}

pub fn list_pattern(collection: &str) -> String {
    format!("{}:list:*", collection)
}

pub fn detail_key(collection: &str, id: Uuid) -> String {
    format!("{}:detail:{}", collection, id)
}

pub fn stats_key(collection: &str, tenant_id: Uuid) -> String {
    format!("{}:stats:{}", collection, tenant_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Role;

    #[test]
    fn test_key_layout() {
        let id = Uuid::nil();
        assert_eq!(
            detail_key("units", id),
            "units:detail:00000000-0000-0000-0000-000000000000"
        );
        assert_eq!(list_pattern("units"), "units:list:*");
        assert!(stats_key("units", id).starts_with("units:stats:"));
    }

    #[test]
    fn test_list_key_depends_on_scope() {
        let query = ListQuery::default();
        let tenant = Uuid::new_v4();
        let admin = Scope::tenant(tenant, Role::Admin);
        let resident = Scope::tenant(tenant, Role::Resident).with_constraint("resident", Uuid::new_v4());
        assert_ne!(
            list_key("complaints", &admin, &query),
            list_key("complaints", &resident, &query)
        );
        assert!(list_key("complaints", &admin, &query).starts_with("complaints:list:"));
    }
}
