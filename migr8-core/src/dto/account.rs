//! Azure account DTOs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Subscription reported by `az account show`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tenant_id: Option<Uuid>,
    #[serde(default)]
    pub is_default: bool,
}

/// Page of projects returned by `GET {org}/_apis/projects`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectList {
    pub count: usize,
    #[serde(default)]
    pub value: Vec<ProjectRef>,
}

/// Project reference inside a [`ProjectList`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRef {
    pub id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_show_output() {
        let raw = r#"{
            "environmentName": "AzureCloud",
            "id": "0000-1111",
            "isDefault": true,
            "name": "Production",
            "state": "Enabled",
            "tenantId": "72f988bf-86f1-41af-91ab-2d7cd011db47"
        }"#;

        let subscription: Subscription = serde_json::from_str(raw).unwrap();
        assert_eq!(subscription.id, "0000-1111");
        assert_eq!(subscription.name, "Production");
        assert!(subscription.is_default);
        assert!(subscription.tenant_id.is_some());
    }

    #[test]
    fn test_project_list() {
        let raw = r#"{
            "count": 1,
            "value": [{
                "id": "eb6e4656-77fc-42a1-9181-4c6d8e9da5d1",
                "name": "shop",
                "state": "wellFormed"
            }]
        }"#;

        let projects: ProjectList = serde_json::from_str(raw).unwrap();
        assert_eq!(projects.count, 1);
        assert_eq!(projects.value[0].name, "shop");
    }
}
