use serde::{Deserialize, Serialize};

/// Tenant scope for every backend query. Passed explicitly through each call
/// boundary so data isolation stays auditable; nothing reads an ambient
/// organization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantContext {
    pub organization_id: String,
    pub branch_ids: Vec<String>,
}

impl TenantContext {
    pub fn new(organization_id: impl Into<String>, branch_ids: Vec<String>) -> Self {
        Self {
            organization_id: organization_id.into(),
            branch_ids,
        }
    }

    pub fn includes_branch(&self, branch_id: &str) -> bool {
        self.branch_ids.iter().any(|b| b == branch_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
    pub id: String,
    pub name: String,
    /// Branch administrators are appended to every grouped booking's
    /// participant list.
    #[serde(default)]
    pub admins: Vec<BranchAdmin>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchAdmin {
    pub id: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn includes_branch_checks_membership() {
        let ctx = TenantContext::new("org1", vec!["b1".to_string(), "b2".to_string()]);
        assert!(ctx.includes_branch("b2"));
        assert!(!ctx.includes_branch("b3"));
    }
}
