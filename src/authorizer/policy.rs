//! Authorizer policy documents
//!
//! Wire casing follows the gateway's IAM policy format.

use super::{AuthDecision, Effect};
use serde::{Deserialize, Serialize};

/// Policy language version
pub const POLICY_VERSION: &str = "2012-10-17";

/// Action granted or denied by every statement
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Authorizer reply handed back to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<PolicyStatement>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyStatement {
    pub action: Vec<String>,
    pub effect: Effect,
    pub resource: Vec<String>,
}

impl From<&AuthDecision> for AuthorizerResponse {
    fn from(decision: &AuthDecision) -> Self {
        Self {
            principal_id: decision.principal.clone(),
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![PolicyStatement {
                    action: vec![INVOKE_ACTION.to_string()],
                    effect: decision.effect,
                    resource: vec![decision.resource.clone()],
                }],
            },
        }
    }
}

impl AuthorizerResponse {
    /// Effect of the single statement
    pub fn effect(&self) -> Option<Effect> {
        self.policy_document.statement.first().map(|s| s.effect)
    }
}
