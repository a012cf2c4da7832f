//! Governed execution of tool operations
//!
//! Every remote-backed tool runs through [`Dispatcher::run`], which sequences
//! the governance stages around the single call to the tracker:
//!
//! 1. operation enable flag
//! 2. rate-limit admission for the operation class
//! 3. pre-operation audit entry
//! 4. security and field validation
//! 5. advisory permission check
//! 6. the remote call
//! 7. success or failure audit entry
//!
//! Failures at any stage after admission are audited before they are returned.

use crate::audit::{classify_risk, AuditLogger, RiskLevel};
use crate::common::OperationClass;
use crate::config::GatewayConfig;
use crate::error::{GatewayError, Result};
use crate::governance::Governance;
use crate::permissions::{PermissionCheck, PermissionScope};
use crate::tracker::IssueTrackerClient;
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;

/// Caller identity used for the stdio transport
pub const DEFAULT_CALLER: &str = "mcp";

/// Description of one governed call
#[derive(Debug, Clone)]
pub struct GovernedOperation {
    /// Tool name, also the audit operation
    pub name: &'static str,
    /// Audit resource type
    pub resource_type: &'static str,
    /// Issue key, attachment id and so on
    pub resource_id: Option<String>,
    /// Rate-limit bucket
    pub class: OperationClass,
    /// Project scope for the permission check
    pub scope: PermissionScope,
    /// Extra audit details
    pub details: Map<String, Value>,
}

impl GovernedOperation {
    /// A globally scoped operation with no resource id
    pub fn new(name: &'static str, resource_type: &'static str, class: OperationClass) -> Self {
        Self {
            name,
            resource_type,
            resource_id: None,
            class,
            scope: PermissionScope::global(),
            details: Map::new(),
        }
    }

    /// Set the resource id
    pub fn with_resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    /// Set the permission scope
    pub fn with_scope(mut self, scope: PermissionScope) -> Self {
        self.scope = scope;
        self
    }

    /// Add one audit detail
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }
}

/// Runs tool operations through the governance pipeline
#[derive(Debug, Clone)]
pub struct Dispatcher {
    governance: Governance,
    caller: String,
}

impl Dispatcher {
    /// Dispatcher for the stdio caller
    pub fn new(governance: Governance) -> Self {
        Self {
            governance,
            caller: DEFAULT_CALLER.to_string(),
        }
    }

    /// Use a different caller identity for rate-limit keys
    pub fn with_caller(mut self, caller: impl Into<String>) -> Self {
        self.caller = caller.into();
        self
    }

    /// The components this dispatcher drives
    pub fn governance(&self) -> &Governance {
        &self.governance
    }

    /// Validated configuration
    pub fn config(&self) -> &GatewayConfig {
        &self.governance.config
    }

    /// Remote tracker
    pub fn tracker(&self) -> &Arc<dyn IssueTrackerClient> {
        &self.governance.tracker
    }

    /// Audit journal
    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.governance.audit
    }

    /// Whether configuration allows the named tool
    pub fn is_enabled(&self, operation: &str) -> bool {
        self.config().operations.allows(operation)
    }

    /// Fail with [`GatewayError::OperationDisabled`] when the tool is switched off
    pub fn ensure_enabled(&self, operation: &str) -> Result<()> {
        if self.is_enabled(operation) {
            Ok(())
        } else {
            Err(GatewayError::OperationDisabled(operation.to_string()))
        }
    }

    /// Run `call` under full governance
    ///
    /// `validate` turns raw tool arguments into the checked input `call` needs;
    /// it runs after admission so rejected input is audited.
    pub async fn run<T, V, F, Fut>(
        &self,
        operation: GovernedOperation,
        validate: V,
        call: F,
    ) -> Result<Value>
    where
        V: FnOnce() -> Result<T>,
        F: FnOnce(T) -> Fut,
        Fut: Future<Output = Result<Value>>,
    {
        let audit = self.audit();
        let resource_id = operation.resource_id.as_deref();

        if let Err(e) = self.ensure_enabled(operation.name) {
            self.record_failure(&operation, &e);
            return Err(e);
        }

        let key = operation.class.key_for(&self.caller);
        let limiter = self.governance.rate_limiters.for_class(operation.class);
        if let Err(e) = limiter.check_and_wait(&key).await {
            self.record_failure(&operation, &e);
            return Err(e);
        }

        audit.log_operation(
            operation.name,
            operation.resource_type,
            resource_id,
            operation.details.clone(),
        );

        let input = match validate() {
            Ok(input) => input,
            Err(e) => {
                self.record_failure(&operation, &e);
                return Err(e);
            }
        };

        if let Err(e) = self.check_permissions(&operation).await {
            self.record_failure(&operation, &e);
            return Err(e);
        }

        match call(input).await {
            Ok(value) => {
                audit.log_success(
                    operation.name,
                    operation.resource_type,
                    resource_id,
                    operation.details.clone(),
                );
                tracing::debug!(operation = operation.name, "operation completed");
                Ok(value)
            }
            Err(e) => {
                self.record_failure(&operation, &e);
                Err(e)
            }
        }
    }

    /// Permission check; only a strict-mode denial is returned as an error
    async fn check_permissions(&self, operation: &GovernedOperation) -> Result<()> {
        let validator = &self.governance.permissions;
        match validator
            .check_operation_permissions(operation.name, &operation.scope)
            .await
        {
            Ok(PermissionCheck::Unverified { reason }) => {
                tracing::warn!(
                    operation = operation.name,
                    "proceeding without permission verification: {reason}"
                );
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e @ GatewayError::PermissionDenied { .. }) if !validator.config().strict => {
                tracing::warn!(operation = operation.name, "{e}; proceeding (advisory mode)");
                self.audit().log_security_event(
                    operation.name,
                    &e.to_string(),
                    Map::from_iter([("advisory".to_string(), Value::Bool(true))]),
                    Some(RiskLevel::High),
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn record_failure(&self, operation: &GovernedOperation, error: &GatewayError) {
        let audit = self.audit();
        let message = error.to_string();
        let mut details = operation.details.clone();
        details.insert("class".to_string(), operation.class.as_str().into());
        if let Some(code) = error.security_code() {
            details.insert("code".to_string(), code.as_str().into());
        }

        audit.log_failure(
            operation.name,
            operation.resource_type,
            operation.resource_id.as_deref(),
            &message,
            details.clone(),
        );

        if error.is_security() {
            let risk = classify_risk(operation.name, operation.resource_type).max(RiskLevel::High);
            audit.log_security_event(operation.name, &message, details, Some(risk));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::{AuditQuery, PHASE_COMPLETED, PHASE_KEY, SECURITY_RESOURCE};
    use crate::error::SecurityCode;
    use crate::test_utils::TestGateway;
    use serde_json::json;

    fn search_op() -> GovernedOperation {
        GovernedOperation::new("search_issues", "search", OperationClass::Search)
    }

    #[tokio::test]
    async fn test_success_audits_both_phases() {
        let gateway = TestGateway::new();
        let dispatcher = gateway.dispatcher();

        let value = dispatcher
            .run(search_op(), || Ok(()), |_| async { Ok(json!({"total": 0})) })
            .await
            .unwrap();
        assert_eq!(value["total"], 0);

        let entries = dispatcher
            .audit()
            .query(&AuditQuery::default().with_resource_type("search"));
        assert_eq!(entries.len(), 2);
        let completed: Vec<_> = entries
            .iter()
            .filter(|e| e.metadata_value(PHASE_KEY) == Some(&json!(PHASE_COMPLETED)))
            .collect();
        assert_eq!(completed.len(), 1);
        assert!(completed[0].success);

        let successes = dispatcher
            .audit()
            .query(&AuditQuery::new().with_resource_type("search").with_success(true));
        assert_eq!(successes.len(), 1);
        let stats = dispatcher.audit().stats();
        assert_eq!(stats.successes, 1);
        assert_eq!(stats.started, 1);
    }

    #[tokio::test]
    async fn test_validation_failure_skips_remote_call() {
        let gateway = TestGateway::new();
        let dispatcher = gateway.dispatcher();
        let mut called = false;

        let err = dispatcher
            .run(
                search_op(),
                || -> Result<()> {
                    Err(GatewayError::security(SecurityCode::JqlTooLong, "too long"))
                },
                |_| {
                    called = true;
                    async { Ok(Value::Null) }
                },
            )
            .await
            .unwrap_err();

        assert!(!called);
        assert_eq!(err.security_code(), Some(SecurityCode::JqlTooLong));
        let audit = dispatcher.audit();
        assert_eq!(audit.failed_operations(10).len(), 2);
        let security = audit.security_events(10);
        assert_eq!(security.len(), 1);
        assert_eq!(security[0].resource_type, SECURITY_RESOURCE);
    }

    #[tokio::test]
    async fn test_remote_failure_is_audited_high() {
        let gateway = TestGateway::new();
        let dispatcher = gateway.dispatcher();

        let err = dispatcher
            .run(
                GovernedOperation::new("list_projects", "project", OperationClass::Standard),
                || Ok(()),
                |_| async { Err(GatewayError::remote("unavailable")) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Remote { .. }));

        let failures = dispatcher.audit().failed_operations(10);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].risk_level, RiskLevel::High);
        assert!(failures[0].error.as_deref().unwrap().contains("unavailable"));
    }

    #[tokio::test]
    async fn test_disabled_operation_rejected_before_admission() {
        let gateway = TestGateway::builder()
            .configure(|config| config.operations.enable_delete = false)
            .build();
        let dispatcher = gateway.dispatcher();

        assert!(!dispatcher.is_enabled("delete_issue"));
        let err = dispatcher
            .run(
                GovernedOperation::new("delete_issue", "issue", OperationClass::Standard),
                || Ok(()),
                |_| async { Ok(Value::Null) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::OperationDisabled(_)));

        let stats = dispatcher
            .governance()
            .rate_limiters
            .for_class(OperationClass::Standard)
            .stats(&OperationClass::Standard.key_for(DEFAULT_CALLER));
        assert_eq!(stats.used, 0);
    }

    #[tokio::test]
    async fn test_missing_capability_is_advisory_by_default() {
        let gateway = TestGateway::builder()
            .permissions(["BROWSE_PROJECTS"])
            .build();
        let dispatcher = gateway.dispatcher();

        dispatcher
            .run(
                GovernedOperation::new("delete_issue", "issue", OperationClass::Standard)
                    .with_scope(PermissionScope::issue("PROJ-1")),
                || Ok(()),
                |_| async { Ok(Value::Null) },
            )
            .await
            .unwrap();

        let security = dispatcher.audit().security_events(10);
        assert_eq!(security.len(), 1);
        assert!(security[0].error.as_deref().unwrap().contains("DELETE_ISSUES"));
    }

    #[tokio::test]
    async fn test_missing_capability_blocks_in_strict_mode() {
        let gateway = TestGateway::builder()
            .permissions(["BROWSE_PROJECTS"])
            .configure(|config| config.permissions.strict = true)
            .build();
        let dispatcher = gateway.dispatcher();

        let err = dispatcher
            .run(
                GovernedOperation::new("delete_issue", "issue", OperationClass::Standard),
                || Ok(()),
                |_| async { Ok(Value::Null) },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::PermissionDenied { .. }));
    }
}
