//! Per-service compilers.
//!
//! Each compiler consumes the events of its own service and emits one shared
//! IAM role (unless every event brings its own `roleArn`) plus one REST
//! method per event. The six differ only in their policy grants and
//! integration blocks, which is what [`ServiceCompiler`] captures.

mod dynamodb;
mod eventbridge;
mod kinesis;
mod s3;
mod sns;
mod sqs;

use apigw_service_proxy_core::model::ProxyTarget;
use apigw_service_proxy_core::{Normalized, NormalizedEvent, ServiceKind};
use serde_json::Value;

pub use dynamodb::Dynamodb;
pub use eventbridge::EventBridge;
pub use kinesis::Kinesis;
pub use s3::S3;
pub use sns::Sns;
pub use sqs::Sqs;

use super::helpers::{self, ApiRefs, Integration};
use super::{Stage, StageContext};
use crate::error::Result;
use crate::naming;
use crate::template::Fragment;

/// What a service contributes to roles and methods.
pub trait ServiceCompiler {
    /// Service-specific half of the descriptor.
    type Target: PartialEq;

    /// Service handled.
    const KIND: ServiceKind;

    /// Pick this service's target out of an event.
    fn target(target: &ProxyTarget) -> Option<&Self::Target>;

    /// Policy statements granting access to `targets`.
    ///
    /// `targets` holds one entry per event without a custom role, in event
    /// order; compilers deduplicate as they see fit.
    fn policy_statements(&self, targets: &[&Self::Target]) -> Vec<Value>;

    /// Integration block of one event's method.
    fn integration(&self, event: &NormalizedEvent, target: &Self::Target) -> Integration;

    /// The shared role, or nothing when no event needs it.
    fn compile_iam_role(&self, normalized: &Normalized) -> Fragment {
        let targets: Vec<&Self::Target> = normalized
            .events_for(Self::KIND)
            .filter(|event| event.http.role_arn.is_none())
            .filter_map(|event| Self::target(&event.target))
            .collect();

        let mut fragment = Fragment::new();
        if targets.is_empty() {
            return fragment;
        }

        let role_id = naming::role(Self::KIND);
        let statements = self.policy_statements(&targets);
        tracing::debug!(role = role_id, statements = statements.len(), "compiled role");
        fragment.add_resource(role_id, helpers::iam_role(Self::KIND, statements));
        fragment
    }

    /// One method per event of this service.
    fn compile_methods(&self, normalized: &Normalized, api: &ApiRefs) -> Fragment {
        let mut fragment = Fragment::new();
        for event in normalized.events_for(Self::KIND) {
            let Some(target) = Self::target(&event.target) else {
                continue;
            };
            let integration = self.integration(event, target);
            let (logical_id, method) = helpers::method_resource(event, integration, api);
            tracing::debug!(method = %logical_id, path = %event.http.path, "compiled method");
            fragment.add_method(logical_id, method);
        }
        fragment
    }
}

/// Runs a [`ServiceCompiler`] as a pipeline stage.
pub struct ServiceStage<C>(pub C);

impl<C: ServiceCompiler> Stage for ServiceStage<C> {
    fn name(&self) -> &'static str {
        C::KIND.tag()
    }

    fn compile(&self, cx: &StageContext<'_>) -> Result<Fragment> {
        let mut fragment = self.0.compile_iam_role(cx.normalized);
        fragment.append(self.0.compile_methods(cx.normalized, cx.api));
        Ok(fragment)
    }
}

/// Arn of a backing resource, as `Fn::Sub` over `name`.
///
/// `pattern` names the resource with `${<var>}`.
pub(super) fn resource_arn(pattern: &str, var: &str, name: Value) -> Value {
    helpers::sub_with(pattern, helpers::vars([(var, name)]))
}
