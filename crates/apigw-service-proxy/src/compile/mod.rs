//! Compilation pipeline.
//!
//! Stages run in a fixed order, each turning the normalized events into a
//! [`Fragment`] that is merged into the template:
//! - [`rest_api`]: the REST API and its resource tree
//! - [`cors`]: `OPTIONS` preflight methods
//! - [`services`]: one role and one method per event, per service
//! - [`deployment`]: dependency edges from every method to the deployment
//! - [`api_keys`]: API keys and usage plan, bound to that deployment

mod api_keys;
mod cors;
mod deployment;
mod helpers;
mod rest_api;
mod services;

use apigw_service_proxy_core::{normalize, Normalized};
use serde_json::Value;

use crate::config::ProviderContext;
use crate::error::Result;
use crate::template::{Fragment, Template};

use self::helpers::ApiRefs;
use self::services::ServiceStage;

/// Inputs shared by every stage.
pub struct StageContext<'a> {
    /// Deployment target settings.
    pub provider: &'a ProviderContext,
    /// Normalized events and CORS preflight map.
    pub normalized: &'a Normalized,
    /// REST API and resource references.
    pub api: &'a ApiRefs,
}

/// One step of the pipeline.
pub trait Stage {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Produce this stage's resources.
    fn compile(&self, cx: &StageContext<'_>) -> Result<Fragment>;
}

fn stages() -> Vec<Box<dyn Stage>> {
    vec![
        Box::new(rest_api::RestApi),
        Box::new(rest_api::ResourceTree),
        Box::new(cors::Cors),
        Box::new(ServiceStage(services::Kinesis)),
        Box::new(ServiceStage(services::Sqs)),
        Box::new(ServiceStage(services::S3)),
        Box::new(ServiceStage(services::Sns)),
        Box::new(ServiceStage(services::Dynamodb)),
        Box::new(ServiceStage(services::EventBridge)),
    ]
}

/// What a compilation added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileReport {
    /// Number of service proxies compiled.
    pub events: usize,
    /// Generated method ids, in generation order.
    pub method_ids: Vec<String>,
    /// Deployment the methods were wired to, if any proxies were configured.
    pub deployment_id: Option<String>,
}

/// Compiles service proxy descriptors into a template.
///
/// # Example
///
/// ```ignore
/// let compiler = ServiceProxyCompiler::new(project.context("1700000000000"));
/// let report = compiler.compile(project.service_proxies(), &mut template)?;
/// ```
#[derive(Debug, Clone)]
pub struct ServiceProxyCompiler {
    provider: ProviderContext,
}

impl ServiceProxyCompiler {
    /// Compiler for one deployment target.
    #[must_use]
    pub fn new(provider: ProviderContext) -> Self {
        Self { provider }
    }

    /// The deployment target.
    #[must_use]
    pub fn provider(&self) -> &ProviderContext {
        &self.provider
    }

    /// Validate, normalize and compile `descriptors` into `template`.
    ///
    /// An empty descriptor list leaves the template untouched. On error the
    /// template is left as it was.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`](crate::Error::Validation) for schema
    /// violations and [`Error::Config`](crate::Error::Config) for malformed
    /// provider settings.
    pub fn compile(&self, descriptors: &[Value], template: &mut Template) -> Result<CompileReport> {
        if descriptors.is_empty() {
            tracing::debug!("no service proxies configured");
            return Ok(CompileReport::default());
        }

        let proxies = apigw_service_proxy_core::parse(descriptors)?;
        let normalized = normalize(&proxies);
        let api = ApiRefs::new(&self.provider);
        let cx = StageContext {
            provider: &self.provider,
            normalized: &normalized,
            api: &api,
        };

        let mut working = template.clone();
        let mut method_ids = Vec::new();
        for stage in stages() {
            let fragment = stage.compile(&cx)?;
            tracing::debug!(
                stage = stage.name(),
                resources = fragment.resources().len(),
                "stage compiled"
            );
            method_ids.extend(working.merge(fragment));
        }

        let (fragment, deployment_id) = deployment::merge_deployment(&working, &method_ids, &cx);
        working.merge(fragment);
        working.merge(api_keys::compile_api_keys(&cx, &deployment_id)?);

        tracing::info!(
            events = normalized.events.len(),
            methods = method_ids.len(),
            deployment = %deployment_id,
            "service proxies compiled"
        );
        *template = working;

        Ok(CompileReport {
            events: normalized.events.len(),
            method_ids,
            deployment_id: Some(deployment_id),
        })
    }
}

/// Compile `descriptors` for `provider` into `template`.
///
/// Shorthand for [`ServiceProxyCompiler::compile`].
///
/// # Errors
///
/// See [`ServiceProxyCompiler::compile`].
pub fn compile(
    descriptors: &[Value],
    provider: ProviderContext,
    template: &mut Template,
) -> Result<CompileReport> {
    ServiceProxyCompiler::new(provider).compile(descriptors, template)
}
