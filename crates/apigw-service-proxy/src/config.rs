//! Project configuration loaded from a `serverless.yml`-style YAML file.
//!
//! Only the keys the compiler reads are modelled; everything else in the
//! file is ignored.
//!
//! # File format
//!
//! ```yaml
//! service: my-service
//! provider:
//!   stage: dev               # default "dev"
//!   region: us-east-1        # default "us-east-1"
//!   apiName: custom-name     # default "<stage>-<service>"
//!   endpointType: REGIONAL   # EDGE (default) | REGIONAL | PRIVATE
//!   apiKeys: [key-a, key-b]  # checked at compile time
//!   usagePlan:
//!     quota: { limit: 5000, offset: 2, period: MONTH }
//!     throttle: { burstLimit: 200, rateLimit: 100 }
//!   apiGateway:              # attach to an existing REST API
//!     restApiId: abc123
//!     restApiRootResourceId: root123
//!     restApiResources: { users: res123 }
//! custom:
//!   apiGatewayServiceProxies:
//!     - sqs: { path: /sqs, method: post, queueName: my-queue }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;

/// Default stage when `provider.stage` is absent.
pub const DEFAULT_STAGE: &str = "dev";

/// Default region when `provider.region` is absent.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Top-level project config.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Service name, used in API and usage plan names.
    pub service: String,

    /// Provider settings.
    pub provider: ProviderConfig,

    /// Plugin settings; holds the service proxy list.
    pub custom: CustomConfig,
}

/// `provider` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProviderConfig {
    /// Deployment stage.
    pub stage: String,

    /// AWS region, used for endpoint URLs.
    pub region: String,

    /// REST API name override.
    pub api_name: Option<String>,

    /// REST API endpoint type.
    pub endpoint_type: Option<String>,

    /// API key names, kept raw so shape errors surface at compile time.
    pub api_keys: Option<Value>,

    /// Usage plan limits.
    pub usage_plan: Option<UsagePlanConfig>,

    /// Shared REST API settings.
    pub api_gateway: ApiGatewayConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            stage: DEFAULT_STAGE.to_string(),
            region: DEFAULT_REGION.to_string(),
            api_name: None,
            endpoint_type: None,
            api_keys: None,
            usage_plan: None,
            api_gateway: ApiGatewayConfig::default(),
        }
    }
}

/// `provider.usagePlan` section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UsagePlanConfig {
    /// Request quota.
    pub quota: Option<QuotaConfig>,
    /// Request rate limits.
    pub throttle: Option<ThrottleConfig>,
}

/// `provider.usagePlan.quota`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct QuotaConfig {
    /// Maximum requests per period.
    pub limit: Option<u64>,
    /// Requests subtracted from the first period.
    pub offset: Option<u64>,
    /// `DAY`, `WEEK` or `MONTH`.
    pub period: Option<String>,
}

/// `provider.usagePlan.throttle`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ThrottleConfig {
    /// Burst capacity.
    pub burst_limit: Option<u64>,
    /// Steady-state requests per second.
    pub rate_limit: Option<f64>,
}

/// `provider.apiGateway` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiGatewayConfig {
    /// Existing REST API to attach to (string or intrinsic).
    pub rest_api_id: Option<Value>,

    /// Root resource of the existing REST API.
    pub rest_api_root_resource_id: Option<Value>,

    /// Existing resources keyed by path.
    pub rest_api_resources: BTreeMap<String, Value>,

    /// `BinaryMediaTypes` of a created REST API.
    pub binary_media_types: Option<Vec<String>>,

    /// `MinimumCompressionSize` of a created REST API.
    pub minimum_compression_size: Option<u64>,

    /// Resource policy statements of a created REST API.
    pub resource_policy: Option<Vec<Value>>,

    /// Deployment description.
    pub description: Option<String>,
}

/// `custom` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CustomConfig {
    /// Raw service proxy descriptors.
    pub api_gateway_service_proxies: Vec<Value>,
}

impl ProjectConfig {
    /// Load config from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse config from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML of the expected shape.
    pub fn from_yaml(content: &str) -> crate::error::Result<Self> {
        Ok(serde_yaml_ng::from_str(content)?)
    }

    /// The raw service proxy descriptors, in configuration order.
    #[must_use]
    pub fn service_proxies(&self) -> &[Value] {
        &self.custom.api_gateway_service_proxies
    }

    /// Build the compile-time provider context for one deployment.
    ///
    /// `instance_id` makes the synthesized deployment's logical id unique
    /// per build; the CLI passes the current time in milliseconds.
    #[must_use]
    pub fn context(&self, instance_id: impl Into<String>) -> ProviderContext {
        let provider = &self.provider;
        ProviderContext {
            service: self.service.clone(),
            stage: provider.stage.clone(),
            region: provider.region.clone(),
            api_name: provider.api_name.clone(),
            endpoint_type: provider.endpoint_type.clone(),
            api_keys: provider.api_keys.clone(),
            usage_plan: provider.usage_plan.clone(),
            api_gateway: provider.api_gateway.clone(),
            instance_id: instance_id.into(),
        }
    }
}

/// Everything the compiler needs to know about the deployment target.
#[derive(Debug, Clone)]
pub struct ProviderContext {
    /// Service name.
    pub service: String,
    /// Deployment stage.
    pub stage: String,
    /// AWS region.
    pub region: String,
    /// REST API name override.
    pub api_name: Option<String>,
    /// REST API endpoint type.
    pub endpoint_type: Option<String>,
    /// Raw `apiKeys` value.
    pub api_keys: Option<Value>,
    /// Usage plan limits.
    pub usage_plan: Option<UsagePlanConfig>,
    /// Shared REST API settings.
    pub api_gateway: ApiGatewayConfig,
    /// Build-unique deployment token.
    pub instance_id: String,
}

impl ProviderContext {
    /// Context with default provider settings.
    #[must_use]
    pub fn new(
        service: impl Into<String>,
        stage: impl Into<String>,
        instance_id: impl Into<String>,
    ) -> Self {
        Self {
            service: service.into(),
            stage: stage.into(),
            region: DEFAULT_REGION.to_string(),
            api_name: None,
            endpoint_type: None,
            api_keys: None,
            usage_plan: None,
            api_gateway: ApiGatewayConfig::default(),
            instance_id: instance_id.into(),
        }
    }

    /// REST API name: the override, or `<stage>-<service>`.
    #[must_use]
    pub fn api_name(&self) -> String {
        self.api_name
            .clone()
            .unwrap_or_else(|| format!("{}-{}", self.stage, self.service))
    }

    /// Whether the proxies attach to an existing REST API.
    #[must_use]
    pub fn uses_shared_api(&self) -> bool {
        self.api_gateway.rest_api_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn deserialize_defaults() {
        let config = ProjectConfig::from_yaml("service: svc").unwrap();
        assert_eq!(config.provider.stage, "dev");
        assert_eq!(config.provider.region, "us-east-1");
        assert!(config.provider.api_keys.is_none());
        assert!(config.service_proxies().is_empty());
        assert_eq!(config.context("1").api_name(), "dev-svc");
    }

    #[test]
    fn deserialize_full() {
        let yaml = r"
service: orders
provider:
  stage: prod
  region: eu-west-1
  apiName: orders-api
  endpointType: regional
  apiKeys:
    - partner
  usagePlan:
    quota:
      limit: 5000
      period: MONTH
    throttle:
      burstLimit: 200
      rateLimit: 100
  apiGateway:
    restApiId: abc123
    restApiResources:
      users: res123
custom:
  apiGatewayServiceProxies:
    - sqs:
        path: /sqs
        method: post
        queueName: my-queue
";
        let config = ProjectConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.provider.stage, "prod");
        assert_eq!(config.provider.endpoint_type.as_deref(), Some("regional"));
        assert_eq!(config.provider.api_keys, Some(json!(["partner"])));

        let plan = config.provider.usage_plan.clone().unwrap();
        assert_eq!(plan.quota.unwrap().limit, Some(5000));
        assert_eq!(plan.throttle.unwrap().burst_limit, Some(200));

        assert_eq!(config.provider.api_gateway.rest_api_id, Some(json!("abc123")));
        assert_eq!(
            config.provider.api_gateway.rest_api_resources["users"],
            json!("res123")
        );

        assert_eq!(
            config.service_proxies(),
            &[json!({ "sqs": { "path": "/sqs", "method": "post", "queueName": "my-queue" } })]
        );

        let context = config.context("42");
        assert_eq!(context.api_name(), "orders-api");
        assert_eq!(context.instance_id, "42");
        assert!(context.uses_shared_api());
    }
}
