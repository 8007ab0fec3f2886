//! Typed service proxy descriptors.
//!
//! Produced by [`crate::parse`] from the raw configuration values. Every
//! descriptor names exactly one backing AWS service ([`ServiceKind`]); the
//! HTTP side ([`HttpSpec`]) is shared by all six shapes while the
//! service-specific side lives in [`ProxyTarget`].

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Value};

/// The AWS service a proxy integrates with directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ServiceKind {
    /// Kinesis Data Streams (`PutRecord` / `PutRecords`).
    Kinesis,
    /// SQS queue publishing (`SendMessage`).
    Sqs,
    /// S3 object access through the REST path API.
    S3,
    /// SNS topic publishing (`Publish`).
    Sns,
    /// DynamoDB single-item reads and writes.
    Dynamodb,
    /// EventBridge event bus publishing (`PutEvents`).
    EventBridge,
}

impl ServiceKind {
    /// All supported services, in configuration documentation order.
    pub const ALL: [Self; 6] = [
        Self::Kinesis,
        Self::Sqs,
        Self::S3,
        Self::Sns,
        Self::Dynamodb,
        Self::EventBridge,
    ];

    /// Configuration key naming this service (e.g. `"kinesis"`).
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Kinesis => "kinesis",
            Self::Sqs => "sqs",
            Self::S3 => "s3",
            Self::Sns => "sns",
            Self::Dynamodb => "dynamodb",
            Self::EventBridge => "eventbridge",
        }
    }

    /// Look up a service by its configuration key.
    #[must_use]
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Comma-separated list of every supported tag, for error messages.
    #[must_use]
    pub fn supported_tags() -> String {
        Self::ALL
            .iter()
            .map(|kind| kind.tag())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// HTTP verbs a service proxy may be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `PUT`
    Put,
    /// `PATCH`
    Patch,
    /// `OPTIONS`
    Options,
    /// `HEAD`
    Head,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Every accepted verb.
    pub const ALL: [Self; 7] = [
        Self::Get,
        Self::Post,
        Self::Put,
        Self::Patch,
        Self::Options,
        Self::Head,
        Self::Delete,
    ];

    /// Parse a verb case-insensitively.
    #[must_use]
    pub fn parse(method: &str) -> Option<Self> {
        let lower = method.to_ascii_lowercase();
        Self::ALL.into_iter().find(|m| m.as_lower() == lower)
    }

    /// Lower-case form, as used in normalized events and logical ids.
    #[must_use]
    pub const fn as_lower(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Patch => "patch",
            Self::Options => "options",
            Self::Head => "head",
            Self::Delete => "delete",
        }
    }

    /// Upper-case form, as emitted in `HttpMethod` and CORS method lists.
    #[must_use]
    pub const fn as_upper(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Options => "OPTIONS",
            Self::Head => "HEAD",
            Self::Delete => "DELETE",
        }
    }
}

/// Method authorization modes accepted by API Gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationType {
    /// Open method.
    #[default]
    None,
    /// SigV4-signed callers.
    AwsIam,
    /// Lambda (custom) authorizer, referenced through `authorizerId`.
    Custom,
    /// Cognito user pool authorizer with optional OAuth scopes.
    CognitoUserPools,
}

impl AuthorizationType {
    /// Every accepted mode.
    pub const ALL: [Self; 4] = [
        Self::None,
        Self::AwsIam,
        Self::Custom,
        Self::CognitoUserPools,
    ];

    /// Parse the exact configuration spelling (e.g. `"AWS_IAM"`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Template spelling.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::AwsIam => "AWS_IAM",
            Self::Custom => "CUSTOM",
            Self::CognitoUserPools => "COGNITO_USER_POOLS",
        }
    }
}

/// Name of a backing AWS resource: a literal or an intrinsic reference
/// resolved at deploy time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceName {
    /// Plain name, e.g. `"my-bucket"`.
    Literal(String),
    /// `{ Ref: <logical id> }`
    Ref(String),
    /// `{ 'Fn::GetAtt': [<logical id>, <attribute>] }`
    GetAtt {
        /// Logical id of the referenced resource.
        logical_id: String,
        /// Attribute name (e.g. `QueueName`).
        attribute: String,
    },
}

impl ResourceName {
    /// Render back into template form.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Literal(name) => Value::String(name.clone()),
            Self::Ref(logical_id) => json!({ "Ref": logical_id }),
            Self::GetAtt {
                logical_id,
                attribute,
            } => json!({ "Fn::GetAtt": [logical_id, attribute] }),
        }
    }
}

/// Where a request-time value comes from.
///
/// Exactly one source applies; configurations naming more than one are
/// rejected during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamSource {
    /// Constant value used verbatim.
    Literal(String),
    /// `{ pathParam: name }`
    PathParam(String),
    /// `{ queryStringParam: name }`
    QueryStringParam(String),
    /// `{ bodyParam: dotted.name }`
    BodyParam(String),
}

impl ParamSource {
    /// Mapping-template expression that yields this value at request time.
    #[must_use]
    pub fn template_expression(&self) -> String {
        match self {
            Self::Literal(value) => value.clone(),
            Self::PathParam(name) => format!("$input.params().path.{name}"),
            Self::QueryStringParam(name) => format!("$input.params().querystring.{name}"),
            Self::BodyParam(name) => format!("$util.parseJson($input.body).{name}"),
        }
    }
}

/// The `cors` setting of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorsSetting {
    /// `cors: true`, all defaults.
    Enabled,
    /// `cors: { ... }`
    Custom(CorsConfig),
}

/// Explicit CORS configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsConfig {
    /// Single allowed origin.
    pub origin: Option<String>,
    /// Allowed origins list.
    pub origins: Option<Vec<String>>,
    /// Allowed methods; `OPTIONS` and the proxy's own verb are always added.
    pub methods: Option<Vec<String>>,
    /// Allowed headers; defaults to [`crate::DEFAULT_CORS_HEADERS`].
    pub headers: Option<Vec<String>>,
    /// `Access-Control-Allow-Credentials`.
    pub allow_credentials: bool,
    /// `Access-Control-Max-Age` in seconds.
    pub max_age: Option<u64>,
    /// `Cache-Control` header on preflight responses.
    pub cache_control: Option<String>,
}

/// Custom response mapping templates, keyed by outcome.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseTemplates {
    /// Template for 2xx responses.
    pub success: Option<String>,
    /// Template for 4xx responses.
    pub client_error: Option<String>,
    /// Template for 5xx responses.
    pub server_error: Option<String>,
}

/// HTTP-facing settings shared by all proxy shapes.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpSpec {
    /// Resource path as configured (slashes not yet stripped).
    pub path: String,
    /// Bound verb.
    pub method: HttpMethod,
    /// CORS setting; `None` when absent or `false`.
    pub cors: Option<CorsSetting>,
    /// Explicit authorization type.
    pub authorization_type: Option<AuthorizationType>,
    /// Custom authorizer id (string or intrinsic).
    pub authorizer_id: Option<Value>,
    /// Cognito OAuth scopes.
    pub authorization_scopes: Option<Vec<String>>,
    /// Require an API key.
    pub private: bool,
    /// Caller-supplied execution role (string or intrinsic).
    pub role_arn: Option<Value>,
    /// Custom request templates keyed by content type.
    pub request_templates: BTreeMap<String, String>,
    /// Custom response templates.
    pub response_templates: Option<ResponseTemplates>,
}

/// Kinesis write action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KinesisAction {
    /// Single record per request.
    #[default]
    PutRecord,
    /// Batch of records from the `records` body array.
    PutRecords,
}

impl KinesisAction {
    /// AWS action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PutRecord => "PutRecord",
            Self::PutRecords => "PutRecords",
        }
    }
}

/// `kinesis` proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KinesisTarget {
    /// Target stream.
    pub stream_name: ResourceName,
    /// Partition key source; the request id when absent.
    pub partition_key: Option<ParamSource>,
    /// Write action.
    pub action: KinesisAction,
}

/// `sqs` proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqsTarget {
    /// Target queue.
    pub queue_name: ResourceName,
    /// Extra integration request parameters.
    pub request_parameters: BTreeMap<String, String>,
    /// Method request parameters to declare (name → required).
    pub accept_parameters: BTreeMap<String, bool>,
}

/// S3 object action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum S3Action {
    /// Read an object.
    GetObject,
    /// Write an object.
    PutObject,
    /// Remove an object.
    DeleteObject,
}

impl S3Action {
    /// Every accepted action.
    pub const ALL: [Self; 3] = [Self::GetObject, Self::PutObject, Self::DeleteObject];

    /// Parse the exact action name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }

    /// AWS action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::GetObject => "GetObject",
            Self::PutObject => "PutObject",
            Self::DeleteObject => "DeleteObject",
        }
    }

    /// HTTP verb of the S3 REST call.
    #[must_use]
    pub const fn http_method(self) -> &'static str {
        match self {
            Self::GetObject => "GET",
            Self::PutObject => "PUT",
            Self::DeleteObject => "DELETE",
        }
    }
}

/// Object key of an S3 proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectKey {
    /// Fixed key.
    Static(String),
    /// `{ pathParam: name }`
    PathParam(String),
    /// `{ queryStringParam: name }`
    QueryStringParam(String),
}

/// `s3` proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Target {
    /// Object action.
    pub action: S3Action,
    /// Target bucket.
    pub bucket: ResourceName,
    /// Object key source.
    pub key: ObjectKey,
    /// Forward `Range` requests and answer 206.
    pub partial_content: bool,
    /// Extra integration request parameters.
    pub request_parameters: BTreeMap<String, String>,
}

/// `sns` proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnsTarget {
    /// Target topic.
    pub topic_name: ResourceName,
}

/// DynamoDB item action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DynamodbAction {
    /// Write an item from the request body.
    PutItem,
    /// Read an item by key.
    GetItem,
    /// Remove an item by key.
    DeleteItem,
}

impl DynamodbAction {
    /// Every accepted action.
    pub const ALL: [Self; 3] = [Self::PutItem, Self::GetItem, Self::DeleteItem];

    /// Parse the exact action name.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|a| a.as_str() == value)
    }

    /// AWS action name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PutItem => "PutItem",
            Self::GetItem => "GetItem",
            Self::DeleteItem => "DeleteItem",
        }
    }
}

/// Request location of a table key value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// `{ pathParam: name }`
    PathParam(String),
    /// `{ queryStringParam: name }`
    QueryStringParam(String),
}

impl KeySource {
    /// Parameter name, which doubles as the attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::PathParam(name) | Self::QueryStringParam(name) => name,
        }
    }

    /// Mapping-template expression for the key value.
    #[must_use]
    pub fn template_expression(&self) -> String {
        match self {
            Self::PathParam(name) => format!("$input.params().path.{name}"),
            Self::QueryStringParam(name) => format!("$input.params().querystring.{name}"),
        }
    }
}

/// Hash or range key of a DynamoDB proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableKey {
    /// Value source.
    pub source: KeySource,
    /// DynamoDB attribute type (`S`, `N`, `B`, ...).
    pub attribute_type: String,
}

/// `dynamodb` proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamodbTarget {
    /// Target table.
    pub table_name: ResourceName,
    /// Item action.
    pub action: DynamodbAction,
    /// Partition key; required for reads and deletes.
    pub hash_key: Option<TableKey>,
    /// Sort key.
    pub range_key: Option<TableKey>,
    /// `ConditionExpression` for writes and deletes.
    pub condition: Option<String>,
}

/// `eventbridge` proxy settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventBridgeTarget {
    /// Target event bus.
    pub event_bus_name: ResourceName,
    /// Event `Source`.
    pub source: ParamSource,
    /// Event `DetailType`; the request id when absent.
    pub detail_type: Option<ParamSource>,
    /// Event `Detail`; the whole body when absent.
    pub detail: Option<ParamSource>,
}

/// Service-specific half of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProxyTarget {
    /// `kinesis`
    Kinesis(KinesisTarget),
    /// `sqs`
    Sqs(SqsTarget),
    /// `s3`
    S3(S3Target),
    /// `sns`
    Sns(SnsTarget),
    /// `dynamodb`
    Dynamodb(DynamodbTarget),
    /// `eventbridge`
    EventBridge(EventBridgeTarget),
}

impl ProxyTarget {
    /// The service this target belongs to.
    #[must_use]
    pub const fn kind(&self) -> ServiceKind {
        match self {
            Self::Kinesis(_) => ServiceKind::Kinesis,
            Self::Sqs(_) => ServiceKind::Sqs,
            Self::S3(_) => ServiceKind::S3,
            Self::Sns(_) => ServiceKind::Sns,
            Self::Dynamodb(_) => ServiceKind::Dynamodb,
            Self::EventBridge(_) => ServiceKind::EventBridge,
        }
    }
}

/// A validated service proxy descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceProxy {
    /// HTTP binding.
    pub http: HttpSpec,
    /// Backing service settings.
    pub target: ProxyTarget,
}

impl ServiceProxy {
    /// The service this proxy integrates with.
    #[must_use]
    pub const fn service(&self) -> ServiceKind {
        self.target.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_tags_round_trip() {
        for kind in ServiceKind::ALL {
            assert_eq!(ServiceKind::from_tag(kind.tag()), Some(kind));
        }
        assert_eq!(ServiceKind::from_tag("lambda"), None);
        assert_eq!(
            ServiceKind::supported_tags(),
            "kinesis, sqs, s3, sns, dynamodb, eventbridge"
        );
    }

    #[test]
    fn http_method_parse_is_case_insensitive() {
        assert_eq!(HttpMethod::parse("POST"), Some(HttpMethod::Post));
        assert_eq!(HttpMethod::parse("Delete"), Some(HttpMethod::Delete));
        assert_eq!(HttpMethod::parse("any"), None);
        assert_eq!(HttpMethod::Patch.as_upper(), "PATCH");
    }

    #[test]
    fn resource_name_values() {
        assert_eq!(
            ResourceName::Literal("bucket".into()).to_value(),
            json!("bucket")
        );
        assert_eq!(
            ResourceName::Ref("MyBucket".into()).to_value(),
            json!({ "Ref": "MyBucket" })
        );
        assert_eq!(
            ResourceName::GetAtt {
                logical_id: "MyQueue".into(),
                attribute: "QueueName".into(),
            }
            .to_value(),
            json!({ "Fn::GetAtt": ["MyQueue", "QueueName"] })
        );
    }

    #[test]
    fn param_source_expressions() {
        assert_eq!(
            ParamSource::PathParam("id".into()).template_expression(),
            "$input.params().path.id"
        );
        assert_eq!(
            ParamSource::QueryStringParam("id".into()).template_expression(),
            "$input.params().querystring.id"
        );
        assert_eq!(
            ParamSource::BodyParam("data.id".into()).template_expression(),
            "$util.parseJson($input.body).data.id"
        );
        assert_eq!(
            ParamSource::Literal("fixed".into()).template_expression(),
            "fixed"
        );
    }
}
