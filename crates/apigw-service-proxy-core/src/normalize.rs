//! Normalization of validated proxies into compiler events.
//!
//! - Paths lose one leading and one trailing `/`
//! - Authorization is resolved into a [`MethodAuth`]
//! - CORS settings are expanded into [`CorsDescriptor`]s and merged per path
//!   into the preflight map

use std::collections::BTreeMap;

use serde_json::Value;

use crate::model::{
    AuthorizationType, CorsSetting, HttpMethod, ProxyTarget, ResponseTemplates, ServiceKind,
    ServiceProxy,
};

/// Headers allowed by default on CORS-enabled proxies.
pub const DEFAULT_CORS_HEADERS: [&str; 6] = [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
    "X-Amz-User-Agent",
];

/// Resolved method authorization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodAuth {
    /// Explicit type, or `NONE`.
    pub authorization_type: AuthorizationType,
    /// Custom authorizer id, copied verbatim.
    pub authorizer_id: Option<Value>,
    /// Cognito scopes, copied verbatim.
    pub authorization_scopes: Option<Vec<String>>,
}

/// Effective CORS settings for one proxy, or for one path once merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsDescriptor {
    /// Allowed origins (first-seen order, no duplicates).
    pub origins: Vec<String>,
    /// Explicit single origin.
    pub origin: Option<String>,
    /// Allowed methods, always including `OPTIONS` and each proxy's verb.
    pub methods: Vec<String>,
    /// Allowed headers.
    pub headers: Vec<String>,
    /// `Access-Control-Allow-Credentials`.
    pub allow_credentials: bool,
    /// `Access-Control-Max-Age`.
    pub max_age: Option<u64>,
    /// `Cache-Control` on preflight responses.
    pub cache_control: Option<String>,
}

impl CorsDescriptor {
    /// Expand a proxy's `cors` setting for the given verb.
    #[must_use]
    pub fn new(setting: &CorsSetting, method: HttpMethod) -> Self {
        let mut cors = match setting {
            CorsSetting::Enabled => Self {
                origins: vec!["*".to_string()],
                origin: Some("*".to_string()),
                methods: vec!["OPTIONS".to_string()],
                headers: DEFAULT_CORS_HEADERS.iter().map(ToString::to_string).collect(),
                allow_credentials: false,
                max_age: None,
                cache_control: None,
            },
            CorsSetting::Custom(config) => Self {
                origins: config.origins.clone().unwrap_or_default(),
                origin: config.origin.clone(),
                methods: config.methods.clone().unwrap_or_default(),
                headers: config.headers.clone().unwrap_or_else(|| {
                    DEFAULT_CORS_HEADERS.iter().map(ToString::to_string).collect()
                }),
                allow_credentials: config.allow_credentials,
                max_age: config.max_age,
                cache_control: config.cache_control.clone(),
            },
        };

        push_unique(&mut cors.methods, "OPTIONS");
        push_unique(&mut cors.methods, method.as_upper());
        cors
    }

    /// Value of the `Access-Control-Allow-Origin` header.
    ///
    /// The explicit `origin` wins; otherwise the `origins` list is joined
    /// with commas; otherwise `*`.
    #[must_use]
    pub fn allow_origin(&self) -> String {
        if let Some(origin) = &self.origin {
            return origin.clone();
        }
        if self.origins.is_empty() {
            "*".to_string()
        } else {
            self.origins.join(",")
        }
    }

    /// Fold a later proxy's settings for the same path into this one.
    ///
    /// Lists are unioned in first-seen order. `origin`, `maxAge` and
    /// `cacheControl` follow the later proxy when it sets them. Credentials
    /// stay allowed once any proxy allows them.
    pub fn merge(&mut self, later: &Self) {
        for origin in &later.origins {
            push_unique(&mut self.origins, origin);
        }
        for method in &later.methods {
            push_unique(&mut self.methods, method);
        }
        for header in &later.headers {
            push_unique(&mut self.headers, header);
        }
        if later.origin.is_some() {
            self.origin.clone_from(&later.origin);
        }
        self.allow_credentials |= later.allow_credentials;
        if later.max_age.is_some() {
            self.max_age = later.max_age;
        }
        if later.cache_control.is_some() {
            self.cache_control.clone_from(&later.cache_control);
        }
    }
}

fn push_unique(items: &mut Vec<String>, item: &str) {
    if !items.iter().any(|existing| existing == item) {
        items.push(item.to_string());
    }
}

/// HTTP side of a normalized event.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHttp {
    /// Path without the outer slashes.
    pub path: String,
    /// Bound verb.
    pub method: HttpMethod,
    /// Resolved authorization.
    pub auth: MethodAuth,
    /// This proxy's own CORS settings (not merged with its path siblings).
    pub cors: Option<CorsDescriptor>,
    /// Require an API key.
    pub private: bool,
    /// Caller-supplied execution role.
    pub role_arn: Option<Value>,
    /// Custom request templates keyed by content type.
    pub request_templates: BTreeMap<String, String>,
    /// Custom response templates.
    pub response_templates: Option<ResponseTemplates>,
}

/// One compiler input, one-to-one with the configured descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedEvent {
    /// HTTP binding.
    pub http: NormalizedHttp,
    /// Backing service settings.
    pub target: ProxyTarget,
}

impl NormalizedEvent {
    /// The service this event belongs to.
    #[must_use]
    pub const fn service(&self) -> ServiceKind {
        self.target.kind()
    }
}

/// Normalizer output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Normalized {
    /// Events in configuration order.
    pub events: Vec<NormalizedEvent>,
    /// Merged CORS settings per normalized path.
    pub cors_preflight: BTreeMap<String, CorsDescriptor>,
}

impl Normalized {
    /// Events belonging to one service, in configuration order.
    pub fn events_for(&self, service: ServiceKind) -> impl Iterator<Item = &NormalizedEvent> {
        self.events.iter().filter(move |e| e.service() == service)
    }
}

/// Strip exactly one leading and one trailing `/`.
#[must_use]
pub fn normalize_path(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    path.strip_suffix('/').unwrap_or(path).to_string()
}

/// Normalize validated proxies into events and the CORS preflight map.
#[must_use]
pub fn normalize(proxies: &[ServiceProxy]) -> Normalized {
    let mut normalized = Normalized::default();

    for proxy in proxies {
        let http = &proxy.http;
        let path = normalize_path(&http.path);
        let cors = http
            .cors
            .as_ref()
            .map(|setting| CorsDescriptor::new(setting, http.method));

        if let Some(cors) = &cors {
            normalized
                .cors_preflight
                .entry(path.clone())
                .and_modify(|existing| existing.merge(cors))
                .or_insert_with(|| cors.clone());
        }

        normalized.events.push(NormalizedEvent {
            http: NormalizedHttp {
                path,
                method: http.method,
                auth: MethodAuth {
                    authorization_type: http.authorization_type.unwrap_or_default(),
                    authorizer_id: http.authorizer_id.clone(),
                    authorization_scopes: http.authorization_scopes.clone(),
                },
                cors,
                private: http.private,
                role_arn: http.role_arn.clone(),
                request_templates: http.request_templates.clone(),
                response_templates: http.response_templates.clone(),
            },
            target: proxy.target.clone(),
        });
    }

    tracing::debug!(
        events = normalized.events.len(),
        cors_paths = normalized.cors_preflight.len(),
        "service proxies normalized"
    );
    normalized
}
