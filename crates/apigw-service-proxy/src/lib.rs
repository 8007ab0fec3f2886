#![allow(clippy::doc_markdown)] // README uses "CloudFormation" and AWS service names throughout
#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod compile;
mod config;
mod error;
mod info;
pub mod naming;
mod template;

pub use apigw_service_proxy_core::{
    normalize, parse, validate, Normalized, NormalizedEvent, SchemaError, SchemaErrorKind,
    ServiceKind, ValidationError,
};
pub use compile::{compile, CompileReport, ServiceProxyCompiler};
pub use config::{
    ApiGatewayConfig, CustomConfig, ProjectConfig, ProviderConfig, ProviderContext, QuotaConfig,
    ThrottleConfig, UsagePlanConfig, DEFAULT_REGION, DEFAULT_STAGE,
};
pub use error::{Error, Result};
pub use info::{endpoint_report, service_endpoint};
pub use template::{deep_merge, Fragment, Template, DEPLOYMENT_TYPE};
