#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! ## API Reference

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod model;
mod normalize;
mod schema;

pub use model::{ServiceKind, ServiceProxy};
pub use normalize::{
    normalize, normalize_path, CorsDescriptor, MethodAuth, Normalized, NormalizedEvent,
    NormalizedHttp, DEFAULT_CORS_HEADERS,
};
pub use schema::{parse, validate, SchemaError, SchemaErrorKind, ValidationError};
