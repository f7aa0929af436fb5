//! # gitgate-rpc
//!
//! The boundary between an untrusted UI and the git controllers. Requests
//! are rate limited per method, checked against parameter schemas, dispatched
//! to registered handlers, and answered with exactly one response whose
//! error text has been stripped of paths, addresses and long hashes.

pub mod config;
pub mod error;
pub mod gateway;
pub mod rate_limit;
pub mod registry;
pub mod sanitize;
pub mod schema;
pub mod validator;
pub mod wire;

pub use config::{GatewayConfig, RateLimitConfig, ValidationConfig};
pub use error::{GatewayError, RateLimitError, Result, ValidationError};
pub use gateway::{Handler, RpcGateway, format_error};
pub use rate_limit::{RateLimiter, RateStats};
pub use registry::OperationRegistry;
pub use schema::ParamSchema;
pub use validator::ParameterValidator;
pub use wire::{Request, RequestId, Response};
