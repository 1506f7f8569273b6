//! gRPC + HTTP transports and daemon configuration.
//!
//! This module provides:
//! - Generated protobuf types (`proto`)
//! - Type conversions between native and proto types (`convert`)
//! - The gRPC service implementation (`service`)
//! - The legacy HTTP Track router (`http`)
//! - Configuration types (`config`)

pub mod config;
pub mod convert;
pub mod http;
pub mod service;

/// Re-exported generated proto types.
pub mod proto {
    tonic::include_proto!("heimdall.v1");
}

pub use config::{Config, ConfigError};
pub use service::HeimdallService;
