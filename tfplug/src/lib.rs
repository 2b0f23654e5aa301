//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building data-source providers in Rust, implementing the
//! Terraform Plugin Protocol v6.9.

// Core modules
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod data_source;
pub mod provider;

// Helper modules
pub mod validator;

// Framework implementation modules
pub mod grpc;
pub mod proto;
pub mod server;
pub mod tls;

// Re-exports for convenience
pub use context::Context;
pub use data_source::{DataSource, DataSourceFactory, DataSourceWithConfigure};
pub use error::{Result, TfplugError};
pub use grpc::GrpcProviderServer;
pub use provider::{Provider, ProviderData, ProviderMetadataRequest, ProviderMetadataResponse};
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, LogLevel, ServerConfig};
pub use types::{AttributePath, Diagnostic, Dynamic, DynamicValue};
