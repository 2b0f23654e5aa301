//! gRPC service implementation for the Terraform Plugin Protocol v6.9
//!
//! Data source instances are created on demand from the provider's factories
//! and configured with the shared provider data before every operation, so
//! no data source state survives between requests.

use crate::context::Context;
use crate::data_source::{
    ConfigureDataSourceRequest, DataSourceSchemaRequest, DataSourceWithConfigure,
    ReadDataSourceRequest, ValidateDataSourceConfigRequest,
};
use crate::proto::{self, provider_server::Provider as ProtoProvider, GrpcController};
use crate::provider::{
    ConfigureProviderRequest, Provider, ProviderData, ProviderSchemaRequest,
    ValidateProviderConfigRequest,
};
use crate::schema::{Attribute, ObjectNestingMode, Schema, StringKind};
use crate::types::{
    has_errors, AttributePath, AttributePathStep, ClientCapabilities, Deferred, DeferredReason,
    Diagnostic, DiagnosticSeverity, DynamicValue,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};

pub struct GrpcProviderServer<P: Provider> {
    provider: Arc<RwLock<P>>,
    provider_data: Arc<RwLock<Option<ProviderData>>>,
    stop: Context,
}

impl<P: Provider + 'static> GrpcProviderServer<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            provider_data: Arc::new(RwLock::new(None)),
            stop: Context::new(),
        }
    }

    /// Context cancelled by `StopProvider`; every request runs under it
    pub fn stop_context(&self) -> Context {
        self.stop.clone()
    }

    /// Build a data source from its factory and hand it the provider data
    async fn create_data_source(
        &self,
        ctx: &Context,
        type_name: &str,
    ) -> std::result::Result<(Box<dyn DataSourceWithConfigure>, Vec<Diagnostic>), Diagnostic>
    {
        let factory = {
            let provider = self.provider.read().await;
            provider.data_sources().remove(type_name)
        };

        let Some(factory) = factory else {
            return Err(Diagnostic::error(
                "Data Source Type Not Found",
                format!(
                    "The data source type {:?} is not supported by this provider",
                    type_name
                ),
            ));
        };

        let mut data_source = factory();
        let provider_data = self.provider_data.read().await.clone();
        let response = data_source
            .configure(ctx.clone(), ConfigureDataSourceRequest { provider_data })
            .await;

        Ok((data_source, response.diagnostics))
    }
}

#[tonic::async_trait]
impl<P: Provider + 'static> ProtoProvider for GrpcProviderServer<P> {
    async fn get_metadata(
        &self,
        _request: Request<proto::get_metadata::Request>,
    ) -> std::result::Result<Response<proto::get_metadata::Response>, Status> {
        let provider = self.provider.read().await;
        let mut type_names: Vec<String> = provider.data_sources().into_keys().collect();
        type_names.sort();

        Ok(Response::new(proto::get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            data_sources: type_names
                .into_iter()
                .map(|type_name| proto::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: vec![],
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<proto::get_provider_schema::Request>,
    ) -> std::result::Result<Response<proto::get_provider_schema::Response>, Status> {
        let ctx = self.stop.clone();
        let provider = self.provider.read().await;

        let provider_schema = provider.schema(ctx.clone(), ProviderSchemaRequest).await;
        let mut diagnostics = provider_schema.diagnostics;

        let mut data_source_schemas = HashMap::new();
        for (type_name, factory) in provider.data_sources() {
            let response = factory()
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await;
            diagnostics.extend(response.diagnostics);
            data_source_schemas.insert(type_name, schema_to_proto(&response.schema));
        }

        tracing::debug!(
            data_sources = data_source_schemas.len(),
            "Returning provider schema"
        );

        Ok(Response::new(proto::get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider_schema.schema)),
            resource_schemas: HashMap::new(),
            data_source_schemas,
            diagnostics: diagnostics_to_proto(diagnostics),
            provider_meta: None,
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<proto::validate_provider_config::Request>,
    ) -> std::result::Result<Response<proto::validate_provider_config::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;

        let provider = self.provider.read().await;
        let response = provider
            .validate(self.stop.clone(), ValidateProviderConfigRequest { config })
            .await;

        Ok(Response::new(proto::validate_provider_config::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<proto::validate_data_resource_config::Request>,
    ) -> std::result::Result<Response<proto::validate_data_resource_config::Response>, Status>
    {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;
        let ctx = self.stop.clone();

        let (data_source, mut diagnostics) =
            match self.create_data_source(&ctx, &req.type_name).await {
                Ok(created) => created,
                Err(diagnostic) => {
                    return Ok(Response::new(
                        proto::validate_data_resource_config::Response {
                            diagnostics: diagnostics_to_proto(vec![diagnostic]),
                        },
                    ))
                }
            };

        // Unknown config values are re-validated once they are known
        if !config.is_unknown() {
            let schema = data_source
                .schema(ctx.clone(), DataSourceSchemaRequest)
                .await
                .schema;
            diagnostics.extend(validate_against_schema(&schema, &config));

            let response = data_source
                .validate(
                    ctx,
                    ValidateDataSourceConfigRequest {
                        type_name: req.type_name,
                        config,
                    },
                )
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(proto::validate_data_resource_config::Response {
            diagnostics: diagnostics_to_proto(diagnostics),
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<proto::configure_provider::Request>,
    ) -> std::result::Result<Response<proto::configure_provider::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;

        tracing::debug!(
            terraform_version = %req.terraform_version,
            "configure_provider called"
        );

        let response = {
            let mut provider = self.provider.write().await;
            provider
                .configure(
                    self.stop.clone(),
                    ConfigureProviderRequest {
                        terraform_version: req.terraform_version,
                        config,
                        client_capabilities: client_capabilities_from_proto(
                            req.client_capabilities,
                        ),
                    },
                )
                .await
        };

        if !has_errors(&response.diagnostics) {
            *self.provider_data.write().await = response.provider_data;
        }

        Ok(Response::new(proto::configure_provider::Response {
            diagnostics: diagnostics_to_proto(response.diagnostics),
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<proto::read_data_source::Request>,
    ) -> std::result::Result<Response<proto::read_data_source::Response>, Status> {
        let req = request.into_inner();
        let config = decode_dynamic_value(req.config)?;
        let provider_meta = match req.provider_meta {
            Some(meta) => Some(decode_dynamic_value(Some(meta))?),
            None => None,
        };
        let ctx = self.stop.clone();

        tracing::debug!(type_name = %req.type_name, "read_data_source called");

        let (data_source, mut diagnostics) =
            match self.create_data_source(&ctx, &req.type_name).await {
                Ok(created) => created,
                Err(diagnostic) => {
                    return Ok(Response::new(proto::read_data_source::Response {
                        state: None,
                        diagnostics: diagnostics_to_proto(vec![diagnostic]),
                        deferred: None,
                    }))
                }
            };

        let response = data_source
            .read(
                ctx,
                ReadDataSourceRequest {
                    type_name: req.type_name,
                    config,
                    provider_meta,
                    client_capabilities: client_capabilities_from_proto(
                        req.client_capabilities,
                    ),
                },
            )
            .await;
        diagnostics.extend(response.diagnostics);

        Ok(Response::new(proto::read_data_source::Response {
            state: Some(encode_dynamic_value(&response.state)?),
            diagnostics: diagnostics_to_proto(diagnostics),
            deferred: response.deferred.map(deferred_to_proto),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<proto::stop_provider::Request>,
    ) -> std::result::Result<Response<proto::stop_provider::Response>, Status> {
        tracing::info!("Stop requested, cancelling in-flight operations");
        self.stop.cancel();

        Ok(Response::new(proto::stop_provider::Response {
            error: String::new(),
        }))
    }
}

/// go-plugin's controller service. The host calls `Shutdown` when it is done
/// with the plugin and kills the process if it has not exited shortly after.
pub struct PluginController {
    stop: Context,
}

impl PluginController {
    pub fn new(stop: Context) -> Self {
        Self { stop }
    }
}

#[tonic::async_trait]
impl GrpcController for PluginController {
    async fn shutdown(
        &self,
        _request: Request<proto::plugin::Empty>,
    ) -> std::result::Result<Response<proto::plugin::Empty>, Status> {
        tracing::info!("Shutdown requested by plugin host");
        self.stop.cancel();

        Ok(Response::new(proto::plugin::Empty {}))
    }
}

// Helper functions

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: false,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

/// Checks Terraform core does not do for data sources on its own:
/// attribute validators on known values
fn validate_against_schema(schema: &Schema, config: &DynamicValue) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for attr in &schema.block.attributes {
        let path = AttributePath::new(&attr.name);
        let value = config.get(&path);

        match value {
            None | Some(crate::types::Dynamic::Null) => {
                if attr.required {
                    diagnostics.push(
                        Diagnostic::error(
                            "Missing required argument",
                            format!("The argument \"{}\" is required, but no definition was found.", attr.name),
                        )
                        .with_attribute(path),
                    );
                }
            }
            Some(value) if value.contains_unknown() => {}
            Some(value) => {
                for validator in &attr.validators {
                    validator.validate(value, &path, &mut diagnostics);
                }
            }
        }
    }

    diagnostics
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.block.version,
            attributes: schema.block.attributes.iter().map(attribute_to_proto).collect(),
            block_types: vec![],
            description: schema.block.description.clone(),
            description_kind: string_kind_to_proto(schema.block.description_kind),
            deprecated: schema.block.deprecated,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    // Nested attributes describe their type through nested_type only
    let (r#type, nested_type) = match &attr.nested_type {
        Some(nested) => (
            Vec::new(),
            Some(proto::schema::Object {
                attributes: nested.attributes.iter().map(attribute_to_proto).collect(),
                nesting: object_nesting_to_proto(nested.nesting),
                ..Default::default()
            }),
        ),
        None => (attr.r#type.to_bytes(), None),
    };

    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type,
        nested_type,
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: string_kind_to_proto(StringKind::Plain),
        deprecated: attr.deprecated,
        write_only: false,
    }
}

fn string_kind_to_proto(kind: StringKind) -> i32 {
    match kind {
        StringKind::Plain => proto::StringKind::Plain as i32,
        StringKind::Markdown => proto::StringKind::Markdown as i32,
    }
}

fn object_nesting_to_proto(nesting: ObjectNestingMode) -> i32 {
    use proto::schema::object::NestingMode;

    let mode = match nesting {
        ObjectNestingMode::Invalid => NestingMode::Invalid,
        ObjectNestingMode::Single => NestingMode::Single,
        ObjectNestingMode::List => NestingMode::List,
        ObjectNestingMode::Set => NestingMode::Set,
        ObjectNestingMode::Map => NestingMode::Map,
    };
    mode as i32
}

fn diagnostics_to_proto(diagnostics: Vec<Diagnostic>) -> Vec<proto::Diagnostic> {
    diagnostics
        .into_iter()
        .map(|diag| {
            let severity = match diag.severity {
                DiagnosticSeverity::Invalid => proto::diagnostic::Severity::Invalid,
                DiagnosticSeverity::Error => proto::diagnostic::Severity::Error,
                DiagnosticSeverity::Warning => proto::diagnostic::Severity::Warning,
            };
            proto::Diagnostic {
                severity: severity as i32,
                summary: diag.summary,
                detail: diag.detail,
                attribute: diag.attribute.as_ref().map(attribute_path_to_proto),
            }
        })
        .collect()
}

fn attribute_path_to_proto(path: &AttributePath) -> proto::AttributePath {
    use proto::attribute_path::{step::Selector, Step};

    proto::AttributePath {
        steps: path
            .steps
            .iter()
            .map(|step| {
                let selector = match step {
                    AttributePathStep::AttributeName(name) => Selector::AttributeName(name.clone()),
                    AttributePathStep::ElementKeyString(key) => {
                        Selector::ElementKeyString(key.clone())
                    }
                    AttributePathStep::ElementKeyInt(idx) => Selector::ElementKeyInt(*idx),
                };
                Step {
                    selector: Some(selector),
                }
            })
            .collect(),
    }
}

fn deferred_to_proto(deferred: Deferred) -> proto::Deferred {
    use proto::deferred::Reason;

    let reason = match deferred.reason {
        DeferredReason::Unknown => Reason::Unknown,
        DeferredReason::ResourceConfigUnknown => Reason::ResourceConfigUnknown,
        DeferredReason::ProviderConfigUnknown => Reason::ProviderConfigUnknown,
        DeferredReason::AbsentPrereq => Reason::AbsentPrereq,
    };
    proto::Deferred {
        reason: reason as i32,
    }
}

fn client_capabilities_from_proto(
    capabilities: Option<proto::ClientCapabilities>,
) -> ClientCapabilities {
    capabilities
        .map(|c| ClientCapabilities {
            deferral_allowed: c.deferral_allowed,
            write_only_attributes_allowed: c.write_only_attributes_allowed,
        })
        .unwrap_or_default()
}

#[allow(clippy::result_large_err)]
fn decode_dynamic_value(
    value: Option<proto::DynamicValue>,
) -> std::result::Result<DynamicValue, Status> {
    let Some(value) = value else {
        return Ok(DynamicValue::null());
    };

    if !value.msgpack.is_empty() {
        DynamicValue::decode_msgpack(&value.msgpack).map_err(|e| {
            let preview = &value.msgpack[..value.msgpack.len().min(50)];
            tracing::debug!("Undecodable msgpack payload, first bytes: {:?}", preview);
            Status::invalid_argument(e.to_string())
        })
    } else if !value.json.is_empty() {
        DynamicValue::decode_json(&value.json).map_err(|e| Status::invalid_argument(e.to_string()))
    } else {
        Ok(DynamicValue::null())
    }
}

#[allow(clippy::result_large_err)]
fn encode_dynamic_value(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    let msgpack = value
        .encode_msgpack()
        .map_err(|e| Status::internal(e.to_string()))?;

    Ok(proto::DynamicValue {
        msgpack,
        json: vec![],
    })
}
