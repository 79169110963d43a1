use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Notify;
use tonic::{Request, Response, Status};

use crate::provider::EnvProvider;
use crate::provider::schema::Schema;
use crate::provider::value::Value;

use super::convert;
use super::proto::plugin;
use super::proto::tfplugin6 as pb;

/// `tfplugin6.Provider` backed by an [`EnvProvider`].
#[derive(Debug, Clone)]
pub struct GrpcProvider {
    provider: Arc<EnvProvider>,
}

impl GrpcProvider {
    pub fn new(provider: EnvProvider) -> Self {
        Self {
            provider: Arc::new(provider),
        }
    }

    fn capabilities() -> pb::ServerCapabilities {
        pb::ServerCapabilities {
            plan_destroy: true,
            get_provider_schema_optional: true,
            move_resource_state: false,
        }
    }

    fn functions(&self) -> HashMap<String, pb::Function> {
        self.provider
            .functions()
            .map(|function| {
                (
                    function.name().to_owned(),
                    convert::function(&function.definition()),
                )
            })
            .collect()
    }
}

#[tonic::async_trait]
impl pb::provider_server::Provider for GrpcProvider {
    async fn get_metadata(
        &self,
        _request: Request<pb::get_metadata::Request>,
    ) -> Result<Response<pb::get_metadata::Response>, Status> {
        tracing::debug!("GetMetadata");
        Ok(Response::new(pb::get_metadata::Response {
            server_capabilities: Some(Self::capabilities()),
            diagnostics: Vec::new(),
            data_sources: self
                .provider
                .data_source_names()
                .map(|type_name| pb::get_metadata::DataSourceMetadata { type_name })
                .collect(),
            resources: Vec::new(),
            functions: self
                .provider
                .functions()
                .map(|function| pb::get_metadata::FunctionMetadata {
                    name: function.name().to_owned(),
                })
                .collect(),
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<pb::get_provider_schema::Request>,
    ) -> Result<Response<pb::get_provider_schema::Response>, Status> {
        tracing::debug!("GetProviderSchema");
        Ok(Response::new(pb::get_provider_schema::Response {
            provider: Some(convert::schema(&self.provider.schema())),
            resource_schemas: HashMap::new(),
            data_source_schemas: self
                .provider
                .data_sources()
                .map(|(type_name, data_source)| (type_name, convert::schema(&data_source.schema())))
                .collect(),
            diagnostics: Vec::new(),
            provider_meta: Some(convert::schema(&Schema::new())),
            server_capabilities: Some(Self::capabilities()),
            functions: self.functions(),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<pb::validate_provider_config::Request>,
    ) -> Result<Response<pb::validate_provider_config::Response>, Status> {
        tracing::debug!("ValidateProviderConfig");
        let diagnostics = match convert::decode_value(request.get_ref().config.as_ref()) {
            Ok(config) => convert::diagnostics(self.provider.validate_config(&config)),
            Err(err) => vec![convert::invalid_value("provider configuration", &err)],
        };
        Ok(Response::new(pb::validate_provider_config::Response {
            diagnostics,
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<pb::configure_provider::Request>,
    ) -> Result<Response<pb::configure_provider::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(terraform_version = %request.terraform_version, "ConfigureProvider");
        let diagnostics = match convert::decode_value(request.config.as_ref()) {
            Ok(config) => convert::diagnostics(
                self.provider
                    .configure(&request.terraform_version, &config),
            ),
            Err(err) => vec![convert::invalid_value("provider configuration", &err)],
        };
        Ok(Response::new(pb::configure_provider::Response {
            diagnostics,
        }))
    }

    async fn validate_data_resource_config(
        &self,
        request: Request<pb::validate_data_resource_config::Request>,
    ) -> Result<Response<pb::validate_data_resource_config::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "ValidateDataResourceConfig");
        let diagnostics = match convert::decode_value(request.config.as_ref()) {
            Ok(config) => convert::diagnostics(
                self.provider
                    .validate_data_source(&request.type_name, &config),
            ),
            Err(err) => vec![convert::invalid_value("data source configuration", &err)],
        };
        Ok(Response::new(pb::validate_data_resource_config::Response {
            diagnostics,
        }))
    }

    async fn read_data_source(
        &self,
        request: Request<pb::read_data_source::Request>,
    ) -> Result<Response<pb::read_data_source::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(type_name = %request.type_name, "ReadDataSource");

        let config = match convert::decode_value(request.config.as_ref()) {
            Ok(config) => config,
            Err(err) => {
                return Ok(Response::new(pb::read_data_source::Response {
                    state: None,
                    diagnostics: vec![convert::invalid_value("data source configuration", &err)],
                }));
            }
        };

        let provider = Arc::clone(&self.provider);
        let type_name = request.type_name;
        let read = tokio::task::spawn_blocking(move || provider.read_data_source(&type_name, &config))
            .await
            .map_err(|err| Status::internal(format!("data source read panicked: {err}")))?;

        let mut diagnostics = convert::diagnostics(read.diagnostics);
        let state = match read.state.as_ref().map(convert::encode_value).transpose() {
            Ok(state) => state,
            Err(err) => {
                diagnostics.push(convert::invalid_value("data source state", &err));
                None
            }
        };
        Ok(Response::new(pb::read_data_source::Response {
            state,
            diagnostics,
        }))
    }

    async fn get_functions(
        &self,
        _request: Request<pb::get_functions::Request>,
    ) -> Result<Response<pb::get_functions::Response>, Status> {
        tracing::debug!("GetFunctions");
        Ok(Response::new(pb::get_functions::Response {
            functions: self.functions(),
            diagnostics: Vec::new(),
        }))
    }

    async fn call_function(
        &self,
        request: Request<pb::call_function::Request>,
    ) -> Result<Response<pb::call_function::Response>, Status> {
        let request = request.into_inner();
        tracing::debug!(name = %request.name, "CallFunction");

        let mut arguments = Vec::with_capacity(request.arguments.len());
        for (index, argument) in request.arguments.iter().enumerate() {
            match convert::decode_value(Some(argument)) {
                Ok(value) => arguments.push(value),
                Err(err) => {
                    return Ok(Response::new(pb::call_function::Response {
                        result: None,
                        error: Some(pb::FunctionError {
                            text: format!("Failed to decode argument: {err}"),
                            function_argument: Some(index as i64),
                        }),
                    }));
                }
            }
        }

        let response = match self
            .provider
            .call_function(&request.name, &arguments)
            .map_err(convert::function_error)
            .and_then(|result: Value| {
                convert::encode_value(&result).map_err(|err| pb::FunctionError {
                    text: format!("Failed to encode result: {err}"),
                    function_argument: None,
                })
            }) {
            Ok(result) => pb::call_function::Response {
                result: Some(result),
                error: None,
            },
            Err(error) => pb::call_function::Response {
                result: None,
                error: Some(error),
            },
        };
        Ok(Response::new(response))
    }

    async fn stop_provider(
        &self,
        _request: Request<pb::stop_provider::Request>,
    ) -> Result<Response<pb::stop_provider::Response>, Status> {
        // Requests finish on their own; there is no in-flight work to cancel.
        tracing::debug!("StopProvider");
        Ok(Response::new(pb::stop_provider::Response {
            error: String::new(),
        }))
    }
}

/// go-plugin's controller: Terraform calls `Shutdown` when it is done with us.
#[derive(Debug, Clone)]
pub struct Controller {
    shutdown: Arc<Notify>,
}

impl Controller {
    pub fn new(shutdown: Arc<Notify>) -> Self {
        Self { shutdown }
    }
}

#[tonic::async_trait]
impl plugin::grpc_controller_server::GrpcController for Controller {
    async fn shutdown(
        &self,
        _request: Request<plugin::Empty>,
    ) -> Result<Response<plugin::Empty>, Status> {
        tracing::info!("shutdown requested");
        self.shutdown.notify_one();
        Ok(Response::new(plugin::Empty {}))
    }
}
