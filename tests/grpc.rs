use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;
use tonic::Request;

use terraform_provider_env::provider::value::Value;
use terraform_provider_env::server::proto::plugin;
use terraform_provider_env::server::proto::plugin::grpc_controller_server::GrpcController;
use terraform_provider_env::server::proto::tfplugin6 as pb;
use terraform_provider_env::server::proto::tfplugin6::provider_server::Provider;
use terraform_provider_env::server::{Controller, GrpcProvider};
use terraform_provider_env::{EnvProvider, SourceEnv};

#[tokio::test]
async fn metadata_lists_data_source_and_function() {
    let provider = grpc_provider(&[]);

    let response = provider
        .get_metadata(Request::new(pb::get_metadata::Request {}))
        .await
        .expect("get metadata")
        .into_inner();

    let data_sources: Vec<_> = response
        .data_sources
        .iter()
        .map(|d| d.type_name.as_str())
        .collect();
    let functions: Vec<_> = response.functions.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(data_sources, vec!["env_file"]);
    assert_eq!(functions, vec!["getenv"]);
    let capabilities = response.server_capabilities.expect("capabilities");
    assert!(capabilities.get_provider_schema_optional);
    assert!(response.diagnostics.is_empty());
}

#[tokio::test]
async fn provider_schema_describes_env_file_and_getenv() {
    let provider = grpc_provider(&[]);

    let response = provider
        .get_provider_schema(Request::new(pb::get_provider_schema::Request {}))
        .await
        .expect("get provider schema")
        .into_inner();

    let provider_block = response
        .provider
        .and_then(|schema| schema.block)
        .expect("provider block");
    assert!(provider_block.attributes.is_empty());

    let block = response.data_source_schemas["env_file"]
        .block
        .as_ref()
        .expect("env_file block");
    let result = block
        .attributes
        .iter()
        .find(|a| a.name == "result")
        .expect("result attribute");
    assert!(result.sensitive && result.computed && !result.optional);
    assert_eq!(result.r#type, br#"["map","string"]"#);

    let getenv = &response.functions["getenv"];
    let parameters: Vec<_> = getenv
        .parameters
        .iter()
        .map(|p| (p.name.as_str(), p.r#type.as_slice()))
        .collect();
    assert_eq!(
        parameters,
        vec![("name", &br#""string""#[..]), ("required", &br#""bool""#[..])]
    );
    assert_eq!(
        getenv.r#return.as_ref().map(|r| r.r#type.as_slice()),
        Some(&br#""string""#[..])
    );
}

#[tokio::test]
async fn get_functions_matches_schema_functions() {
    let provider = grpc_provider(&[]);

    let response = provider
        .get_functions(Request::new(pb::get_functions::Request {}))
        .await
        .expect("get functions")
        .into_inner();

    assert_eq!(response.functions.len(), 1);
    assert!(response.functions["getenv"].summary.contains("environment variable"));
}

#[tokio::test]
async fn read_data_source_returns_file_entries() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(".env");
    std::fs::write(&path, "export TOKEN=\"s3cr3t\"\nHOST=localhost # comment\n").expect("write");

    let response = read(&grpc_provider(&[]), file_config(&path, Value::Null)).await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = decode(response.state.as_ref().expect("state"));
    let result = state
        .get("result")
        .and_then(Value::to_string_map)
        .expect("result");
    assert_eq!(result.get("TOKEN").map(String::as_str), Some("s3cr3t"));
    assert_eq!(result.get("HOST").map(String::as_str), Some("localhost"));
    assert_eq!(state.get("required"), Some(&Value::Bool(false)));
}

#[tokio::test]
async fn read_data_source_expands_references() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(".env");
    std::fs::write(&path, "# URL='ignored\nHOST=db\nURL=\"$GRPC_USER@${HOST}\"\n").expect("write");

    let response = read(
        &grpc_provider(&[("GRPC_USER", "app")]),
        file_config(&path, Value::Null),
    )
    .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = decode(response.state.as_ref().expect("state"));
    let result = state
        .get("result")
        .and_then(Value::to_string_map)
        .expect("result");
    assert_eq!(result.len(), 2);
    assert_eq!(result.get("URL").map(String::as_str), Some("app@db"));
}

#[tokio::test]
async fn read_missing_required_file_reports_error_on_path() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join("absent.env");

    let response = read(&grpc_provider(&[]), file_config(&path, Value::from(true))).await;

    assert_eq!(response.diagnostics.len(), 1);
    let diagnostic = &response.diagnostics[0];
    assert_eq!(diagnostic.severity, pb::diagnostic::Severity::Error as i32);
    assert_eq!(diagnostic.summary, "File Not Found");
    let step = diagnostic
        .attribute
        .as_ref()
        .and_then(|path| path.steps.first())
        .expect("attribute step");
    assert_eq!(
        step.selector,
        Some(pb::attribute_path::step::Selector::AttributeName(
            "path".to_owned()
        ))
    );

    let state = decode(response.state.as_ref().expect("state"));
    assert_eq!(state.get("result"), Some(&Value::Map(Vec::new())));
}

#[tokio::test]
async fn read_malformed_file_returns_no_state() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(".env");
    std::fs::write(&path, "OK=1\nBROKEN='open\n").expect("write");

    let response = read(&grpc_provider(&[]), file_config(&path, Value::Null)).await;

    assert!(response.state.is_none());
    assert_eq!(response.diagnostics[0].summary, "Failed To Parse File");
    assert!(response.diagnostics[0].detail.contains("line 2"));
}

#[tokio::test]
async fn read_accepts_json_encoded_config() {
    let dir = tempfile::tempdir().expect("temp dir");
    let path = dir.path().join(".env");
    std::fs::write(&path, "A=1\n").expect("write");
    let json = serde_json::json!({ "path": path.to_string_lossy(), "required": true });

    let response = provider_read(
        &grpc_provider(&[]),
        "env_file",
        pb::DynamicValue {
            msgpack: Vec::new(),
            json: serde_json::to_vec(&json).expect("json"),
        },
    )
    .await;

    assert!(response.diagnostics.is_empty(), "{:?}", response.diagnostics);
    let state = decode(response.state.as_ref().expect("state"));
    assert_eq!(state.get("required"), Some(&Value::Bool(true)));
}

#[tokio::test]
async fn read_unknown_data_source_type_fails() {
    let response = provider_read(
        &grpc_provider(&[]),
        "env_directory",
        encode(&Value::object([("path", Value::Null)])),
    )
    .await;

    assert!(response.state.is_none());
    assert_eq!(response.diagnostics[0].summary, "Data Source Type Not Found");
}

#[tokio::test]
async fn validate_data_source_flags_wrong_types() {
    let provider = grpc_provider(&[]);
    let config = Value::object([("path", Value::Bool(true)), ("required", Value::Null)]);

    let response = provider
        .validate_data_resource_config(Request::new(pb::validate_data_resource_config::Request {
            type_name: "env_file".to_owned(),
            config: Some(encode(&config)),
        }))
        .await
        .expect("validate")
        .into_inner();

    assert_eq!(response.diagnostics.len(), 1);
    assert_eq!(response.diagnostics[0].summary, "Invalid Attribute Type");
}

#[tokio::test]
async fn call_getenv_returns_value() {
    let provider = grpc_provider(&[("TEST_GETENV_VALUE", "testvalue")]);

    let response = call_getenv(&provider, "TEST_GETENV_VALUE", Value::from(true)).await;

    assert!(response.error.is_none());
    let result = decode(response.result.as_ref().expect("result"));
    assert_eq!(result, Value::from("testvalue"));
}

#[tokio::test]
async fn call_getenv_optional_unset_is_empty() {
    let provider = grpc_provider(&[]);

    let response = call_getenv(&provider, "TEST_GETENV_NOT_EXISTING_VALUE", Value::from(false)).await;

    let result = decode(response.result.as_ref().expect("result"));
    assert_eq!(result, Value::from(""));
}

#[tokio::test]
async fn call_getenv_required_unset_points_at_second_argument() {
    let provider = grpc_provider(&[]);

    let response = call_getenv(&provider, "TEST_GETENV_NOT_EXISTING_VALUE", Value::from(true)).await;

    assert!(response.result.is_none());
    let error = response.error.expect("function error");
    assert_eq!(error.text, "Environment variable not found");
    assert_eq!(error.function_argument, Some(1));
}

#[tokio::test]
async fn call_with_undecodable_argument_points_at_it() {
    let provider = grpc_provider(&[]);

    let response = provider
        .call_function(Request::new(pb::call_function::Request {
            name: "getenv".to_owned(),
            arguments: vec![
                pb::DynamicValue {
                    msgpack: vec![0xa5, b'a'],
                    json: Vec::new(),
                },
                encode(&Value::from(false)),
            ],
        }))
        .await
        .expect("call function")
        .into_inner();

    let error = response.error.expect("function error");
    assert_eq!(error.function_argument, Some(0));
}

#[tokio::test]
async fn stop_provider_reports_no_error() {
    let response = grpc_provider(&[])
        .stop_provider(Request::new(pb::stop_provider::Request {}))
        .await
        .expect("stop provider")
        .into_inner();

    assert!(response.error.is_empty());
}

#[tokio::test]
async fn controller_shutdown_notifies_server() {
    let shutdown = Arc::new(Notify::new());
    let controller = Controller::new(Arc::clone(&shutdown));

    controller
        .shutdown(Request::new(plugin::Empty {}))
        .await
        .expect("shutdown");

    tokio::time::timeout(Duration::from_secs(1), shutdown.notified())
        .await
        .expect("shutdown should be signalled");
}

fn grpc_provider(env: &[(&str, &str)]) -> GrpcProvider {
    GrpcProvider::new(EnvProvider::with_env(SourceEnv::from_pairs(
        env.iter().copied(),
    )))
}

fn file_config(path: &Path, required: Value) -> pb::DynamicValue {
    encode(&Value::object([
        ("path", Value::from(&*path.to_string_lossy())),
        ("required", required),
        ("result", Value::Null),
    ]))
}

fn encode(value: &Value) -> pb::DynamicValue {
    pb::DynamicValue {
        msgpack: value.to_msgpack().expect("encode"),
        json: Vec::new(),
    }
}

fn decode(value: &pb::DynamicValue) -> Value {
    Value::from_msgpack(&value.msgpack).expect("decode")
}

async fn read(provider: &GrpcProvider, config: pb::DynamicValue) -> pb::read_data_source::Response {
    provider_read(provider, "env_file", config).await
}

async fn provider_read(
    provider: &GrpcProvider,
    type_name: &str,
    config: pb::DynamicValue,
) -> pb::read_data_source::Response {
    provider
        .read_data_source(Request::new(pb::read_data_source::Request {
            type_name: type_name.to_owned(),
            config: Some(config),
            provider_meta: None,
        }))
        .await
        .expect("read data source")
        .into_inner()
}

async fn call_getenv(
    provider: &GrpcProvider,
    name: &str,
    required: Value,
) -> pb::call_function::Response {
    provider
        .call_function(Request::new(pb::call_function::Request {
            name: "getenv".to_owned(),
            arguments: vec![encode(&Value::from(name)), encode(&required)],
        }))
        .await
        .expect("call function")
        .into_inner()
}
