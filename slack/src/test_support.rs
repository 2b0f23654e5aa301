//! Shared fixtures for data source tests

use crate::api::test_helpers::create_test_client;
use crate::SlackProviderData;
use tfplug::data_source::ReadDataSourceRequest;
use tfplug::types::{ClientCapabilities, Dynamic, DynamicValue};

pub fn client_for(url: &str) -> SlackProviderData {
    SlackProviderData::new(create_test_client(url))
}

pub fn read_request(type_name: &str, id: &str) -> ReadDataSourceRequest {
    ReadDataSourceRequest {
        type_name: type_name.to_string(),
        config: DynamicValue::new(Dynamic::object([("id", Dynamic::from(id))])),
        provider_meta: None,
        client_capabilities: ClientCapabilities::default(),
    }
}
