pub mod conversation;
pub mod user;

pub use conversation::ConversationDataSource;
pub use user::UserDataSource;

use std::any::Any;
use std::sync::Arc;
use tfplug::data_source::ConfigureDataSourceResponse;
use tfplug::schema::{Attribute, AttributeBuilder, AttributeType};
use tfplug::types::Diagnostic;

use crate::SlackProviderData;

/// `Mon Jan 2 15:04:05 UTC 2006`
const TIMESTAMP_FORMAT: &str = "%a %b %-d %H:%M:%S UTC %Y";

/// Render Unix seconds in UTC; out-of-range values fall back to the raw number
pub fn format_timestamp(secs: i64) -> String {
    chrono::DateTime::from_timestamp(secs, 0)
        .map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| secs.to_string())
}

/// Render a message `ts` (`"<seconds>.<micros>"`); unparsable input is kept verbatim
pub fn format_message_ts(ts: &str) -> String {
    let secs = ts.split('.').next().unwrap_or_default();
    match secs.parse::<i64>() {
        Ok(secs) => format_timestamp(secs),
        Err(_) => ts.to_string(),
    }
}

pub(crate) fn computed(name: &str, attr_type: AttributeType, description: &str) -> Attribute {
    AttributeBuilder::new(name, attr_type)
        .description(description)
        .computed()
        .build()
}

/// Pull the Slack client out of provider data; `None` means unconfigured
pub(crate) fn provider_data_from(
    data_source: &str,
    provider_data: Option<Arc<dyn Any + Send + Sync>>,
) -> (Option<SlackProviderData>, ConfigureDataSourceResponse) {
    let mut diagnostics = vec![];

    let Some(data) = provider_data else {
        // ValidateDataResourceConfig runs before the provider is configured
        tracing::debug!("No provider data provided to {} data source", data_source);
        return (None, ConfigureDataSourceResponse { diagnostics });
    };

    match data.downcast_ref::<SlackProviderData>() {
        Some(provider_data) => (
            Some(provider_data.clone()),
            ConfigureDataSourceResponse { diagnostics },
        ),
        None => {
            tracing::error!("Failed to downcast provider data to SlackProviderData");
            diagnostics.push(Diagnostic::error(
                "Unexpected Data Source Configure Type",
                format!(
                    "Expected SlackProviderData for the {} data source. \
                     Please report this issue to the provider developers.",
                    data_source
                ),
            ));
            (None, ConfigureDataSourceResponse { diagnostics })
        }
    }
}

pub(crate) fn not_configured() -> tfplug::data_source::ReadDataSourceResponse {
    tfplug::data_source::ReadDataSourceResponse::error(
        "Provider not configured",
        "The Slack API client is not available. Set the token in the provider \
         configuration or the SLACK_TOKEN environment variable.",
    )
}
