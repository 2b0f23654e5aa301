//! Conversation data source implementation

use async_trait::async_trait;
use tfplug::context::Context;
use tfplug::data_source::{
    ConfigureDataSourceRequest, ConfigureDataSourceResponse, DataSource, DataSourceSchemaRequest,
    DataSourceSchemaResponse, DataSourceWithConfigure, ReadDataSourceRequest,
    ReadDataSourceResponse,
};
use tfplug::schema::{AttributeBuilder, AttributeType, SchemaBuilder};
use tfplug::types::{AttributePath, Dynamic, DynamicValue};
use tfplug::validator::StringLengthValidator;

use super::{computed, format_message_ts, format_timestamp, not_configured, provider_data_from};
use crate::api::{Conversation, GetConversationInfoInput, TextWithAuthor};
use crate::SlackProviderData;

pub const TYPE_NAME: &str = "slack_conversation";

#[derive(Default)]
pub struct ConversationDataSource {
    provider_data: Option<SlackProviderData>,
}

impl ConversationDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for ConversationDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let text_with_author = |name: &str, what: &str| {
            AttributeBuilder::single_nested(
                name,
                vec![
                    computed(
                        "creator",
                        AttributeType::String,
                        &format!("The ID for the creator of the {}.", what),
                    ),
                    computed(
                        "last_set",
                        AttributeType::Number,
                        &format!("A Unix timestamp indicating when the {} was last set.", what),
                    ),
                    computed(
                        "value",
                        AttributeType::String,
                        &format!("The conversation's {}.", what),
                    ),
                ],
            )
            .description(&format!("The conversation's {} object.", what))
            .computed()
            .build()
        };

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Fetch a conversation.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Identifier for this conversation.")
                    .required()
                    .validator(StringLengthValidator::at_least(1))
                    .build(),
            )
            .attribute(computed(
                "created",
                AttributeType::String,
                "A Unix timestamp indicating when the conversation was created.",
            ))
            .attribute(computed(
                "creator",
                AttributeType::String,
                "The ID for the user that created the conversation.",
            ))
            .attribute(computed(
                "is_archived",
                AttributeType::Bool,
                "Indicates whether the conversation is archived.",
            ))
            .attribute(computed(
                "is_channel",
                AttributeType::Bool,
                "Indicates whether the conversation is a channel.",
            ))
            .attribute(computed(
                "is_ext_shared",
                AttributeType::Bool,
                "Indicates whether the conversation is externally shared.",
            ))
            .attribute(computed(
                "is_general",
                AttributeType::Bool,
                "Indicates whether the conversation is general.",
            ))
            .attribute(computed(
                "is_group",
                AttributeType::Bool,
                "Indicates whether the conversation is a group.",
            ))
            .attribute(computed(
                "is_im",
                AttributeType::Bool,
                "Indicates whether the conversation is an IM.",
            ))
            .attribute(computed(
                "is_member",
                AttributeType::Bool,
                "Indicates whether the calling user is a member of the conversation.",
            ))
            .attribute(computed(
                "is_open",
                AttributeType::Bool,
                "Indicates whether the conversation is open.",
            ))
            .attribute(computed(
                "is_org_shared",
                AttributeType::Bool,
                "Indicates whether the conversation is shared across an organization.",
            ))
            .attribute(computed(
                "is_pending_ext_shared",
                AttributeType::Bool,
                "Indicates whether the conversation is a pending external share.",
            ))
            .attribute(computed(
                "is_private",
                AttributeType::Bool,
                "Indicates whether the conversation is private.",
            ))
            .attribute(computed(
                "is_shared",
                AttributeType::Bool,
                "Indicates whether the conversation is shared.",
            ))
            .attribute(computed(
                "last_read",
                AttributeType::String,
                "The last time the conversation was read.",
            ))
            .attribute(computed(
                "locale",
                AttributeType::String,
                "The locale set for the conversation.",
            ))
            .attribute(computed(
                "name",
                AttributeType::String,
                "The name of the conversation.",
            ))
            .attribute(computed(
                "name_normalized",
                AttributeType::String,
                "The name field, but with any non-Latin characters filtered out.",
            ))
            .attribute(computed(
                "num_members",
                AttributeType::Number,
                "The number of members in the conversation.",
            ))
            .attribute(computed(
                "priority",
                AttributeType::Number,
                "The conversation's priority value.",
            ))
            .attribute(computed(
                "unlinked",
                AttributeType::Number,
                "Conversation unlinked value.",
            ))
            .attribute(computed(
                "unread_count",
                AttributeType::Number,
                "The count of unread messages in the conversation.",
            ))
            .attribute(computed(
                "unread_count_display",
                AttributeType::Number,
                "The unread count display value.",
            ))
            .attribute(computed(
                "user",
                AttributeType::String,
                "The ID for the user who started the conversation.",
            ))
            .attribute(text_with_author("purpose", "purpose"))
            .attribute(text_with_author("topic", "topic"))
            .attribute(
                AttributeBuilder::single_nested(
                    "latest",
                    vec![
                        computed("type", AttributeType::String, "The type of post."),
                        computed(
                            "user",
                            AttributeType::String,
                            "The ID of the user that made the post.",
                        ),
                        computed("text", AttributeType::String, "The text of the post."),
                        computed("ts", AttributeType::String, "When the post was made."),
                    ],
                )
                .description("The latest post in the conversation.")
                .computed()
                .build(),
            )
            .build();

        DataSourceSchemaResponse {
            schema,
            diagnostics: vec![],
        }
    }

    async fn read(&self, ctx: Context, request: ReadDataSourceRequest) -> ReadDataSourceResponse {
        tracing::debug!("Preparing to read conversation data source");

        let Some(provider_data) = &self.provider_data else {
            return not_configured();
        };

        let id = match request.config.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(e) => return ReadDataSourceResponse::error("Invalid Configuration", e.to_string()),
        };

        let input = GetConversationInfoInput {
            channel_id: id.clone(),
            include_locale: true,
            include_num_members: true,
        };

        let result = match ctx
            .run(provider_data.client.get_conversation_info(&input))
            .await
        {
            Some(result) => result,
            None => {
                return ReadDataSourceResponse::error(
                    "Unable to Read Conversation",
                    "The request was cancelled because Terraform stopped the provider.",
                )
            }
        };

        match result {
            Ok(conversation) => {
                tracing::debug!(id = %conversation.id, "Read conversation data source");
                ReadDataSourceResponse {
                    state: DynamicValue::new(conversation_state(&conversation, &id)),
                    diagnostics: vec![],
                    deferred: None,
                }
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to read conversation");
                ReadDataSourceResponse::error("Unable to Read Conversation", e.to_string())
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for ConversationDataSource {
    async fn configure(
        &mut self,
        _ctx: Context,
        request: ConfigureDataSourceRequest,
    ) -> ConfigureDataSourceResponse {
        let (provider_data, response) = provider_data_from(TYPE_NAME, request.provider_data);
        self.provider_data = provider_data;
        response
    }
}

fn text_with_author_state(value: &TextWithAuthor) -> Dynamic {
    Dynamic::object([
        ("creator", Dynamic::from(value.creator.as_str())),
        ("last_set", Dynamic::from(value.last_set.unix())),
        ("value", Dynamic::from(value.value.as_str())),
    ])
}

/// Map a `conversations.info` record onto the data source schema
pub fn conversation_state(conversation: &Conversation, configured_id: &str) -> Dynamic {
    // Terraform rejects state whose required id differs from config
    let id = if conversation.id.is_empty() {
        configured_id
    } else {
        conversation.id.as_str()
    };

    let latest = match &conversation.latest {
        Some(message) => Dynamic::object([
            ("type", Dynamic::from(message.message_type.as_str())),
            ("user", Dynamic::from(message.user.as_str())),
            ("text", Dynamic::from(message.text.as_str())),
            ("ts", Dynamic::from(format_message_ts(&message.ts))),
        ]),
        None => Dynamic::object([
            ("type", Dynamic::from("")),
            ("user", Dynamic::from("")),
            ("text", Dynamic::from("")),
            ("ts", Dynamic::from("")),
        ]),
    };

    Dynamic::object([
        ("id", Dynamic::from(id)),
        ("created", Dynamic::from(format_timestamp(conversation.created.unix()))),
        ("creator", Dynamic::from(conversation.creator.as_str())),
        ("is_archived", Dynamic::from(conversation.is_archived)),
        ("is_channel", Dynamic::from(conversation.is_channel)),
        ("is_ext_shared", Dynamic::from(conversation.is_ext_shared)),
        ("is_general", Dynamic::from(conversation.is_general)),
        ("is_group", Dynamic::from(conversation.is_group)),
        ("is_im", Dynamic::from(conversation.is_im)),
        ("is_member", Dynamic::from(conversation.is_member)),
        ("is_open", Dynamic::from(conversation.is_open)),
        ("is_org_shared", Dynamic::from(conversation.is_org_shared)),
        (
            "is_pending_ext_shared",
            Dynamic::from(conversation.is_pending_ext_shared),
        ),
        ("is_private", Dynamic::from(conversation.is_private)),
        ("is_shared", Dynamic::from(conversation.is_shared)),
        ("last_read", Dynamic::from(conversation.last_read.as_str())),
        ("latest", latest),
        ("locale", Dynamic::from(conversation.locale.as_str())),
        ("name", Dynamic::from(conversation.name.as_str())),
        (
            "name_normalized",
            Dynamic::from(conversation.name_normalized.as_str()),
        ),
        ("num_members", Dynamic::from(conversation.num_members)),
        ("priority", Dynamic::from(conversation.priority)),
        ("purpose", text_with_author_state(&conversation.purpose)),
        ("topic", text_with_author_state(&conversation.topic)),
        ("unlinked", Dynamic::from(conversation.unlinked)),
        ("unread_count", Dynamic::from(conversation.unread_count)),
        (
            "unread_count_display",
            Dynamic::from(conversation.unread_count_display),
        ),
        ("user", Dynamic::from(conversation.user.as_str())),
    ])
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::{JsonTime, Message};
    use crate::test_support::{client_for, read_request};
    use mockito::{Matcher, Server};
    use std::sync::Arc;

    fn sample_conversation() -> Conversation {
        Conversation {
            id: "C012AB3CD".to_string(),
            created: JsonTime(1449252889),
            creator: "W012A3BCD".to_string(),
            is_channel: true,
            is_general: true,
            is_member: true,
            name: "general".to_string(),
            name_normalized: "general".to_string(),
            num_members: 4,
            topic: TextWithAuthor {
                value: "Company-wide announcements".to_string(),
                creator: "W012A3BCD".to_string(),
                last_set: JsonTime(1449709364),
            },
            ..Default::default()
        }
    }

    #[test]
    fn state_copies_flags_and_counts() {
        let state = DynamicValue::new(conversation_state(&sample_conversation(), "C012AB3CD"));

        assert_eq!(
            state.get_string(&AttributePath::new("id")).unwrap(),
            "C012AB3CD"
        );
        assert!(state.get_bool(&AttributePath::new("is_channel")).unwrap());
        assert!(!state.get_bool(&AttributePath::new("is_private")).unwrap());
        assert_eq!(
            state.get_number(&AttributePath::new("num_members")).unwrap(),
            4.0
        );
        assert_eq!(
            state.get_string(&AttributePath::new("created")).unwrap(),
            "Fri Dec 4 18:14:49 UTC 2015"
        );
        assert_eq!(
            state
                .get_number(&AttributePath::new("topic").attribute("last_set"))
                .unwrap(),
            1449709364.0
        );
    }

    #[test]
    fn absent_latest_is_four_empty_strings() {
        let state = DynamicValue::new(conversation_state(&sample_conversation(), "C012AB3CD"));

        let latest = state.get_map(&AttributePath::new("latest")).unwrap();
        assert_eq!(latest.len(), 4);
        for key in ["type", "user", "text", "ts"] {
            assert_eq!(latest[key], Dynamic::from(""));
        }
    }

    #[test]
    fn latest_ts_comes_from_the_message() {
        let conversation = Conversation {
            latest: Some(Message {
                message_type: "message".to_string(),
                user: "U0G9QF9C6".to_string(),
                text: "Hello world".to_string(),
                ts: "1512085950.000216".to_string(),
            }),
            ..sample_conversation()
        };

        let state = DynamicValue::new(conversation_state(&conversation, "C012AB3CD"));

        assert_eq!(
            state
                .get_string(&AttributePath::new("latest").attribute("ts"))
                .unwrap(),
            "Thu Nov 30 23:52:30 UTC 2017"
        );
    }

    #[test]
    fn mapping_is_deterministic() {
        let conversation = sample_conversation();

        assert_eq!(
            conversation_state(&conversation, "C012AB3CD"),
            conversation_state(&conversation, "C012AB3CD")
        );
    }

    #[test]
    fn empty_response_id_falls_back_to_config() {
        let conversation = Conversation::default();

        let state = DynamicValue::new(conversation_state(&conversation, "C999"));

        assert_eq!(state.get_string(&AttributePath::new("id")).unwrap(), "C999");
    }

    #[tokio::test]
    async fn schema_covers_every_state_attribute() {
        let data_source = ConversationDataSource::new();
        let schema = data_source
            .schema(Context::new(), DataSourceSchemaRequest)
            .await
            .schema;

        let state = conversation_state(&sample_conversation(), "C012AB3CD");
        let state = state.as_map().unwrap();

        assert_eq!(schema.block.attributes.len(), state.len());
        for attr in &schema.block.attributes {
            assert!(state.contains_key(&attr.name), "missing {}", attr.name);
        }
        assert!(schema.attribute("id").unwrap().required);
    }

    #[tokio::test]
    async fn read_maps_api_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/conversations.info")
            .match_query(Matcher::UrlEncoded("channel".into(), "C012AB3CD".into()))
            .with_body(
                r#"{"ok": true, "channel": {"id": "C012AB3CD", "name": "general", "is_channel": true, "created": 1449252889}}"#,
            )
            .create_async()
            .await;

        let mut data_source = ConversationDataSource::new();
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(client_for(&server.url()))),
                },
            )
            .await;

        let response = data_source
            .read(Context::new(), read_request(TYPE_NAME, "C012AB3CD"))
            .await;

        assert!(response.diagnostics.is_empty());
        assert_eq!(
            response.state.get_string(&AttributePath::new("name")).unwrap(),
            "general"
        );
    }

    #[tokio::test]
    async fn read_unknown_id_yields_single_error_and_null_state() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/conversations.info")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "channel_not_found"}"#)
            .create_async()
            .await;

        let mut data_source = ConversationDataSource::new();
        data_source
            .configure(
                Context::new(),
                ConfigureDataSourceRequest {
                    provider_data: Some(Arc::new(client_for(&server.url()))),
                },
            )
            .await;

        let response = data_source
            .read(Context::new(), read_request(TYPE_NAME, "nonexistent-id"))
            .await;

        assert!(response.state.is_null());
        assert_eq!(response.diagnostics.len(), 1);
        assert_eq!(response.diagnostics[0].summary, "Unable to Read Conversation");
        assert_eq!(response.diagnostics[0].detail, "channel_not_found");
    }

    #[tokio::test]
    async fn read_without_provider_data_fails() {
        let data_source = ConversationDataSource::new();

        let response = data_source
            .read(Context::new(), read_request(TYPE_NAME, "C012AB3CD"))
            .await;

        assert!(response.state.is_null());
        assert_eq!(response.diagnostics[0].summary, "Provider not configured");
    }
}
