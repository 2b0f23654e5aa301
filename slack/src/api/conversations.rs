//! `conversations.info`

use serde::Deserialize;

use super::common::{deserialize_null_string, ApiQueryParams, JsonTime};
use super::{ApiError, Client};

#[derive(Debug, Clone, Default)]
pub struct GetConversationInfoInput {
    pub channel_id: String,
    pub include_locale: bool,
    pub include_num_members: bool,
}

/// Purpose or topic of a conversation
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TextWithAuthor {
    #[serde(deserialize_with = "deserialize_null_string")]
    pub value: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub creator: String,
    pub last_set: JsonTime,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub user: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub text: String,
    /// `"<seconds>.<micros>"`, also the message's identifier
    pub ts: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Conversation {
    pub id: String,
    pub created: JsonTime,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub creator: String,
    pub is_archived: bool,
    pub is_channel: bool,
    pub is_ext_shared: bool,
    pub is_general: bool,
    pub is_group: bool,
    pub is_im: bool,
    pub is_member: bool,
    pub is_open: bool,
    pub is_org_shared: bool,
    pub is_pending_ext_shared: bool,
    pub is_private: bool,
    pub is_shared: bool,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub last_read: String,
    pub latest: Option<Message>,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub locale: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub name: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub name_normalized: String,
    pub num_members: i64,
    pub priority: f64,
    pub purpose: TextWithAuthor,
    pub topic: TextWithAuthor,
    pub unlinked: i64,
    pub unread_count: i64,
    pub unread_count_display: i64,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub user: String,
}

#[derive(Debug, Deserialize)]
struct ConversationInfoResponse {
    channel: Conversation,
}

impl Client {
    /// Information about a channel, group or direct message
    pub async fn get_conversation_info(
        &self,
        input: &GetConversationInfoInput,
    ) -> Result<Conversation, ApiError> {
        let params = ApiQueryParams::new()
            .add("channel", &input.channel_id)
            .add("include_locale", input.include_locale)
            .add("include_num_members", input.include_num_members);

        let response: ConversationInfoResponse =
            self.get("conversations.info", &params).await?;
        Ok(response.channel)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    const GENERAL: &str = r#"{
        "ok": true,
        "channel": {
            "id": "C012AB3CD",
            "name": "general",
            "is_channel": true,
            "is_group": false,
            "is_im": false,
            "created": 1449252889,
            "creator": "W012A3BCD",
            "is_archived": false,
            "is_general": true,
            "unlinked": 0,
            "name_normalized": "general",
            "is_shared": false,
            "is_ext_shared": false,
            "is_org_shared": false,
            "is_pending_ext_shared": false,
            "is_member": true,
            "is_private": false,
            "is_mpim": false,
            "last_read": "1502126650.228446",
            "topic": {"value": "For public discussion of generalities", "creator": "W012A3BCD", "last_set": 1449709364},
            "purpose": {"value": "This part of the workspace is for fun.", "creator": "", "last_set": 0},
            "previous_names": ["specifics", "abstractions", "etc"],
            "locale": "en-US",
            "num_members": 4
        }
    }"#;

    #[tokio::test]
    async fn get_conversation_info_decodes_channel() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/conversations.info")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("channel".into(), "C012AB3CD".into()),
                Matcher::UrlEncoded("include_locale".into(), "true".into()),
                Matcher::UrlEncoded("include_num_members".into(), "true".into()),
            ]))
            .with_body(GENERAL)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let conversation = client
            .get_conversation_info(&GetConversationInfoInput {
                channel_id: "C012AB3CD".to_string(),
                include_locale: true,
                include_num_members: true,
            })
            .await
            .unwrap();

        assert_eq!(conversation.id, "C012AB3CD");
        assert!(conversation.is_channel);
        assert!(conversation.is_general);
        assert_eq!(conversation.created, JsonTime(1449252889));
        assert_eq!(conversation.topic.last_set.unix(), 1449709364);
        assert_eq!(conversation.num_members, 4);
        assert_eq!(conversation.locale, "en-US");
        assert!(conversation.latest.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_conversation_info_reports_channel_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/conversations.info")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "channel_not_found"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let err = client
            .get_conversation_info(&GetConversationInfoInput {
                channel_id: "nonexistent-id".to_string(),
                ..Default::default()
            })
            .await
            .unwrap_err();

        assert_eq!(err.slack_code(), Some("channel_not_found"));
    }

    #[test]
    fn latest_message_and_null_strings_decode() {
        let conversation: Conversation = serde_json::from_str(
            r#"{
                "id": "D0G9QPY56",
                "is_im": true,
                "user": null,
                "latest": {"type": "message", "user": "U0G9QF9C6", "text": "hi", "ts": "1512085950.000216"}
            }"#,
        )
        .unwrap();

        assert!(conversation.is_im);
        assert_eq!(conversation.user, "");
        let latest = conversation.latest.unwrap();
        assert_eq!(latest.message_type, "message");
        assert_eq!(latest.ts, "1512085950.000216");
    }
}
