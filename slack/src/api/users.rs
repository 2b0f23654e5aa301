//! `users.info`

use serde::Deserialize;

use super::common::{deserialize_null_string, ApiQueryParams, JsonTime};
use super::{ApiError, Client};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    #[serde(deserialize_with = "deserialize_null_string")]
    pub first_name: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub last_name: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub real_name: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub real_name_normalized: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub display_name: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub display_name_normalized: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub title: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub phone: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_24: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_32: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_48: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_72: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_192: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_512: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub image_original: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub status_text: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub status_emoji: String,
    pub status_expiration: i64,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub team: String,
}

/// Grid-wide identity of a user in an Enterprise Grid organization
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct EnterpriseUser {
    pub id: String,
    pub enterprise_id: String,
    pub enterprise_name: String,
    pub is_admin: bool,
    pub is_owner: bool,
    pub teams: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: String,
    pub team_id: String,
    pub name: String,
    pub deleted: bool,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub color: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub real_name: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub tz: String,
    #[serde(deserialize_with = "deserialize_null_string")]
    pub tz_label: String,
    pub tz_offset: i64,
    pub profile: UserProfile,
    pub is_bot: bool,
    pub is_admin: bool,
    pub is_owner: bool,
    pub is_primary_owner: bool,
    pub is_restricted: bool,
    pub is_ultra_restricted: bool,
    pub is_stranger: bool,
    pub is_app_user: bool,
    pub updated: JsonTime,
    pub enterprise_user: Option<EnterpriseUser>,
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    user: User,
}

impl Client {
    /// Information about a workspace user
    pub async fn get_user_info(&self, user_id: &str) -> Result<User, ApiError> {
        let params = ApiQueryParams::new().add("user", user_id);

        let response: UserInfoResponse = self.get("users.info", &params).await?;
        Ok(response.user)
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::api::test_helpers::create_test_client;
    use mockito::{Matcher, Server};

    const GRID_USER: &str = r#"{
        "ok": true,
        "user": {
            "id": "W012A3CDE",
            "team_id": "T012AB3C4",
            "name": "spengler",
            "deleted": false,
            "color": "9f69e7",
            "real_name": "Egon Spengler",
            "tz": "America/Los_Angeles",
            "tz_label": "Pacific Daylight Time",
            "tz_offset": -25200,
            "profile": {
                "avatar_hash": "ge3b51ca72de",
                "status_text": "Print is dead",
                "status_emoji": ":books:",
                "status_expiration": 1502138999,
                "real_name": "Egon Spengler",
                "display_name": "spengler",
                "real_name_normalized": "Egon Spengler",
                "display_name_normalized": "spengler",
                "image_24": "https://example.com/24.jpg",
                "image_512": "https://example.com/512.jpg",
                "team": "T012AB3C4"
            },
            "is_admin": true,
            "is_owner": false,
            "is_primary_owner": false,
            "is_restricted": false,
            "is_ultra_restricted": false,
            "is_bot": false,
            "updated": 1502138686,
            "is_app_user": false,
            "has_2fa": false,
            "enterprise_user": {
                "id": "W012A3CDE",
                "enterprise_id": "E0123ABC",
                "enterprise_name": "Ghostbusters",
                "is_admin": false,
                "is_owner": false,
                "teams": ["T1", "T0", "T2"]
            }
        }
    }"#;

    #[tokio::test]
    async fn get_user_info_decodes_user() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/users.info")
            .match_query(Matcher::UrlEncoded("user".into(), "W012A3CDE".into()))
            .with_body(GRID_USER)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let user = client.get_user_info("W012A3CDE").await.unwrap();

        assert_eq!(user.id, "W012A3CDE");
        assert_eq!(user.tz_offset, -25200);
        assert!(user.is_admin);
        assert_eq!(user.updated, JsonTime(1502138686));
        assert_eq!(user.profile.status_expiration, 1502138999);
        assert_eq!(user.profile.image_48, "");

        let enterprise = user.enterprise_user.unwrap();
        assert_eq!(enterprise.enterprise_name, "Ghostbusters");
        assert_eq!(enterprise.teams, vec!["T1", "T0", "T2"]);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn get_user_info_reports_user_not_found() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/users.info")
            .match_query(Matcher::Any)
            .with_body(r#"{"ok": false, "error": "user_not_found"}"#)
            .create_async()
            .await;

        let client = create_test_client(&server.url());
        let result = client.get_user_info("nonexistent-id").await;

        assert!(matches!(result, Err(ApiError::Slack(ref code)) if code == "user_not_found"));
    }

    #[test]
    fn bot_users_without_timezone_decode() {
        let user: User = serde_json::from_str(
            r#"{"id": "B01", "is_bot": true, "tz": null, "profile": {"real_name": null}}"#,
        )
        .unwrap();

        assert!(user.is_bot);
        assert_eq!(user.tz, "");
        assert_eq!(user.profile.real_name, "");
        assert!(user.enterprise_user.is_none());
    }
}
