//! User data source implementation

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

use super::{computed, format_timestamp, not_configured, provider_data_from};
use crate::api::{EnterpriseUser, User, UserProfile};
use crate::SlackProviderData;

pub const TYPE_NAME: &str = "slack_user";

/// Profile string attributes, in schema order
const PROFILE_STRINGS: [(&str, &str); 18] = [
    ("title", "The user's title."),
    ("phone", "The user's phone number, in any format."),
    ("real_name", "The user's first and last name."),
    (
        "real_name_normalized",
        "The real_name field, but with any non-Latin characters filtered out.",
    ),
    (
        "display_name",
        "The display name the user has chosen to identify themselves by in their workspace profile.",
    ),
    (
        "display_name_normalized",
        "The display_name field, but with any non-Latin characters filtered out.",
    ),
    ("status_text", "The displayed text of up to 100 characters."),
    (
        "status_emoji",
        "The displayed emoji that is enabled for the Slack team, such as :train:.",
    ),
    (
        "image_original",
        "URL of the original square ratio image that represents the user's profile picture.",
    ),
    ("first_name", "The user's first name."),
    ("last_name", "The user's last name."),
    ("image_24", "URL of the 24-pixel square profile picture."),
    ("image_32", "URL of the 32-pixel square profile picture."),
    ("image_48", "URL of the 48-pixel square profile picture."),
    ("image_72", "URL of the 72-pixel square profile picture."),
    ("image_192", "URL of the 192-pixel square profile picture."),
    ("image_512", "URL of the 512-pixel square profile picture."),
    ("team", "The user's team ID."),
];

#[derive(Default)]
pub struct UserDataSource {
    provider_data: Option<SlackProviderData>,
}

impl UserDataSource {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DataSource for UserDataSource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    async fn schema(
        &self,
        _ctx: Context,
        _request: DataSourceSchemaRequest,
    ) -> DataSourceSchemaResponse {
        let mut profile: Vec<_> = PROFILE_STRINGS
            .iter()
            .map(|(name, description)| computed(name, AttributeType::String, description))
            .collect();
        profile.push(computed(
            "status_expiration",
            AttributeType::Number,
            "The Unix Timestamp of when the status will expire.",
        ));

        let enterprise_user = vec![
            computed(
                "enterprise_id",
                AttributeType::String,
                "A unique ID for the Enterprise Grid organization this user belongs to.",
            ),
            computed(
                "enterprise_name",
                AttributeType::String,
                "A display name for the Enterprise Grid organization.",
            ),
            computed(
                "id",
                AttributeType::String,
                "This user's Grid-wide ID, as opposed to the workspace-centric user ID.",
            ),
            computed(
                "is_admin",
                AttributeType::Bool,
                "Indicates whether the user is an Admin of the Enterprise Grid organization.",
            ),
            computed(
                "is_owner",
                AttributeType::Bool,
                "Indicates whether the user is an Owner of the Enterprise Grid organization.",
            ),
            computed(
                "teams",
                AttributeType::List(Box::new(AttributeType::String)),
                "An array of workspace IDs that are in the Enterprise Grid organization.",
            ),
        ];

        let schema = SchemaBuilder::new()
            .version(0)
            .description("Fetch a user.")
            .attribute(
                AttributeBuilder::new("id", AttributeType::String)
                    .description("Identifier for this workspace user.")
                    .required()
                    .validator(StringLengthValidator::at_least(1))
                    .build(),
            )
            .attribute(computed(
                "real_name",
                AttributeType::String,
                "The user's first and last name.",
            ))
            .attribute(computed(
                "color",
                AttributeType::String,
                "Used in some clients to display a special username color.",
            ))
            .attribute(computed(
                "deleted",
                AttributeType::Bool,
                "This user has been deactivated when the value of this field is true.",
            ))
            .attribute(computed(
                "is_admin",
                AttributeType::Bool,
                "Indicates whether the user is an Admin of the current workspace.",
            ))
            .attribute(computed(
                "is_app_user",
                AttributeType::Bool,
                "Indicates whether the user is an authorized user of the calling app.",
            ))
            .attribute(computed(
                "is_bot",
                AttributeType::Bool,
                "Indicates whether the user is a bot user.",
            ))
            .attribute(computed(
                "is_stranger",
                AttributeType::Bool,
                "If true, this user belongs to a different workspace than the one associated \
                 with your app's token, and isn't in any shared channels visible to your app.",
            ))
            .attribute(computed(
                "is_owner",
                AttributeType::Bool,
                "Indicates whether the user is an Owner of the current workspace.",
            ))
            .attribute(computed(
                "is_primary_owner",
                AttributeType::Bool,
                "Indicates whether the user is the Primary Owner of the current workspace.",
            ))
            .attribute(computed(
                "is_restricted",
                AttributeType::Bool,
                "Indicates whether or not the user is a guest user.",
            ))
            .attribute(computed(
                "is_ultra_restricted",
                AttributeType::Bool,
                "Indicates whether or not the user is a single-channel guest.",
            ))
            .attribute(computed(
                "name",
                AttributeType::String,
                "Deprecated. It once indicated the preferred username for a user.",
            ))
            .attribute(computed(
                "team_id",
                AttributeType::String,
                "Identifier for this workspace user's team.",
            ))
            .attribute(computed(
                "tz",
                AttributeType::String,
                "The geographic timezone-related region this user has specified in their account.",
            ))
            .attribute(computed(
                "tz_label",
                AttributeType::String,
                "Describes the commonly used name of the timezone defined in tz.",
            ))
            .attribute(computed(
                "tz_offset",
                AttributeType::Number,
                "Indicates the number of seconds to offset UTC by for this user's timezone.",
            ))
            .attribute(computed(
                "updated",
                AttributeType::String,
                "When the user object was last updated.",
            ))
            .attribute(
                AttributeBuilder::single_nested("profile", profile)
                    .description(
                        "The profile object contains the default fields of a user's workspace profile.",
                    )
                    .computed()
                    .build(),
            )
            .attribute(
                AttributeBuilder::single_nested("enterprise_user", enterprise_user)
                    .description("An object containing info related to an Enterprise Grid user.")
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
        tracing::debug!("Preparing to read user data source");

        let Some(provider_data) = &self.provider_data else {
            return not_configured();
        };

        let id = match request.config.get_string(&AttributePath::new("id")) {
            Ok(id) => id,
            Err(e) => return ReadDataSourceResponse::error("Invalid Configuration", e.to_string()),
        };

        let Some(result) = ctx.run(provider_data.client.get_user_info(&id)).await else {
            return ReadDataSourceResponse::error(
                "Unable to Read User",
                "The request was cancelled because Terraform stopped the provider.",
            );
        };

        match result {
            Ok(user) => {
                tracing::debug!(id = %user.id, "Read user data source");
                ReadDataSourceResponse {
                    state: DynamicValue::new(user_state(&user, &id)),
                    diagnostics: vec![],
                    deferred: None,
                }
            }
            Err(e) => {
                tracing::warn!(id = %id, error = %e, "Failed to read user");
                ReadDataSourceResponse::error("Unable to Read User", e.to_string())
            }
        }
    }
}

#[async_trait]
impl DataSourceWithConfigure for UserDataSource {
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

fn profile_state(profile: &UserProfile) -> Dynamic {
    let strings = [
        ("title", &profile.title),
        ("phone", &profile.phone),
        ("real_name", &profile.real_name),
        ("real_name_normalized", &profile.real_name_normalized),
        ("display_name", &profile.display_name),
        ("display_name_normalized", &profile.display_name_normalized),
        ("status_text", &profile.status_text),
        ("status_emoji", &profile.status_emoji),
        ("image_original", &profile.image_original),
        ("first_name", &profile.first_name),
        ("last_name", &profile.last_name),
        ("image_24", &profile.image_24),
        ("image_32", &profile.image_32),
        ("image_48", &profile.image_48),
        ("image_72", &profile.image_72),
        ("image_192", &profile.image_192),
        ("image_512", &profile.image_512),
        ("team", &profile.team),
    ];

    Dynamic::object(
        strings
            .into_iter()
            .map(|(name, value)| (name, Dynamic::from(value.as_str())))
            .chain([(
                "status_expiration",
                Dynamic::from(profile.status_expiration),
            )]),
    )
}

fn enterprise_user_state(enterprise: &EnterpriseUser) -> Dynamic {
    Dynamic::object([
        ("enterprise_id", Dynamic::from(enterprise.enterprise_id.as_str())),
        (
            "enterprise_name",
            Dynamic::from(enterprise.enterprise_name.as_str()),
        ),
        ("id", Dynamic::from(enterprise.id.as_str())),
        ("is_admin", Dynamic::from(enterprise.is_admin)),
        ("is_owner", Dynamic::from(enterprise.is_owner)),
        ("teams", Dynamic::from(enterprise.teams.clone())),
    ])
}

/// Map a `users.info` record onto the data source schema
pub fn user_state(user: &User, configured_id: &str) -> Dynamic {
    let id = if user.id.is_empty() {
        configured_id
    } else {
        user.id.as_str()
    };
    let enterprise = user.enterprise_user.clone().unwrap_or_default();

    Dynamic::object([
        ("id", Dynamic::from(id)),
        ("real_name", Dynamic::from(user.real_name.as_str())),
        ("color", Dynamic::from(user.color.as_str())),
        ("deleted", Dynamic::from(user.deleted)),
        ("is_admin", Dynamic::from(user.is_admin)),
        ("is_app_user", Dynamic::from(user.is_app_user)),
        ("is_bot", Dynamic::from(user.is_bot)),
        ("is_stranger", Dynamic::from(user.is_stranger)),
        ("is_owner", Dynamic::from(user.is_owner)),
        ("is_primary_owner", Dynamic::from(user.is_primary_owner)),
        ("is_restricted", Dynamic::from(user.is_restricted)),
        ("is_ultra_restricted", Dynamic::from(user.is_ultra_restricted)),
        ("name", Dynamic::from(user.name.as_str())),
        ("team_id", Dynamic::from(user.team_id.as_str())),
        ("tz", Dynamic::from(user.tz.as_str())),
        ("tz_label", Dynamic::from(user.tz_label.as_str())),
        ("tz_offset", Dynamic::from(user.tz_offset)),
        ("updated", Dynamic::from(format_timestamp(user.updated.unix()))),
        ("profile", profile_state(&user.profile)),
        ("enterprise_user", enterprise_user_state(&enterprise)),
    ])
}
