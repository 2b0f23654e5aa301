//! Slack Web API client covering the methods the provider calls

pub mod client;
pub mod common;
pub mod conversations;
pub mod error;
pub mod reactions;
pub mod users;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use client::{Client, ClientOptions, DEFAULT_BASE_URL};
pub use common::JsonTime;
pub use conversations::{Conversation, GetConversationInfoInput, Message, TextWithAuthor};
pub use error::ApiError;
pub use reactions::{ListReactionsParams, ReactionsList};
pub use users::{EnterpriseUser, User, UserProfile};
