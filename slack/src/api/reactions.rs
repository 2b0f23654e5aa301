//! `reactions.list`, used as the provider's connectivity check

use serde::Deserialize;

use super::common::ApiQueryParams;
use super::{ApiError, Client};

#[derive(Debug, Clone)]
pub struct ListReactionsParams {
    pub user: Option<String>,
    pub count: u32,
    pub page: u32,
    pub full: bool,
}

impl Default for ListReactionsParams {
    fn default() -> Self {
        Self {
            user: None,
            count: 100,
            page: 1,
            full: false,
        }
    }
}

impl ListReactionsParams {
    fn to_query(&self) -> ApiQueryParams {
        let mut params = ApiQueryParams::new()
            .add_optional("user", self.user.as_deref())
            .add("count", self.count)
            .add("page", self.page);
        if self.full {
            params = params.add("full", true);
        }
        params
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReactedItem {
    #[serde(rename = "type")]
    pub item_type: String,
    pub channel: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Paging {
    pub count: u32,
    pub total: u32,
    pub page: u32,
    pub pages: u32,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReactionsList {
    pub items: Vec<ReactedItem>,
    pub paging: Paging,
}

impl Client {
    /// Items the token's user reacted to
    pub async fn list_reactions(
        &self,
        params: ListReactionsParams,
    ) -> Result<ReactionsList, ApiError> {
        self.get("reactions.list", &params.to_query()).await
    }
}
