//! Provider data structure passed to data sources

use crate::api::Client;
use std::sync::Arc;

/// Published by `SlackProvider::configure`; never mutated afterwards
#[derive(Clone, Debug)]
pub struct SlackProviderData {
    pub client: Arc<Client>,
}

impl SlackProviderData {
    pub fn new(client: Client) -> Self {
        Self {
            client: Arc::new(client),
        }
    }
}
