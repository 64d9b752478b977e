//! Upstream vector source addressing.

use serde::{Deserialize, Serialize};

use crate::tile::{DataTileRef, MAX_DATA_ZOOM};

/// Where vector tiles are fetched from.
///
/// The zoom-14 tier can be served by a separately provisioned backend; when
/// no dedicated URL is configured the general URL serves every zoom.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    pub base_url: String,
    #[serde(default)]
    pub detailed_base_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl UpstreamConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            detailed_base_url: None,
            access_token: None,
        }
    }

    /// Base URL responsible for the given data zoom.
    pub fn base_url_for(&self, data_z: u32) -> &str {
        match &self.detailed_base_url {
            Some(url) if data_z == MAX_DATA_ZOOM => url,
            _ => &self.base_url,
        }
    }

    /// Full request URL for a resolved data tile.
    pub fn tile_url(&self, data_tile: &DataTileRef) -> String {
        data_tile.url(
            self.base_url_for(data_tile.data_z),
            self.access_token.as_deref(),
        )
    }
}
