use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::RecordId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedResearch {
    pub id: RecordId,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub saved_at: Option<OffsetDateTime>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveResearchRequest {
    pub title: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}
