use serde::{Deserialize, Serialize};

use crate::RecordId;

/// What a delegated caregiver may see or change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaregiverPermissions {
    pub view_plan: bool,
    pub edit_plan: bool,
    pub view_journal: bool,
    pub view_diet: bool,
    pub view_documents: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Revoked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caregiver {
    pub id: RecordId,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub permissions: CaregiverPermissions,
    pub status: InvitationStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverInviteRequest {
    pub email: String,
    pub permissions: CaregiverPermissions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaregiverUpdateRequest {
    pub permissions: CaregiverPermissions,
}
