//! Request and response shapes for the careboard dashboard API.
//!
//! Every record carries a numeric `id`; the client cache relies on it when
//! patching collections in place.

mod auth;
mod caregivers;
mod diet;
mod documents;
mod hope;
mod journal;
mod plan;
mod research;

pub use auth::{LoginRequest, LoginResponse, UserProfile};
pub use caregivers::{
    Caregiver, CaregiverInviteRequest, CaregiverPermissions, CaregiverUpdateRequest,
    InvitationStatus,
};
pub use diet::{DietLog, DietLogCreateRequest, DietLogUpdateRequest, MealType};
pub use documents::{Document, DocumentCreateRequest, DocumentUpdateRequest};
pub use hope::{HopeSnippet, HopeSnippetCreateRequest, HopeSnippetUpdateRequest};
pub use journal::{JournalLog, JournalLogCreateRequest, JournalLogUpdateRequest};
pub use plan::{PlanItem, PlanItemCreateRequest, PlanItemUpdateRequest};
pub use research::{SaveResearchRequest, SavedResearch};

/// Identifier shared by every dashboard record.
pub type RecordId = i64;

time::serde::format_description!(calendar_date, Date, "[year]-[month]-[day]");
