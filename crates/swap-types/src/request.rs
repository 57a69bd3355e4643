use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::id::RequestId;

/// Wire names of the request fields, as reported in validation errors.
pub mod fields {
    pub const CURRENT_SECTION: &str = "currentSection";
    pub const DESIRED_SECTION: &str = "desiredSection";
    pub const CONTACT: &str = "contact";
}

/// Reject an absent or blank value for the named field.
///
/// Values are never trimmed or case-folded; a section name is stored and
/// compared exactly as submitted.
pub fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::MissingField(field));
    }
    Ok(())
}

/// A stored swap request: "I hold `current_section` and want `desired_section`".
///
/// Records are immutable once the store has created them. `created_at` is
/// only used to order listings, never by the matcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwapRequest {
    pub id: RequestId,
    pub current_section: String,
    pub desired_section: String,
    pub contact: String,
    pub created_at: DateTime<Utc>,
}

impl SwapRequest {
    /// The `(current, desired)` pair this record is indexed under.
    pub fn pair(&self) -> (&str, &str) {
        (&self.current_section, &self.desired_section)
    }
}

/// A submission that has not been stored yet.
///
/// Missing JSON fields deserialize to empty strings so that they are reported
/// through [`NewSwapRequest::validate`] like any other blank field. The legacy
/// `whatsappNumber` field is accepted in place of `contact`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSwapRequest {
    #[serde(default)]
    pub current_section: String,
    #[serde(default)]
    pub desired_section: String,
    #[serde(default, alias = "whatsappNumber")]
    pub contact: String,
}

impl NewSwapRequest {
    pub fn new(
        current_section: impl Into<String>,
        desired_section: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            current_section: current_section.into(),
            desired_section: desired_section.into(),
            contact: contact.into(),
        }
    }

    /// Check every required field, reporting the first one that is blank.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require(fields::CURRENT_SECTION, &self.current_section)?;
        require(fields::DESIRED_SECTION, &self.desired_section)?;
        require(fields::CONTACT, &self.contact)?;
        Ok(())
    }

    /// Validate and turn the submission into a record with the given identity.
    pub fn into_record(
        self,
        id: RequestId,
        created_at: DateTime<Utc>,
    ) -> Result<SwapRequest, ValidationError> {
        self.validate()?;
        Ok(SwapRequest {
            id,
            current_section: self.current_section,
            desired_section: self.desired_section,
            contact: self.contact,
            created_at,
        })
    }
}
