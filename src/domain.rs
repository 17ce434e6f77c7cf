use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{HubError, HubResult};

/// Who may read a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Private => "private",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "public" => Some(Self::Public),
            "private" => Some(Self::Private),
            _ => None,
        }
    }
}

/// A single user's current vote on a note. At most one per (note, user).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteChoice {
    Upvote,
    Downvote,
}

impl VoteChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upvote => "upvote",
            Self::Downvote => "downvote",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "upvote" => Some(Self::Upvote),
            "downvote" => Some(Self::Downvote),
            _ => None,
        }
    }
}

/// Post-mutation aggregate counters returned by every vote operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VoteTally {
    pub upvotes: i64,
    pub downvotes: i64,
}

/// A shared document record with metadata, visibility, and engagement state.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub id: String,
    pub title: String,
    pub subject: String,
    pub university: String,
    /// Display order is preserved; tags are not deduplicated.
    pub tags: Vec<String>,
    pub owner_id: String,
    /// Opaque reference to the uploaded document (URL or storage key).
    pub content_ref: String,
    pub visibility: Visibility,
    pub comments_enabled: bool,
    pub upvotes: i64,
    pub downvotes: i64,
    pub created_at: DateTime<Utc>,
}

impl Note {
    /// Pure visibility predicate: public notes are readable by anyone,
    /// including guests; private notes only by their owner.
    pub fn readable_by(&self, viewer: Option<&str>) -> bool {
        match self.visibility {
            Visibility::Public => true,
            Visibility::Private => viewer == Some(self.owner_id.as_str()),
        }
    }
}

/// A text entry attached to exactly one note. Comments have no edit
/// operation; they are created and deleted only.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub note_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Input for note creation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewNote {
    pub title: String,
    pub subject: String,
    pub university: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub owner_id: String,
    pub content_ref: String,
    #[serde(default = "default_visibility")]
    pub visibility: Visibility,
}

fn default_visibility() -> Visibility {
    Visibility::Public
}

/// Partial update applied by the note owner; `None` fields are untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteUpdate {
    pub title: Option<String>,
    pub subject: Option<String>,
    pub university: Option<String>,
    pub tags: Option<Vec<String>>,
    pub content_ref: Option<String>,
    pub visibility: Option<Visibility>,
    pub comments_enabled: Option<bool>,
}

/// Validates a required text field: trims whitespace and rejects empty.
pub(crate) fn required(field: &str, value: &str) -> HubResult<String> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(HubError::Validation(format!("{field} is required")));
    }

    Ok(trimmed.to_owned())
}

/// Normalizes a tag list: trims each entry and drops blanks, keeping the
/// caller's order for display.
pub(crate) fn clean_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_owned())
        .collect()
}
