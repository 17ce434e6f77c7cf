//! # noteshub_core
//!
//! The engagement and visibility core of a study-notes sharing service:
//! users upload documents, browse a shared catalog, and engage through
//! votes, comments, and bookmarks. This crate holds the rules: who may
//! see a note, how a vote toggles and switches, who may delete a comment,
//! how the daily upload quota is enforced, and how the catalog listing is
//! filtered, sorted, and paginated. Transport framing and credential
//! issuance live in the surrounding application.
//!
//! ## Components
//!
//! - **[`notes`]**: note creation (quota gated), fetch with visibility
//!   enforcement, owner-only update/delete, and the owner's own listing
//! - **[`vote`]**: the idempotent per-note voting state machine with
//!   aggregate counters kept consistent with the voter set
//! - **[`comment`]**: comment creation gated by a per-note toggle, with
//!   dual deletion rights (author or note owner)
//! - **[`bookmark`]**: per-user saved set exposed as a toggle
//! - **[`ingest`]**: rolling calendar-day upload quota
//! - **[`catalog`]**: the paginated/filtered/searchable listing query
//! - **[`identity`]**: bearer-credential resolution, guests included
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use noteshub_core::domain::{NewNote, Visibility};
//! use noteshub_core::notes::Notes;
//! use noteshub_core::store::Store;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), noteshub_core::HubError> {
//!     let store = Store::open(std::path::Path::new("/var/lib/noteshub")).await?;
//!     let notes = Notes::new(&store);
//!
//!     let note = notes
//!         .create(NewNote {
//!             title: "Linear Algebra Week 3".into(),
//!             subject: "Mathematics".into(),
//!             university: "ETH Zurich".into(),
//!             tags: vec!["algebra".into(), "exam prep".into()],
//!             owner_id: "user-1".into(),
//!             content_ref: "https://cdn.example/notes/la-w3.pdf".into(),
//!             visibility: Visibility::Public,
//!         })
//!         .await?;
//!
//!     println!("created note {}", note.id);
//!     Ok(())
//! }
//! ```
//!
//! ## Error handling
//!
//! Every operation returns [`HubResult<T>`] wrapping [`HubError`]. The
//! deterministic rejections (`NotFound`, `Forbidden`, `Validation`,
//! `QuotaExceeded`) are never retried internally; unexpected persistence
//! failures surface as the `Db` variant for the caller to handle.

pub mod bookmark;
pub mod catalog;
pub mod comment;
pub mod domain;
pub mod error;
pub mod identity;
pub mod ingest;
pub mod notes;
pub mod store;
pub mod vote;

/// Re-exports the most commonly used types for convenience.
pub use error::{HubError, HubResult};
