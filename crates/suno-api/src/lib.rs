//! Async client for the sunoapi.org song generation API.
//!
//! The crate covers the remote half of a generation job's lifecycle:
//! submitting a request, polling until a terminal state, and fetching the
//! resulting audio and cover assets. Orchestration (filenames, tagging,
//! batch runs) lives in the CLI crate on top of the [`SunoApi`] trait.

pub mod client;
pub mod content;
pub mod error;
pub mod models;
pub mod waiter;

pub use client::{BASE_URL, DEFAULT_CALLBACK_URL, SunoApi, SunoClient};
pub use content::load_content;
pub use error::{Result, SunoError};
pub use models::{
    GenerateRequest, Model, SubmitResponse, TaskSnapshot, TaskStatus, Track, TrackTags,
    VocalGender, extract_track_tags,
};
pub use waiter::{Completed, WaitOptions, wait_for_completion};
