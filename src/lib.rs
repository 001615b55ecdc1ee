//! # Blake Fragments
//!
//! Transcription extraction and text-reuse reporting for the William Blake
//! Archive.
//!
//! Transcriptions are pulled out of the archive's XML into one plain-text
//! file per object; those files are loaded into a Superfastmatch server,
//! which finds passages shared between objects. This crate then replays the
//! server's match offsets against each document's text and writes every
//! shared fragment to CSV, optionally leaving out matches between copies
//! printed from the same plate.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌─────────────┐         ┌────────────────┐
//! │ XML copy │──▶│  extract    │──▶ .txt ──▶ Superfastmatch │
//! └──────────┘   └─────────────┘         └───────┬────────┘
//!                                                 ▼
//! ┌──────────┐   ┌─────────────┐   ┌──────────────────────┐
//! │ relations│──▶│   matrix    │──▶│ source → matches →   │──▶ CSV
//! │   .csv   │   └─────────────┘   │ locate → export      │
//! └──────────┘                     └──────────────────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`error`] | Library error type |
//! | [`extract`] | XML transcription extraction |
//! | [`models`] | Superfastmatch wire records |
//! | [`document`] | Documents and title parsing |
//! | [`locate`] | Fragment text by character offsets |
//! | [`matches`] | Matches between two documents |
//! | [`matrix`] | Same-matrix relations |
//! | [`source`] | HTTP and in-memory document sources |
//! | [`export`] | Fragment CSV export |
//! | [`progress`] | Export progress reporting |

pub mod config;
pub mod document;
pub mod error;
pub mod export;
pub mod extract;
pub mod locate;
pub mod matches;
pub mod matrix;
pub mod models;
pub mod progress;
pub mod source;

pub use document::Document;
pub use error::{Error, Result};
pub use matches::Match;
pub use matrix::MatrixIndex;
