//! Shared library for the Agenda de Shows functions.
//!
//! This crate provides the gateway clients (Google Sheets, ImageKit, ImgBB),
//! the row-to-record mapper, and the admin workflow used across all functions.

pub mod collate;
pub mod config;
pub mod error;
pub mod google;
pub mod http;
pub mod imagekit;
pub mod imgbb;
pub mod media;
pub mod sheets;
pub mod shows;
pub mod workflow;

pub use collate::Collation;
pub use config::Config;
pub use error::{Error, Result};
pub use http::ApiResponse;
pub use imagekit::{DeleteOutcome, DeleteSummary, ImageKitClient, UploadedFile};
pub use imgbb::ImgBbClient;
pub use sheets::SheetsClient;
pub use shows::Show;
pub use workflow::{AdminEvent, AdminState, SaveRequest, SaveReport, ShowForm};
