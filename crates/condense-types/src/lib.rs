//! condense-types: Message model and context-management backend client
//!
//! This crate provides the conversation message types shared by the
//! orchestrator and its hosts, the conversion from raw backend messages,
//! and an HTTP client for the backend's context-management endpoint.

pub mod api;
pub mod backend;
pub mod error;
pub mod types;

pub use api::{ApiMessage, convert_api_message};
pub use backend::{BackendClient, ManageAction, ManageContextResponse};
pub use error::{Error, Result};
pub use types::*;
