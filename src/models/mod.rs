//! Request and Response bodies
//!
//! This module defines the DTOs (Data Transfer Objects) serialized into and
//! out of response envelope bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{validate_key, PutEntryRequest, MAX_KEY_LENGTH};
pub use responses::{
    DeleteResponse, EntryResponse, ErrorResponse, HealthResponse, SetResponse,
};
