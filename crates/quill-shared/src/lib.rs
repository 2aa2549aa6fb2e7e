//! # Quill Shared
//!
//! Wire types shared between the API server and the client crate:
//! request/response DTOs and the response envelope.

pub mod dto;
pub mod response;

pub use response::{ApiResponse, FieldError, PageMeta};
