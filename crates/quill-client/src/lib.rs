//! # Quill Client
//!
//! Typed access to the Quill API plus the reducer-driven post store a UI
//! binds to. The store keeps the currently loaded page of posts, the
//! category list, and loading/error flags consistent across fetches and
//! confirmed mutations.

pub mod api;
pub mod error;
pub mod store;

pub use api::ApiClient;
pub use error::ClientError;
pub use store::{Action, PostStore, StoreState, reduce};
