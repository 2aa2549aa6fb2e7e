//! SeaORM entities and their conversions to the domain types.

pub mod category;
pub mod post;
pub mod post_category;
pub mod post_tag;
pub mod user;
