//! Use cases (application business logic)

pub mod chat;
pub(crate) mod shared;
