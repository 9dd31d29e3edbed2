//! Telegram bot handler tree configuration
//!
//! Private chats carry the applicant wizard; the review chat carries admin
//! replies; inline buttons carry decisions and payments.

mod admin;
mod applicant;
mod schema;
mod types;

pub use schema::schema;
pub use types::{HandlerDeps, HandlerError};
