//! OTS registration core
//!
//! Applicant registry, registration wizard, admin approval, Chapa payments and
//! the webhook server. Telegram lives in the `otsbot` crate and talks to this
//! crate through [`registration::RegistrationEvent`]s.

pub mod app;
pub mod core;
pub mod payment;
pub mod registration;

pub use app::Core;
