//! Configuration, errors, logging and the HTTP surface

pub mod config;
pub mod error;
pub mod logging;
pub mod rate_limiter;
pub mod web_server;

pub use config::Settings;
pub use error::{AppError, AppResult, RegistrationError, RegistrationResult};
pub use logging::{init_logger, log_configuration};
pub use rate_limiter::RateLimiter;
