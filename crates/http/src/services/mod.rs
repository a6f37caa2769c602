//! Stateful services used by the front-end

pub mod auth;
pub mod contacts;

pub use auth::AuthService;
pub use contacts::ContactBook;
