//! Contacts core types and utilities

pub mod config;
pub mod error;
pub mod session;
pub mod storage;
pub mod types;
pub mod validation;

pub use config::ClientConfig;
pub use error::{StorageError, StorageResult};
pub use session::{Session, SessionEvent, SessionStore, TerminationReason};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use types::{Contact, ContactForm, Page, Telephone};
pub use validation::{FieldError, ValidationErrors};
