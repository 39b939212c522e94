//! Operator email notifications.

mod smtp;

pub use smtp::Notifier;
