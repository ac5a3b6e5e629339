//! Push notification delivery.
//!
//! Subscriptions are stored by weave-db; this crate only decides what to
//! send and hands each delivery to a [`PushSender`]. Encrypting and posting
//! to a browser push service is the sender's concern.

pub mod sender;

pub use sender::{LogSender, PushError, PushSender, SharedSender, send_to_all};
