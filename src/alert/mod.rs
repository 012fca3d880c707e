//! Silence alerting.

mod deadman;
mod notifier;

pub use deadman::{DeadManHandle, DeadManSwitch};
pub use notifier::{
    silence_message, AlertError, Alerter, LogAlerter, SilencePayload, WebhookAlerter,
};
