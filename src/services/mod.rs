pub mod action_service;
pub mod alerts;
pub mod checks;
pub mod filter_service;
pub mod notification_service;

pub use action_service::{perform_rebalance, ActionRunner, RebalanceOutcome};
pub use checks::*;
pub use filter_service::{EventFilter, SEQUENCER_OUT_ANSWER};
pub use notification_service::{
    Notification, NotificationChannel, Notifier, NotifyError, WebhookNotifier,
};
