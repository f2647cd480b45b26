mod notifier;

pub use notifier::{INotifier, LogNotifier, ReminderDispatchDTO, WebhookNotifier};
