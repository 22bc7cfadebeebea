use crate::domain::notification::Notification;
use crate::domain::ports::{Notifier, SideEffectError};

/// Delivers notifications to the application log.
///
/// Outbound email/push delivery lives outside this service; the log line is
/// the hand-off point.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), SideEffectError> {
        log::info!(
            "notify user={} order={} kind={:?}: {}",
            notification.user_id,
            notification.order_id,
            notification.kind,
            notification.message
        );
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn notify(&self, _notification: &Notification) -> Result<(), SideEffectError> {
        Ok(())
    }
}
