//! Subscription handle for the embedded bus.

use std::sync::atomic::{AtomicBool, Ordering};

use crossbeam_channel::Sender;

use crate::service::{Subscription, SubscriptionId};

use super::dispatcher::ControlMsg;

/// Handle to one bus subscription.
///
/// Dropping the handle attempts best-effort unregistration.
pub struct BusSubscription {
    subscription_id: SubscriptionId,
    control_tx: Sender<ControlMsg>,
    cancelled: AtomicBool,
}

impl BusSubscription {
    pub(crate) fn new(subscription_id: SubscriptionId, control_tx: Sender<ControlMsg>) -> Self {
        Self {
            subscription_id,
            control_tx,
            cancelled: AtomicBool::new(false),
        }
    }

    fn request_unregister(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }

        if self
            .control_tx
            .try_send(ControlMsg::Unsubscribe {
                subscription_id: self.subscription_id,
            })
            .is_err()
        {
            tracing::debug!(
                subscription_id = %self.subscription_id,
                "bus unsubscribe not delivered; worker already gone or control queue full"
            );
        }
    }
}

impl Subscription for BusSubscription {
    fn id(&self) -> SubscriptionId {
        self.subscription_id
    }

    fn cancel(&self) {
        self.request_unregister();
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Drop for BusSubscription {
    fn drop(&mut self) {
        // Best-effort: do not block on shutdown.
        self.request_unregister();
    }
}

impl std::fmt::Debug for BusSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BusSubscription")
            .field("subscription_id", &self.subscription_id)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossbeam_channel::bounded;

    #[test]
    fn test_cancel_is_idempotent() {
        let (tx, rx) = bounded::<ControlMsg>(4);
        let sub = BusSubscription::new(SubscriptionId::new(), tx);

        assert!(!sub.is_cancelled());
        sub.cancel();
        sub.cancel();
        assert!(sub.is_cancelled());

        // Exactly one unregister request was issued.
        assert!(matches!(
            rx.try_recv(),
            Ok(ControlMsg::Unsubscribe { .. })
        ));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_drop_after_cancel_sends_nothing_more() {
        let (tx, rx) = bounded::<ControlMsg>(4);
        let sub = BusSubscription::new(SubscriptionId::new(), tx);
        sub.cancel();
        drop(sub);

        assert!(matches!(
            rx.try_recv(),
            Ok(ControlMsg::Unsubscribe { .. })
        ));
        assert!(rx.try_recv().is_err());
    }
}
