//! Prize notifications.
//!
//! Dispatch is fire-and-forget: [`NotificationDispatcher::notify`] spawns a
//! task and returns immediately. Only a missing recipient is reported back to
//! the caller; whatever happens inside the task (catalog lookup failure,
//! transport failure) is logged and goes nowhere else.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use storefront_catalog::CatalogStream;
use storefront_core::CurrentIdentity;

use crate::prize::Prize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("recipient rejected: {0}")]
    Rejected(String),

    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Why no notification was dispatched.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Nothing to announce.")]
    NoWin,

    #[error("No email found.")]
    NoRecipient,
}

/// Outbound message channel (an email gateway in production).
#[async_trait]
pub trait NotificationTransport: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError>;
}

#[async_trait]
impl<T> NotificationTransport for Arc<T>
where
    T: NotificationTransport + ?Sized,
{
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        (**self).send(to, subject, body).await
    }
}

/// Fixed parts of the prize message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationSettings {
    pub subject: String,
    pub support_email: String,
    pub signature: String,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            subject: "Congratulations! You Won a Prize on Wheel Roulette!".to_string(),
            support_email: "support@ecommerce.com".to_string(),
            signature: "E-Commerce Team".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrizeMessage {
    pub subject: String,
    pub body: String,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    catalog: Arc<dyn CatalogStream>,
    transport: Arc<dyn NotificationTransport>,
    settings: NotificationSettings,
    runtime: Handle,
}

impl NotificationDispatcher {
    pub fn new(
        catalog: Arc<dyn CatalogStream>,
        transport: Arc<dyn NotificationTransport>,
        settings: NotificationSettings,
        runtime: Handle,
    ) -> Self {
        Self {
            catalog,
            transport,
            settings,
            runtime,
        }
    }

    pub fn settings(&self) -> &NotificationSettings {
        &self.settings
    }

    /// Spawn delivery of the prize message to the shopper.
    pub fn notify(&self, identity: &CurrentIdentity, prize: &Prize) -> Result<JoinHandle<()>, NotifyError> {
        if prize.is_no_win() {
            return Err(NotifyError::NoWin);
        }
        let Some(to) = identity.email().map(str::to_owned) else {
            warn!(user = ?identity.user_id(), prize = %prize.label(), "no email on identity; prize notification skipped");
            return Err(NotifyError::NoRecipient);
        };

        let dispatcher = self.clone();
        let prize = prize.clone();
        Ok(self.runtime.spawn(async move {
            let message = dispatcher.compose(&prize).await;
            match dispatcher.transport.send(&to, &message.subject, &message.body).await {
                Ok(()) => info!(to = %to, prize = %prize.label(), "prize notification sent"),
                Err(e) => error!(to = %to, prize = %prize.label(), error = %e, "prize notification failed"),
            }
        }))
    }

    /// Build the message for `prize`. Product prizes are looked up in the
    /// catalog; a failed lookup falls back to the prize label.
    pub async fn compose(&self, prize: &Prize) -> PrizeMessage {
        let support = &self.settings.support_email;
        let details = match prize {
            Prize::Discount { percent, .. } => format!(
                "You have won a {percent}% discount on your next purchase! Use the code WHEEL{percent} at checkout."
            ),
            Prize::Product { catalog_id, label } => match self.catalog.get_by_id(*catalog_id).await {
                Ok(product) => format!(
                    "You have won a free {} (ID: {catalog_id}). Please contact our support team at {support} to claim your prize.",
                    product.name
                ),
                Err(e) => {
                    warn!(product_id = %catalog_id, error = %e, "prize product lookup failed; using prize label");
                    format!(
                        "You have won a free product: {label} (ID: {catalog_id}). Please contact our support team at {support} to claim your prize."
                    )
                }
            },
            Prize::Coupon { code, label } => format!(
                "You have won a coupon: {label}. Use the code {code} at checkout to redeem your reward."
            ),
        };

        PrizeMessage {
            subject: self.settings.subject.clone(),
            body: format!(
                "Dear User,\n\nCongratulations! You have won {} by spinning the Wheel Roulette.\n\n{details}\n\nThank you for participating!\nBest regards,\n{}",
                prize.label(),
                self.settings.signature
            ),
        }
    }
}

impl core::fmt::Debug for NotificationDispatcher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationDispatcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentNotification {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Transport that keeps messages in memory (dev/test outbox).
#[derive(Debug, Default)]
pub struct InMemoryTransport {
    sent: Mutex<Vec<SentNotification>>,
    failure: Mutex<Option<TransportError>>,
    delivered: Notify,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following send fail with `error` (or succeed again with `None`).
    pub fn fail_with(&self, error: Option<TransportError>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = error;
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Wait until at least `count` messages were delivered. Returns `false` on
    /// timeout.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.delivered.notified();
                if self.sent.lock().unwrap_or_else(PoisonError::into_inner).len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

#[async_trait]
impl NotificationTransport for InMemoryTransport {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), TransportError> {
        if let Some(err) = self.failure.lock().unwrap_or_else(PoisonError::into_inner).clone() {
            return Err(err);
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(SentNotification {
                to: to.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        self.delivered.notify_waiters();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use storefront_catalog::{InMemoryCatalog, Product};
    use storefront_core::{ProductId, UserId};

    fn dispatcher(catalog: Arc<InMemoryCatalog>, transport: Arc<InMemoryTransport>) -> NotificationDispatcher {
        NotificationDispatcher::new(catalog, transport, NotificationSettings::default(), Handle::current())
    }

    fn shopper() -> CurrentIdentity {
        CurrentIdentity::new(UserId::new(), "ada@example.com")
    }

    #[tokio::test]
    async fn discount_message_carries_wheel_code() {
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), Arc::new(InMemoryTransport::new()));
        let message = d.compose(&Prize::discount(20)).await;
        assert_eq!(message.subject, "Congratulations! You Won a Prize on Wheel Roulette!");
        assert!(message.body.starts_with("Dear User,\n\nCongratulations! You have won 20% Off by spinning"));
        assert!(message.body.contains("Use the code WHEEL20 at checkout."));
        assert!(message.body.ends_with("Best regards,\nE-Commerce Team"));
    }

    #[tokio::test]
    async fn coupon_message_uses_code_verbatim() {
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), Arc::new(InMemoryTransport::new()));
        let message = d.compose(&Prize::coupon("FREESHIP", "Free Shipping")).await;
        assert!(message.body.contains(
            "You have won a coupon: Free Shipping. Use the code FREESHIP at checkout to redeem your reward."
        ));
    }

    #[tokio::test]
    async fn product_message_uses_resolved_catalog_name() {
        let catalog = Arc::new(InMemoryCatalog::with_products(vec![
            Product::new("Cotton Tee", 15.0).with_id(ProductId::new(1)),
        ]));
        let d = dispatcher(catalog, Arc::new(InMemoryTransport::new()));
        let message = d.compose(&Prize::product(ProductId::new(1), "Free T-Shirt")).await;
        assert!(message.body.contains("You have won a free Cotton Tee (ID: 1)."));
        assert!(message.body.contains("support@ecommerce.com"));
    }

    #[tokio::test]
    async fn product_message_falls_back_to_label_when_lookup_fails() {
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), Arc::new(InMemoryTransport::new()));
        let message = d.compose(&Prize::product(ProductId::new(2), "Free Headphones")).await;
        assert!(message.body.contains("You have won a free product: Free Headphones (ID: 2)."));
    }

    #[tokio::test]
    async fn notify_delivers_in_background() {
        let transport = Arc::new(InMemoryTransport::new());
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), transport.clone());

        let task = d.notify(&shopper(), &Prize::discount(10)).unwrap();
        task.await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "ada@example.com");
    }

    #[tokio::test]
    async fn notify_without_email_is_skipped() {
        let transport = Arc::new(InMemoryTransport::new());
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), transport.clone());
        assert_eq!(
            d.notify(&CurrentIdentity::with_user(UserId::new()), &Prize::discount(10)).err(),
            Some(NotifyError::NoRecipient)
        );
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn blank_prize_sends_nothing() {
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), Arc::new(InMemoryTransport::new()));
        assert_eq!(
            d.notify(&shopper(), &Prize::coupon("NONE", "Nothing")).err(),
            Some(NotifyError::NoWin)
        );
    }

    #[tokio::test]
    async fn transport_failure_is_contained_in_the_task() {
        let transport = Arc::new(InMemoryTransport::new());
        transport.fail_with(Some(TransportError::Unavailable("smtp down".to_string())));
        let d = dispatcher(Arc::new(InMemoryCatalog::new()), transport.clone());

        let task = d.notify(&shopper(), &Prize::discount(50)).unwrap();
        assert!(task.await.is_ok());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn wait_for_times_out_without_deliveries() {
        let transport = InMemoryTransport::new();
        assert!(!transport.wait_for(1, Duration::from_millis(10)).await);
    }
}
