//! Push-notification seam.
//!
//! The push-notification service is an out-of-scope external collaborator;
//! this trait is the dependency-injection seam `api` wires to a concrete
//! fire-and-forget implementation.

use async_trait::async_trait;
use uuid::Uuid;

/// Fire-and-forget push notification to a rider or driver.
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn notify(&self, recipient_id: Uuid, title: &str, body: &str);
}

/// No-op implementation used when no push provider is configured, and in
/// tests.
pub struct MockNotificationService;

impl MockNotificationService {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MockNotificationService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NotificationService for MockNotificationService {
    async fn notify(&self, recipient_id: Uuid, title: &str, body: &str) {
        tracing::debug!(
            recipient_id = %recipient_id,
            title,
            body,
            "mock notification (no push provider configured)"
        );
    }
}
