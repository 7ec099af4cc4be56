use std::error::Error;

use async_trait::async_trait;

/// Delivers one alert message to one phone number.
///
/// Failures are reported per call; an SOS fan-out logs them and carries
/// on with the remaining contacts.
#[async_trait]
pub trait MessagingTransport: Send + Sync {
    async fn send(&self, phone_number: &str, message: &str) -> Result<(), Box<dyn Error + Send>>;
}
