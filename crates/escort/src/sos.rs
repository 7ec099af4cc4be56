use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use model::{contact::EmergencyContact, coordinate::Coordinate, sos::SosStatus};

use crate::messaging::MessagingTransport;

/// Countdown granted before an unanswered session sends the alert. One
/// duration covers every entry path; it is configurable, not hardcoded
/// per trigger.
pub const DEFAULT_COUNTDOWN_SECONDS: u64 = 60;

pub const COUNTDOWN_PERIOD: Duration = Duration::from_secs(1);

/// Live-location link attached to every alert message.
pub fn map_link(position: &Coordinate) -> String {
    format!(
        "https://www.google.com/maps/search/?api=1&query={},{}",
        position.latitude, position.longitude
    )
}

/// The message dispatched to every emergency contact.
pub fn alert_message(position: &Coordinate) -> String {
    format!(
        "SOS Alert: The person is not safe! Location: {}",
        map_link(position)
    )
}

/// One open confirmation session. At most one exists per journey; while
/// it is open the owning simulation stays halted.
#[derive(Debug)]
pub struct SosSession {
    remaining_seconds: u64,
    triggering_checkpoint: Option<u32>,
    contacts: Vec<EmergencyContact>,
}

impl SosSession {
    /// Opens the session with a contact snapshot taken at trigger time.
    /// Dispatch never races concurrent contact edits.
    pub fn open(
        countdown_seconds: u64,
        triggering_checkpoint: Option<u32>,
        contacts: Vec<EmergencyContact>,
    ) -> Self {
        Self {
            remaining_seconds: countdown_seconds,
            triggering_checkpoint,
            contacts,
        }
    }

    /// One countdown tick. Returns `true` once the countdown ran out and
    /// the alert has to go out.
    pub fn tick(&mut self) -> bool {
        if self.remaining_seconds <= 1 {
            self.remaining_seconds = 0;
            return true;
        }
        self.remaining_seconds -= 1;
        false
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn into_contacts(self) -> Vec<EmergencyContact> {
        self.contacts
    }

    pub fn status(&self) -> SosStatus {
        SosStatus {
            remaining_seconds: self.remaining_seconds,
            triggering_checkpoint: self.triggering_checkpoint,
        }
    }
}

/// Best-effort fan-out: one send per contact, failures logged, nothing
/// retried and no contact blocks the others.
pub async fn dispatch_alert(
    transport: Arc<dyn MessagingTransport>,
    contacts: Vec<EmergencyContact>,
    message: String,
) {
    let sends = contacts.iter().map(|contact| {
        let transport = Arc::clone(&transport);
        let message = message.as_str();
        async move {
            if let Err(why) = transport.send(&contact.phone_number, message).await {
                log::error!("sos alert to {} failed: {:?}", contact.phone_number, why);
            }
        }
    });
    join_all(sends).await;
}

#[cfg(test)]
mod tests {
    use std::error::Error;
    use std::fmt;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    #[test]
    fn the_map_link_carries_the_coordinate() {
        let link = map_link(&Coordinate::new(54.3233, 10.1228));
        assert_eq!(
            link,
            "https://www.google.com/maps/search/?api=1&query=54.3233,10.1228"
        );
        assert!(alert_message(&Coordinate::new(54.3233, 10.1228)).contains(&link));
    }

    #[test]
    fn the_countdown_expires_after_its_full_duration() {
        let mut session = SosSession::open(3, Some(1), vec![]);
        assert!(!session.tick());
        assert_eq!(session.remaining_seconds(), 2);
        assert!(!session.tick());
        assert!(session.tick());
        assert_eq!(session.remaining_seconds(), 0);
    }

    #[test]
    fn a_zero_countdown_expires_on_the_first_tick() {
        let mut session = SosSession::open(0, None, vec![]);
        assert!(session.tick());
    }

    #[derive(Debug)]
    struct SendFailed;

    impl fmt::Display for SendFailed {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "send failed")
        }
    }

    impl Error for SendFailed {}

    /// Records every send; numbers listed in `failing` are rejected.
    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(String, String)>>,
        failing: Vec<String>,
    }

    #[async_trait]
    impl MessagingTransport for RecordingTransport {
        async fn send(
            &self,
            phone_number: &str,
            message: &str,
        ) -> Result<(), Box<dyn Error + Send>> {
            if self.failing.iter().any(|number| number == phone_number) {
                return Err(Box::new(SendFailed));
            }
            self.sent
                .lock()
                .unwrap()
                .push((phone_number.to_string(), message.to_string()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn dispatch_sends_once_per_contact() {
        let transport = Arc::new(RecordingTransport::default());
        let contacts = vec![
            EmergencyContact::new("+491701111111"),
            EmergencyContact::new("+491702222222"),
        ];
        dispatch_alert(
            Arc::clone(&transport) as Arc<dyn MessagingTransport>,
            contacts,
            "help".to_string(),
        )
        .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|(_, message)| message == "help"));
    }

    #[tokio::test]
    async fn one_failing_contact_never_blocks_the_rest() {
        let transport = Arc::new(RecordingTransport {
            sent: Mutex::new(vec![]),
            failing: vec!["+491701111111".to_string()],
        });
        let contacts = vec![
            EmergencyContact::new("+491701111111"),
            EmergencyContact::new("+491702222222"),
        ];
        dispatch_alert(
            Arc::clone(&transport) as Arc<dyn MessagingTransport>,
            contacts,
            "help".to_string(),
        )
        .await;

        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+491702222222");
    }
}
