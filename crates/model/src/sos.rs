use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ExampleData;

/// An open SOS confirmation session. Its presence alone means the owning
/// simulation is halted.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SosStatus {
    pub remaining_seconds: u64,
    /// 1-based number of the checkpoint whose miss opened the session.
    /// `None` for a manual trigger.
    pub triggering_checkpoint: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub enum SosOutcome {
    /// The traveler confirmed they are safe. No alert was sent.
    Safe,
    /// The traveler answered "not safe" or the countdown ran out.
    AlertSent,
}

impl ExampleData for SosStatus {
    fn example_data() -> Self {
        SosStatus {
            remaining_seconds: 42,
            triggering_checkpoint: Some(2),
        }
    }
}
