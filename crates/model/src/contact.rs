use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ExampleData;

/// An emergency contact, unique by phone number. Contacts outlive any
/// single journey.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub phone_number: String,
}

impl EmergencyContact {
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
        }
    }
}

impl ExampleData for EmergencyContact {
    fn example_data() -> Self {
        EmergencyContact::new("+49431550110")
    }
}
