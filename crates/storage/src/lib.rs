use std::env;
use std::error::{self, Error};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use escort::contacts::ContactStore;
use model::contact::EmergencyContact;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub enum StorageError {
    Io(Arc<io::Error>),
    Json(Arc<serde_json::Error>),
}

impl error::Error for StorageError {}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            StorageError::Io(e) => write!(f, "I/O error: {}", e),
            StorageError::Json(e) => write!(f, "JSON error: {}", e),
        }
    }
}

impl From<io::Error> for StorageError {
    fn from(e: io::Error) -> Self {
        StorageError::Io(Arc::new(e))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::Json(Arc::new(e))
    }
}

/// Contact list persisted as a JSON array of phone numbers. A missing
/// file reads as an empty list; every save rewrites the whole file.
pub struct JsonContactStore {
    path: PathBuf,
}

impl JsonContactStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Reads `CONTACTS_FILE`.
    pub fn from_env() -> Option<Self> {
        Some(Self::new(env::var("CONTACTS_FILE").ok()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read(&self) -> Result<Vec<EmergencyContact>, StorageError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(why) if why.kind() == io::ErrorKind::NotFound => return Ok(vec![]),
            Err(why) => return Err(why.into()),
        };
        let phone_numbers: Vec<String> = serde_json::from_str(&content)?;
        Ok(phone_numbers
            .into_iter()
            .map(EmergencyContact::new)
            .collect())
    }

    async fn write(&self, contacts: &[EmergencyContact]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let phone_numbers: Vec<&str> = contacts
            .iter()
            .map(|contact| contact.phone_number.as_str())
            .collect();
        let content = serde_json::to_string_pretty(&phone_numbers)?;
        tokio::fs::write(&self.path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ContactStore for JsonContactStore {
    async fn list(&self) -> Result<Vec<EmergencyContact>, Box<dyn Error + Send>> {
        match self.read().await {
            Ok(contacts) => Ok(contacts),
            Err(why) => Err(Box::new(why)),
        }
    }

    async fn save(&self, contacts: &[EmergencyContact]) -> Result<(), Box<dyn Error + Send>> {
        match self.write(contacts).await {
            Ok(()) => Ok(()),
            Err(why) => Err(Box::new(why)),
        }
    }
}

/// In-memory contact list for tests and the playground.
#[derive(Default)]
pub struct MemoryContactStore {
    contacts: RwLock<Vec<EmergencyContact>>,
}

impl MemoryContactStore {
    pub fn new(contacts: Vec<EmergencyContact>) -> Self {
        Self {
            contacts: RwLock::new(contacts),
        }
    }
}

#[async_trait]
impl ContactStore for MemoryContactStore {
    async fn list(&self) -> Result<Vec<EmergencyContact>, Box<dyn Error + Send>> {
        Ok(self.contacts.read().await.clone())
    }

    async fn save(&self, contacts: &[EmergencyContact]) -> Result<(), Box<dyn Error + Send>> {
        *self.contacts.write().await = contacts.to_vec();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store(name: &str) -> JsonContactStore {
        let path = env::temp_dir().join(format!("contacts-{}-{}.json", name, std::process::id()));
        JsonContactStore::new(path)
    }

    #[tokio::test]
    async fn a_missing_file_reads_as_no_contacts() {
        let store = temp_store("missing");
        let contacts = store.list().await.unwrap();
        assert!(contacts.is_empty());
    }

    #[tokio::test]
    async fn saved_contacts_come_back_in_order() {
        let store = temp_store("roundtrip");
        let contacts = vec![
            EmergencyContact::new("+491701111111"),
            EmergencyContact::new("+491702222222"),
        ];
        store.save(&contacts).await.unwrap();

        let loaded = store.list().await.unwrap();
        assert_eq!(loaded, contacts);

        tokio::fs::remove_file(store.path()).await.unwrap();
    }

    #[tokio::test]
    async fn the_file_holds_a_plain_array_of_numbers() {
        let store = temp_store("wire");
        store
            .save(&[EmergencyContact::new("+491701111111")])
            .await
            .unwrap();

        let content = tokio::fs::read_to_string(store.path()).await.unwrap();
        let numbers: Vec<String> = serde_json::from_str(&content).unwrap();
        assert_eq!(numbers, vec!["+491701111111"]);

        tokio::fs::remove_file(store.path()).await.unwrap();
    }

    #[tokio::test]
    async fn the_memory_store_replaces_its_list_on_save() {
        let store = MemoryContactStore::new(vec![EmergencyContact::new("+491701111111")]);
        store
            .save(&[EmergencyContact::new("+491702222222")])
            .await
            .unwrap();

        let contacts = store.list().await.unwrap();
        assert_eq!(contacts, vec![EmergencyContact::new("+491702222222")]);
    }
}
