use std::error::Error;
use std::sync::Arc;

use async_trait::async_trait;
use itertools::Itertools;
use model::contact::EmergencyContact;

use crate::{EscortError, EscortResult, ValidationError};

/// Persisted emergency contacts: an ordered list, unique by phone number,
/// independent of any journey.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list(&self) -> Result<Vec<EmergencyContact>, Box<dyn Error + Send>>;
    async fn save(&self, contacts: &[EmergencyContact]) -> Result<(), Box<dyn Error + Send>>;
}

/// Contact management rules on top of a store.
#[derive(Clone)]
pub struct ContactBook {
    store: Arc<dyn ContactStore>,
}

impl ContactBook {
    pub fn new(store: Arc<dyn ContactStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self) -> EscortResult<Vec<EmergencyContact>> {
        Ok(self.store.list().await?)
    }

    /// Replaces the whole list. Duplicates are rejected; wiping the list
    /// is rejected once any contact exists.
    pub async fn replace(
        &self,
        contacts: Vec<EmergencyContact>,
    ) -> EscortResult<Vec<EmergencyContact>> {
        let contacts = contacts
            .into_iter()
            .map(normalized)
            .collect::<Result<Vec<_>, _>>()?;
        if !contacts.iter().all_unique() {
            return Err(ValidationError::DuplicateContact.into());
        }
        if contacts.is_empty() && !self.store.list().await?.is_empty() {
            return Err(ValidationError::LastContact.into());
        }
        self.store.save(&contacts).await?;
        Ok(contacts)
    }

    /// Numbers are stored trimmed; a blank number is rejected.
    pub async fn add(&self, contact: EmergencyContact) -> EscortResult<Vec<EmergencyContact>> {
        let contact = normalized(contact)?;
        let mut contacts = self.store.list().await?;
        if contacts.contains(&contact) {
            return Err(ValidationError::DuplicateContact.into());
        }
        contacts.push(contact);
        self.store.save(&contacts).await?;
        Ok(contacts)
    }

    /// At least one contact has to remain once any exist.
    pub async fn remove(&self, phone_number: &str) -> EscortResult<Vec<EmergencyContact>> {
        let mut contacts = self.store.list().await?;
        let index = contacts
            .iter()
            .position(|contact| contact.phone_number == phone_number)
            .ok_or(EscortError::ContactNotFound)?;
        if contacts.len() == 1 {
            return Err(ValidationError::LastContact.into());
        }
        contacts.remove(index);
        self.store.save(&contacts).await?;
        Ok(contacts)
    }
}

fn normalized(contact: EmergencyContact) -> Result<EmergencyContact, ValidationError> {
    let phone_number = contact.phone_number.trim();
    if phone_number.is_empty() {
        return Err(ValidationError::EmptyPhoneNumber);
    }
    Ok(EmergencyContact::new(phone_number))
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        contacts: Mutex<Vec<EmergencyContact>>,
    }

    #[async_trait]
    impl ContactStore for MemoryStore {
        async fn list(&self) -> Result<Vec<EmergencyContact>, Box<dyn Error + Send>> {
            Ok(self.contacts.lock().unwrap().clone())
        }

        async fn save(&self, contacts: &[EmergencyContact]) -> Result<(), Box<dyn Error + Send>> {
            *self.contacts.lock().unwrap() = contacts.to_vec();
            Ok(())
        }
    }

    fn book() -> ContactBook {
        ContactBook::new(Arc::new(MemoryStore::default()))
    }

    #[tokio::test]
    async fn duplicate_numbers_are_rejected() {
        let book = book();
        book.add(EmergencyContact::new("+491701111111")).await.unwrap();
        let result = book.add(EmergencyContact::new("+491701111111")).await;
        assert!(matches!(
            result,
            Err(EscortError::Validation(ValidationError::DuplicateContact))
        ));

        let result = book
            .replace(vec![
                EmergencyContact::new("+491702222222"),
                EmergencyContact::new("+491702222222"),
            ])
            .await;
        assert!(matches!(
            result,
            Err(EscortError::Validation(ValidationError::DuplicateContact))
        ));
    }

    #[tokio::test]
    async fn the_last_contact_cannot_be_removed() {
        let book = book();
        book.add(EmergencyContact::new("+491701111111")).await.unwrap();
        let result = book.remove("+491701111111").await;
        assert!(matches!(
            result,
            Err(EscortError::Validation(ValidationError::LastContact))
        ));

        let result = book.replace(vec![]).await;
        assert!(matches!(
            result,
            Err(EscortError::Validation(ValidationError::LastContact))
        ));
    }

    #[tokio::test]
    async fn removal_keeps_the_remaining_contacts_in_order() {
        let book = book();
        book.add(EmergencyContact::new("+491701111111")).await.unwrap();
        book.add(EmergencyContact::new("+491702222222")).await.unwrap();
        book.add(EmergencyContact::new("+491703333333")).await.unwrap();

        let remaining = book.remove("+491702222222").await.unwrap();
        let numbers: Vec<&str> = remaining
            .iter()
            .map(|contact| contact.phone_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["+491701111111", "+491703333333"]);

        let result = book.remove("+491709999999").await;
        assert!(matches!(result, Err(EscortError::ContactNotFound)));
    }

    #[tokio::test]
    async fn an_empty_store_accepts_an_empty_replacement() {
        let book = book();
        let replaced = book.replace(vec![]).await.unwrap();
        assert!(replaced.is_empty());
        assert!(book.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn numbers_are_trimmed_and_blank_numbers_are_rejected() {
        let book = book();
        let result = book.add(EmergencyContact::new("   ")).await;
        assert!(matches!(
            result,
            Err(EscortError::Validation(ValidationError::EmptyPhoneNumber))
        ));

        book.add(EmergencyContact::new(" +491701111111 "))
            .await
            .unwrap();
        let result = book.add(EmergencyContact::new("+491701111111")).await;
        assert!(matches!(
            result,
            Err(EscortError::Validation(ValidationError::DuplicateContact))
        ));
    }
}
