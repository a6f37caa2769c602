//! Contact API client methods

use super::{ApiClient, ClientError};
use contacts_core::{Contact, ContactForm, Page};
use serde::Deserialize;

pub const CONTACTS_PATH: &str = "/contacts";
pub const SEARCH_PATH: &str = "/contacts/search";

/// Create/update answers come either as the bare contact or wrapped with a
/// confirmation message.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ContactResponse {
    Wrapped { contact: Contact },
    Bare(Contact),
}

impl From<ContactResponse> for Contact {
    fn from(response: ContactResponse) -> Self {
        match response {
            ContactResponse::Wrapped { contact, .. } | ContactResponse::Bare(contact) => contact,
        }
    }
}

/// Search results are paginated, but a plain list is accepted as well.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SearchResponse {
    Paged(Page<Contact>),
    List(Vec<Contact>),
}

impl From<SearchResponse> for Page<Contact> {
    fn from(response: SearchResponse) -> Self {
        match response {
            SearchResponse::Paged(page) => page,
            SearchResponse::List(results) => Page {
                count: results.len() as u64,
                results,
                next: None,
                previous: None,
            },
        }
    }
}

impl ApiClient {
    /// List one page of the user's contacts
    pub async fn list_contacts(
        &self,
        page: u32,
        page_size: u32,
    ) -> Result<Page<Contact>, ClientError> {
        let request = self
            .get(CONTACTS_PATH)
            .query("page", page)
            .query("page_size", page_size);
        self.execute(request).await
    }

    /// Find contacts by name or telephone number
    pub async fn search_contacts(&self, query: &str) -> Result<Page<Contact>, ClientError> {
        let request = self.get(SEARCH_PATH).query("q", query);
        let response: SearchResponse = self.execute(request).await?;
        Ok(response.into())
    }

    /// Create a contact
    pub async fn create_contact(&self, form: &ContactForm) -> Result<Contact, ClientError> {
        let request = self.post(CONTACTS_PATH).json(form);
        let response: ContactResponse = self.execute(request).await?;
        Ok(response.into())
    }

    /// Replace the fields of an existing contact
    pub async fn update_contact(
        &self,
        id: u64,
        form: &ContactForm,
    ) -> Result<Contact, ClientError> {
        let request = self.put(&format!("{CONTACTS_PATH}/{id}")).json(form);
        let response: ContactResponse = self.execute(request).await?;
        Ok(response.into())
    }

    /// Delete a contact
    pub async fn delete_contact(&self, id: u64) -> Result<(), ClientError> {
        let request = self.delete(&format!("{CONTACTS_PATH}/{id}"));
        self.execute_empty(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact_json() -> serde_json::Value {
        json!({"id": 1, "name": "Ada", "telephones": [{"number": "0123456789"}]})
    }

    #[test]
    fn contact_response_unwraps_envelope() {
        let wrapped: ContactResponse = serde_json::from_value(
            json!({"message": "Contact created successfully", "contact": contact_json()}),
        )
        .unwrap();
        let bare: ContactResponse = serde_json::from_value(contact_json()).unwrap();

        assert_eq!(Contact::from(wrapped), Contact::from(bare));
    }

    #[test]
    fn search_response_accepts_plain_list() {
        let response: SearchResponse =
            serde_json::from_value(json!([contact_json(), contact_json()])).unwrap();
        let page = Page::from(response);
        assert_eq!(page.count, 2);
        assert!(page.next.is_none());
    }
}
