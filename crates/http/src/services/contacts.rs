//! Paginated contact listing and editing

use crate::client::{ApiClient, ClientError};
use contacts_core::config::MAX_PAGE_SIZE;
use contacts_core::validation::validate_search_query;
use contacts_core::{Contact, ContactForm, Page, ValidationErrors};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// What the contacts table shows: the current page and how to get others
///
/// Every mutation re-fetches the current page so the view stays in step
/// with the server. Failures are returned to the caller and also kept as a
/// user-facing message in [`ContactBook::last_error`].
pub struct ContactBook {
    client: ApiClient,
    page: u32,
    page_size: u32,
    current: Page<Contact>,
    query: Option<String>,
    last_error: Option<String>,
}

impl ContactBook {
    pub fn new(client: ApiClient) -> Self {
        Self::with_page_size(client, DEFAULT_PAGE_SIZE)
    }

    pub fn with_page_size(client: ApiClient, page_size: u32) -> Self {
        Self {
            client,
            page: 1,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            current: Page::default(),
            query: None,
            last_error: None,
        }
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    pub const fn page_size(&self) -> u32 {
        self.page_size
    }

    /// Page currently displayed, including its links to neighbours
    pub const fn current(&self) -> &Page<Contact> {
        &self.current
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.current.results
    }

    /// Total number of matching contacts on the server
    pub const fn count(&self) -> u64 {
        self.current.count
    }

    pub fn total_pages(&self) -> u64 {
        self.current.total_pages(self.page_size)
    }

    pub const fn has_next(&self) -> bool {
        self.current.next.is_some()
    }

    pub const fn has_previous(&self) -> bool {
        self.current.previous.is_some()
    }

    /// Query of the search currently displayed, if any
    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    /// Message describing the last failure, cleared when an operation starts
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Load the current page
    pub async fn fetch(&mut self) -> Result<&Page<Contact>, ClientError> {
        self.last_error = None;
        let result = self.client.list_contacts(self.page, self.page_size).await;
        let page = self.record(result, "Failed to fetch contacts")?;
        self.query = None;
        self.current = page;
        Ok(&self.current)
    }

    /// Show contacts whose name or number matches `query`
    pub async fn search(&mut self, query: &str) -> Result<&Page<Contact>, ClientError> {
        self.last_error = None;
        let query = self.record(
            validate_search_query(query).map_err(ClientError::from),
            "Error searching contacts",
        )?;
        let result = self.client.search_contacts(query).await;
        let page = self.record(result, "Error searching contacts")?;
        self.query = Some(query.to_string());
        self.current = page;
        Ok(&self.current)
    }

    /// Create a contact and reload the page
    pub async fn add(&mut self, form: &ContactForm) -> Result<Contact, ClientError> {
        self.last_error = None;
        self.record(form.validate().map_err(ClientError::from), "Failed to add contact")?;
        let result = self.client.create_contact(form).await;
        let contact = self.record(result, "Failed to add contact")?;
        info!(id = contact.id, "Contact created");
        self.reload().await;
        Ok(contact)
    }

    /// Save changes to a contact and reload the page
    pub async fn update(&mut self, id: u64, form: &ContactForm) -> Result<Contact, ClientError> {
        self.last_error = None;
        self.record(form.validate().map_err(ClientError::from), "Error updating contact")?;
        let result = self.client.update_contact(id, form).await;
        let contact = self.record(result, "Error updating contact")?;
        info!(id, "Contact updated");
        self.reload().await;
        Ok(contact)
    }

    /// Delete a contact and reload the page
    pub async fn delete(&mut self, id: u64) -> Result<(), ClientError> {
        self.last_error = None;
        let result = self.client.delete_contact(id).await;
        self.record(result, "Error deleting contact")?;
        info!(id, "Contact deleted");
        self.reload().await;
        Ok(())
    }

    /// Jump to another page
    pub async fn set_page(&mut self, page: u32) -> Result<&Page<Contact>, ClientError> {
        check_paging(Some(page), None)?;
        self.page = page;
        self.fetch().await
    }

    /// Change how many contacts a page holds, going back to the first page
    pub async fn set_page_size(&mut self, page_size: u32) -> Result<&Page<Contact>, ClientError> {
        check_paging(None, Some(page_size))?;
        self.page_size = page_size;
        self.page = 1;
        self.fetch().await
    }

    /// Show `page` at `page_size` contacts per page with a single request
    pub async fn show(&mut self, page: u32, page_size: u32) -> Result<&Page<Contact>, ClientError> {
        check_paging(Some(page), Some(page_size))?;
        self.page = page;
        self.page_size = page_size;
        self.fetch().await
    }

    // A failed reload after a successful mutation is recorded, not returned
    async fn reload(&mut self) {
        if let Err(e) = self.fetch().await {
            warn!(error = %e, "Failed to reload contacts");
        }
    }

    fn record<T>(
        &mut self,
        result: Result<T, ClientError>,
        fallback: &str,
    ) -> Result<T, ClientError> {
        result.map_err(|e| {
            self.last_error = Some(e.user_message(fallback));
            e
        })
    }
}

fn check_paging(page: Option<u32>, page_size: Option<u32>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if page == Some(0) {
        errors.add("page", "Page numbers start at 1");
    }
    if let Some(size) = page_size
        && (size == 0 || size > MAX_PAGE_SIZE)
    {
        errors.add(
            "page_size",
            format!("Page size must be between 1 and {MAX_PAGE_SIZE}"),
        );
    }
    errors.into_result()
}
