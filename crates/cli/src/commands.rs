//! CLI commands

use anyhow::{Result, anyhow};
use clap::{Args, Subcommand};
use contacts_core::validation::{LoginForm, SignUpForm};
use contacts_core::{ClientConfig, Contact, ContactForm, Telephone};
use contacts_http::client::error::SESSION_EXPIRED_MESSAGE;
use contacts_http::{ApiClient, AuthService, ClientError, ContactBook};
use tracing::info;

#[derive(Subcommand)]
pub enum Commands {
    /// Log in and save the session
    Login {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "CONTACTS_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Create an account and log into it
    Register {
        #[arg(short, long)]
        email: String,

        #[arg(short, long, env = "CONTACTS_PASSWORD", hide_env_values = true)]
        password: String,

        /// Repeat the password
        #[arg(long)]
        confirm_password: String,
    },

    /// Forget the saved session
    Logout,

    /// Show who is logged in
    Whoami,

    /// List contacts one page at a time
    List {
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Contacts per page (defaults to the configured page size)
        #[arg(short = 's', long)]
        page_size: Option<u32>,
    },

    /// Search contacts by name or telephone number
    Search { query: String },

    /// Add a contact
    Add(ContactArgs),

    /// Replace the details of a contact
    Update {
        id: u64,

        #[command(flatten)]
        contact: ContactArgs,
    },

    /// Delete a contact
    Delete { id: u64 },
}

#[derive(Args, Debug, Clone)]
pub struct ContactArgs {
    #[arg(short, long)]
    name: String,

    /// Telephone number, repeat for several
    #[arg(short = 'p', long = "phone", required = true)]
    phones: Vec<String>,

    #[arg(long)]
    address_line_1: Option<String>,

    #[arg(long)]
    address_line_2: Option<String>,

    #[arg(long)]
    city: Option<String>,

    #[arg(long)]
    postcode: Option<String>,

    #[arg(long)]
    country: Option<String>,
}

impl From<ContactArgs> for ContactForm {
    fn from(args: ContactArgs) -> Self {
        Self {
            name: args.name,
            address_line_1: args.address_line_1,
            address_line_2: args.address_line_2,
            city: args.city,
            postcode: args.postcode,
            country: args.country,
            telephones: args.phones.into_iter().map(Telephone::new).collect(),
        }
    }
}

impl Commands {
    pub async fn execute(self, client: ApiClient, config: &ClientConfig, json: bool) -> Result<()> {
        match self {
            Self::Login { email, password } => {
                let auth = AuthService::new(client);
                let identity = auth
                    .login(&LoginForm::new(email, password))
                    .await
                    .map_err(|e| notify(e, "Login failed"))?;
                println!("Logged in as {identity}");
                Ok(())
            }
            Self::Register {
                email,
                password,
                confirm_password,
            } => {
                let auth = AuthService::new(client);
                let identity = auth
                    .register(&SignUpForm::new(email, password, confirm_password))
                    .await
                    .map_err(|e| notify(e, "Registration failed"))?;
                println!("Registered and logged in as {identity}");
                Ok(())
            }
            Self::Logout => {
                AuthService::new(client).logout();
                println!("Logged out");
                Ok(())
            }
            Self::Whoami => {
                match client.session().identity() {
                    Some(identity) if client.session().is_authenticated() => {
                        println!("{identity}");
                    }
                    _ => println!("Not logged in"),
                }
                Ok(())
            }
            Self::List { page, page_size } => {
                let mut book = require_login(client, config)?;
                let page_size = page_size.unwrap_or_else(|| book.page_size());
                book.show(page, page_size)
                    .await
                    .map_err(|e| notify(e, "Failed to fetch contacts"))?;
                print_page(&book, json)
            }
            Self::Search { query } => {
                let mut book = require_login(client, config)?;
                book.search(&query)
                    .await
                    .map_err(|e| notify(e, "Error searching contacts"))?;
                print_page(&book, json)
            }
            Self::Add(args) => {
                let mut book = require_login(client, config)?;
                let contact = book
                    .add(&args.into())
                    .await
                    .map_err(|e| notify(e, "Failed to add contact"))?;
                info!(id = contact.id, "Added contact");
                print_contact("Contact created", &contact, json)
            }
            Self::Update { id, contact } => {
                let mut book = require_login(client, config)?;
                let contact = book
                    .update(id, &contact.into())
                    .await
                    .map_err(|e| notify(e, "Error updating contact"))?;
                print_contact("Contact updated", &contact, json)
            }
            Self::Delete { id } => {
                let mut book = require_login(client, config)?;
                book.delete(id)
                    .await
                    .map_err(|e| notify(e, "Error deleting contact"))?;
                println!("Contact {id} deleted");
                Ok(())
            }
        }
    }
}

fn require_login(client: ApiClient, config: &ClientConfig) -> Result<ContactBook> {
    if !client.session().is_authenticated() {
        return Err(anyhow!("Not logged in. Run `contacts login` first."));
    }
    Ok(ContactBook::with_page_size(client, config.page_size))
}

/// Turn a client error into the message shown to the user
fn notify(err: ClientError, fallback: &str) -> anyhow::Error {
    match err {
        ClientError::Validation(errors) => {
            let lines: Vec<String> = errors
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            anyhow!(lines.join("\n"))
        }
        ClientError::SessionExpired(_) => anyhow!(SESSION_EXPIRED_MESSAGE),
        other => anyhow!(other.user_message(fallback)),
    }
}

fn print_page(book: &ContactBook, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(book.current())?);
        return Ok(());
    }

    if book.contacts().is_empty() {
        println!("No contacts found");
        return Ok(());
    }

    println!("{:>6}  {:<24}  {:<32}  ADDRESS", "ID", "NAME", "PHONES");
    for contact in book.contacts() {
        println!(
            "{:>6}  {:<24}  {:<32}  {}",
            contact.id,
            contact.name,
            phones(contact),
            contact.address()
        );
    }

    match book.query() {
        Some(query) => println!("\n{} result(s) for \"{query}\"", book.count()),
        None => println!(
            "\nPage {} of {} ({} contacts)",
            book.page(),
            book.total_pages().max(1),
            book.count()
        ),
    }
    Ok(())
}

fn print_contact(heading: &str, contact: &Contact, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(contact)?);
    } else {
        println!("{heading}: #{} {} ({})", contact.id, contact.name, phones(contact));
    }
    Ok(())
}

fn phones(contact: &Contact) -> String {
    contact
        .telephones
        .iter()
        .map(|t| t.number.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use contacts_core::ValidationErrors;

    #[test]
    fn validation_errors_print_one_line_per_field() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "This field is required");
        errors.add("telephones.0.number", "This character is not allowed");

        let message = notify(ClientError::Validation(errors), "Failed to add contact").to_string();
        assert_eq!(
            message,
            "name: This field is required\ntelephones.0.number: This character is not allowed"
        );
    }

    #[test]
    fn expired_session_has_fixed_message() {
        let message = notify(
            ClientError::SessionExpired("refresh token rejected".into()),
            "Failed to fetch contacts",
        );
        assert_eq!(message.to_string(), SESSION_EXPIRED_MESSAGE);
    }

    #[test]
    fn contact_args_become_form() {
        let args = ContactArgs {
            name: "Ada".into(),
            phones: vec!["0123456789".into(), "+44 20".into()],
            address_line_1: None,
            address_line_2: None,
            city: Some("London".into()),
            postcode: None,
            country: None,
        };
        let form = ContactForm::from(args);
        assert_eq!(form.telephones.len(), 2);
        assert_eq!(form.city.as_deref(), Some("London"));
    }
}
