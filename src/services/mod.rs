//! External collaborators of the monitoring engine.
//!
//! - Session fetching with login and retries (`HttpFetcher`)
//! - Payload to text conversion (`DocumentExtractor`)
//! - Alert delivery (`DiscordNotifier`, `LogNotifier`)

mod extractor;
mod fetcher;
mod login;
mod notifier;

pub use extractor::{DocumentExtractor, TextExtractor};
pub use fetcher::{AuthenticatedFetcher, FetchedPage, HttpFetcher};
pub use login::{LoginForm, build_login_form};
pub use notifier::{DiscordNotifier, LogNotifier, Notifier};
