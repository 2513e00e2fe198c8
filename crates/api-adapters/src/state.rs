//! Shared state handed to every handler: the two services and the listing
//! limits.

use std::sync::Arc;

use services::{AccountService, NewsService};

/// Fixed-size slices for the two post listings.
#[derive(Debug, Clone, Copy)]
pub struct Limits {
    pub home: u32,
    pub list: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self { home: 3, list: 10 }
    }
}

/// State shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub news: Arc<NewsService>,
    pub accounts: Arc<AccountService>,
    pub limits: Limits,
}
