//! # services
//!
//! Application logic for the news board. Services orchestrate the domain
//! ports and never talk to a database, HTTP client or hasher directly.

pub mod access;
pub mod accounts;
pub mod bootstrap;
pub mod news;

pub use access::Guard;
pub use accounts::{AccountService, LoginSuccess, RegisterRequest, Registration};
pub use bootstrap::{EnsuredGroup, GroupBootstrap};
pub use news::{CommentSubmission, NewsService, PostDetail};
