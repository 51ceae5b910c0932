//! Rate-limit-aware client for collecting social graphs, timelines and posts from a
//! microblogging platform's REST and streaming APIs.
//!
//! ## Usage
//!
//! First, create a [`Client`]. You have to provide the API's base URL, a descriptive
//! User-Agent for your project (the API rejects requests without one), and the
//! [`AuthMode`] your credentials are bound to — the auth mode decides which quota applies
//! to every class of request.
//!
//! ```no_run
//! # use aviary::client::{AuthMode, Client};
//! # fn main() -> Result<(), aviary::error::Error> {
//! let client = Client::new(
//!     "https://api.example.com",
//!     "MyProject/1.0 (by my@email)",
//!     AuthMode::User,
//! )?;
//! # Ok(()) }
//! ```
//!
//! Now it's ready to go. Listings are returned as lazy [`futures::Stream`]s: nothing is
//! fetched until you poll, and pages are requested one at a time, so collecting a large
//! follower graph never resolves more than it has to.
//!
//! ```no_run
//! # use aviary::client::{AuthMode, Client};
//! use futures::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), aviary::error::Error> {
//! # let client = Client::new(
//! #     "https://api.example.com",
//! #     "MyProject/1.0 (by my@email)",
//! #     AuthMode::User,
//! # )?;
//! let follower_ids: Vec<_> = client.follower_ids("somebody").try_collect().await?;
//! let followers: Vec<_> = client.lookup_users(follower_ids, false).try_collect().await?;
//! # Ok(()) }
//! ```
//!
//! ## Rate limiting
//!
//! Every request class (associate listings, timelines, bulk lookups) carries its own
//! allowed-requests-per-15-minute-window quota, different between user and application
//! contexts. `aviary` enforces these limits by spacing requests out: before each page or
//! batch it computes how much of the required spacing the time you spent processing has
//! already covered, and sleeps only for the remainder. Each class is paced independently,
//! so interleaving a timeline walk with a follower walk doesn't let either cheat.
//!
//! The push-based filtered stream ([`stream`] module) is delivery-driven by the remote
//! service and therefore not paced at all.
//!
//! [`Client`]: client/struct.Client.html
//! [`AuthMode`]: client/enum.AuthMode.html

mod lookup;
mod paging;
mod utils;

/// Client related structures.
pub mod client;

/// Error management.
pub mod error;

/// Request pacing against per-class quotas.
pub mod pacing;

/// Post and timeline management.
pub mod post;

/// Quota policy tables.
pub mod quota;

/// Push-feed stream sessions.
pub mod stream;

/// Account management.
pub mod user;
