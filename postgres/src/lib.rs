//! `PostgreSQL` store for MentorLink.
//!
//! [`PgMarketplaceStore`] implements every store port from
//! `mentorlink-core` on one connection pool. It uses runtime-checked sqlx
//! queries and keeps the marketplace's atomicity rules inside single
//! transactions:
//!
//! - Booking inserts take transaction-scoped advisory locks per mentor and
//!   day, then re-run the conflict check before inserting
//! - Order transitions compare-and-set the status and update the paid-for
//!   entity in the same transaction
//! - Meeting URLs are written with a guarded `UPDATE ... WHERE meet_url IS NULL`
//! - Workshop link merges lock the workshop row (`SELECT ... FOR UPDATE`)
//! - Job debounce markers are one conditional upsert
//!
//! # Example
//!
//! ```ignore
//! use mentorlink_postgres::PgMarketplaceStore;
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = PgMarketplaceStore::connect("postgres://localhost/mentorlink", 10).await?;
//!     store.migrate().await?;
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod rows;
mod store;

pub use store::PgMarketplaceStore;
