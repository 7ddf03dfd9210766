//! A small Rust client for the Lightcast Core LMI (labor market information) API.
//!
//! The client authenticates once with OAuth client credentials, then issues
//! metadata and query calls while tracking the API's rolling quota
//! (300 calls per 5 minutes). Query results come back column-oriented and are
//! reshaped into a [`Table`].
//!
//! ## Quick start
//! - Configure credentials via environment variables (`LCAPI_USER`, `LCAPI_PASS`) or a
//!   `.lightcastrc` file (supported in the current directory and in your home directory).
//! - Build a query with [`build_query`] and post it with [`Client::post_retrieve_table`].
//!
//! ```no_run
//! use anyhow::Result;
//! use lightcast::{Client, build_query};
//! use serde_json::json;
//!
//! fn main() -> Result<()> {
//!     let mut client = Client::from_env()?;
//!     let query = build_query(
//!         &["Jobs.2022", "ResidenceJobs.2022"],
//!         vec![json!({
//!             "dimensionName": "Area",
//!             "mapLevel": {"level": 4, "predicate": ["48113"]}
//!         })],
//!     );
//!     let table = client.post_retrieve_table("emsi.us.occupation", &query, "2025.3")?;
//!     print!("{}", table.to_csv_string()?);
//!     Ok(())
//! }
//! ```
//!
//! Rate limiting is advisory: pass `smart_limit = true` to [`Client::dispatch`]
//! to space calls evenly across the window. Once the budget is spent the
//! client waits for the window to roll over on its own.

#![forbid(unsafe_code)]

mod client;
mod config;
mod error;
pub mod limiter;
pub mod meta;
mod query;
pub mod render;
mod table;
mod util;

pub use client::{ApiResponse, Client, ClientConfig};
pub use config::{PASS_VAR, USER_VAR};
pub use limiter::QuotaWindow;
pub use query::{DEFAULT_DATARUN, Lightcast, build_query};
pub use table::{Column, Table};
