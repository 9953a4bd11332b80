//! # Fieldsales Client
//!
//! HTTP access to the sales-profile collection of the content backend.
//!
//! [`HttpProfileStore`] implements
//! [`ProfileStore`](fieldsales_core::ProfileStore) over `reqwest`. Lookups
//! use `GET {api}/sales-profiles?filters[email][$eq]=...`; writes use
//! `PUT {api}/sales-profiles/{id}` with a `{"data": {...}}` body. A 403
//! maps to [`StoreError::Forbidden`](fieldsales_core::StoreError::Forbidden).

mod config;
mod error;
mod store;

pub use config::{ApiConfig, DEFAULT_REQUEST_TIMEOUT};
pub use error::{ClientError, ClientResult};
pub use store::HttpProfileStore;
