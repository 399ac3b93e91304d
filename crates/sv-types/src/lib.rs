//! sv-types: Shared data structures for the subscription vault client
//!
//! This crate defines the types shared across the workspace:
//! - [`Category`] - Content categories and the pagination class each one uses
//! - [`Credentials`] - The session identity sent with every request
//! - [`SigningRules`] - The externally rotated recipe for the `sign` header
//! - [`QueryParams`] - Ordered query parameters (order is part of the signature)
//! - [`Item`] / [`ResultSet`] - Fetched records and the outcome of a fetch
//! - [`UserProfile`] / [`Subscription`] - Typed views over common records
//!
//! # Example
//!
//! ```rust
//! use sv_types::{Category, Pagination, SigningRules};
//!
//! assert_eq!(Category::Messages.pagination(), Pagination::CursorById);
//!
//! let rules = SigningRules::from_json(r#"{
//!     "static_param": "secret",
//!     "checksum_indexes": [0, 3, 3],
//!     "checksum_constant": 12,
//!     "format": "1:{}:{:x}:2"
//! }"#).unwrap();
//! assert_eq!(rules.checksum_indexes(), &[0, 3, 3]);
//! ```

mod category;
mod credentials;
mod error;
mod item;
mod profile;
mod query;
mod result;
mod rules;

pub use category::{Category, Pagination};
pub use credentials::Credentials;
pub use error::TypeError;
pub use item::Item;
pub use profile::{Subscription, UserProfile};
pub use query::QueryParams;
pub use result::{ApiError, ResultSet};
pub use rules::{HeaderTemplate, SigningRules, DIGEST_HEX_LEN};
