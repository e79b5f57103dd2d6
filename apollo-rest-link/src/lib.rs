//! ## Usage
//!
//! Resolves GraphQL operations whose fields carry `@rest` directives by calling
//! REST endpoints, then reshapes the JSON responses into the requested selection.
//!
//! ```ignore
//! let link = RestLink::builder()
//!     .configuration(Configuration::from_yaml("uri: https://api.example.com")?)
//!     .build()?;
//! let operation = link.parse_operation(
//!     r#"query { post(id: "1") @rest(type: "Post", path: "/post/:id") { id title } }"#,
//!     None,
//! )?;
//! let response = link.execute(Request::builder().operation(operation).build()).await?;
//! ```

#![warn(
    rustdoc::broken_intra_doc_links,
    unreachable_patterns,
    unused,
    while_true,
    unconditional_panic,
    clippy::all
)]

pub mod configuration;
pub mod context;
pub mod error;
pub mod fetch;
pub mod field_names;
pub mod headers;
mod link;
pub mod operation;
mod orchestrator;
pub mod path_template;
pub mod registry;
pub mod spec;
pub mod type_patcher;

pub use crate::configuration::Configuration;
pub use crate::context::RequestContext;
pub use crate::error::RestLinkError;
pub use crate::fetch::Fetch;
pub use crate::link::Request;
pub use crate::link::Response;
pub use crate::link::RestLink;
pub use crate::operation::Field;
pub use crate::operation::Operation;
pub use crate::spec::RestCallSpec;
