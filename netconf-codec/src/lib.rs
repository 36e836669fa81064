//! # netconf-codec
//!
//! ```toml
//! netconf-codec = "^0.1.0"
//! ```
//!
//! NETCONF message layer: builds and parses `<hello>`, `<rpc>` and
//! `<rpc-reply>` documents, and mediates datastore locks between sessions
//! and the backends that own the datastores.
//!
//! ## Example
//!
//! Here is a basic example:
//!
//! ```rust
//! use netconf_codec::message::{Message, Rpc};
//! use netconf_codec::operation::{Datastore, Operation};
//!
//! let lock = Operation::Lock {
//!     target: Datastore::Candidate,
//! };
//! let rpc = Rpc::new("101", lock).unwrap();
//! let text = Message::Rpc(rpc.clone()).serialize().unwrap();
//! assert_eq!(Message::parse(&text).unwrap(), Message::Rpc(rpc));
//! ```
//!
pub mod capability;
pub mod datastore;
pub mod document;
pub mod error;
pub mod filter;
pub mod message;
pub mod operation;
pub mod parser;
pub mod rpc_error;
pub mod session;

pub use capability::CapabilitySet;
pub use document::{Element, Fragment};
pub use error::{CodecError, CodecResult};
pub use message::{Message, Outcome, Rpc, RpcReply};
pub use operation::{Datastore, Operation};
pub use rpc_error::NcError;
pub use session::{Session, SessionId};

pub const NETCONF_URN: &str = "urn:ietf:params:xml:ns:netconf:base:1.0";
pub const NETCONF_BASE_10_CAP: &str = "urn:ietf:params:netconf:base:1.0";
pub const NETCONF_BASE_11_CAP: &str = "urn:ietf:params:netconf:base:1.1";
pub const NETCONF_CANDIDATE_CAP: &str = "urn:ietf:params:netconf:capability:candidate:1.0";
pub const NETCONF_STARTUP_CAP: &str = "urn:ietf:params:netconf:capability:startup:1.0";
pub const NETCONF_WRITABLE_RUNNING_CAP: &str =
    "urn:ietf:params:netconf:capability:writable-running:1.0";
pub const NETCONF_ROLLBACK_ON_ERROR_CAP: &str =
    "urn:ietf:params:netconf:capability:rollback-on-error:1.0";
