//! # Glasspane UI Model
//!
//! The host-owned UI vocabulary for provider-supplied content: a closed
//! whitelist of element kinds, a property sanitizer, and the virtual /
//! native tree node types the runtime projects onto.
//!
//! Provider content never extends this vocabulary at runtime. New element
//! kinds or mapped attributes require a code change here.
//!
//! ## Example
//! ```
//! use glasspane_ui::{ElementKind, sanitize_props};
//!
//! assert!(ElementKind::from_tag("div").is_some());
//! assert!(ElementKind::from_tag("script").is_none());
//! ```

pub mod element;
pub mod error;
pub mod kind;
pub mod sanitize;

pub use element::{NativeHandler, NativeNode, Props, VirtualElement};
pub use error::{UiError, UiResult};
pub use kind::ElementKind;
pub use sanitize::{sanitize_props, sanitize_value, MAX_NESTING_DEPTH, MAX_VALUE_DEPTH};
