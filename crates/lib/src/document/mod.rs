//! ProseMirror JSON document model.
//!
//! [`Document`] is the plain-JSON side of the mapping. It is immutable once
//! built and freshly constructed by every serialization.

mod errors;
pub use errors::DocumentError;

mod node;
pub use node::{Document, ElementNode, Node, TextNode};
