//! XML plumbing for the ISO 20022 messages: a namespace-aware document
//! model with a small XPath subset, and a cursor-style builder.

pub mod builder;
pub mod document;
pub mod xpath;

pub use builder::{escape, XmlBuilder};
pub use document::{Element, NamespaceSource, XmlDocument};
