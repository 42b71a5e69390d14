//! HTML to layout element conversion.
//!
//! A parsed document is walked once; every element is styled by a
//! [`css::CssResolver`], handed to a tag-specific [`attach::TagWorker`] and
//! composed into [`layout::LayoutElement`] trees following the document shape.

pub mod attach;
pub mod css;
pub mod dom;
pub mod layout;
pub mod resource;
pub mod select;

pub use attach::{Conversion, Diagnostic, HtmlProcessor, ProcessError};
pub use dom::{Document, DomNode, ElementRef};
pub use layout::{LayoutElement, LayoutKind};
