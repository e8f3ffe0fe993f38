//! HTML rendering.
//!
//! Rendering is a pure function of the conversation: the server re-renders
//! the message list on every change and pushes it to the page.
//!
//! # Structure
//!
//! - [`markdown`]: message text to HTML
//! - [`chat`]: message bubbles and the message list
//! - [`shell`]: the full page

pub mod chat;
pub mod markdown;
pub mod shell;

pub use chat::{SCROLL_ANCHOR_ID, render_message, render_message_list};
pub use markdown::render_markdown;
pub use shell::render_page;
