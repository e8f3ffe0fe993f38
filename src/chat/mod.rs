//! Client-side chat state.
//!
//! # Architecture
//!
//! - [`Message`] / [`Conversation`]: append-only list of immutable records
//! - [`InputController`]: draft text and the submit rule
//! - [`Utf8StreamDecoder`]: chunk-boundary-safe text decoding
//! - [`ChatView`]: one open page; owns conversation, session token and the
//!   active stream
//! - [`ViewStore`]: thread-safe registry of open views
//!
//! # Example
//!
//! ```rust
//! use tutor_chat::chat::{Conversation, Message};
//!
//! let mut conversation = Conversation::with_greeting("Hello!");
//! conversation.push(Message::bot(""));
//! conversation.append_to_last("Hi");
//! assert_eq!(conversation.last().unwrap().text, "Hi");
//! ```

mod decode;
mod input;
mod message;
mod store;
mod view;

pub use decode::Utf8StreamDecoder;
pub use input::InputController;
pub use message::{Conversation, Message, Sender};
pub use store::ViewStore;
pub use view::{
    ChatView, DEFAULT_ATTACH_GRACE, DEFAULT_ERROR_MESSAGE, DEFAULT_GREETING, StreamTicket,
    ViewOptions,
};
