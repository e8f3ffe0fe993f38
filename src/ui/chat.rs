//! Message list rendering.

use std::fmt::Write as _;

use super::markdown::render_markdown;
use crate::chat::{Conversation, Message};

/// Id of the element the page scrolls into view after every update.
pub const SCROLL_ANCHOR_ID: &str = "messages-end";

/// Render one message bubble.
pub fn render_message(message: &Message) -> String {
    format!(
        r#"<div class="message {sender}"><div class="markdown-content">{body}</div></div>"#,
        sender = message.sender.as_str(),
        body = render_markdown(&message.text),
    )
}

/// Render the whole conversation, oldest first, followed by the scroll anchor.
///
/// Pure: the same conversation always renders to the same string.
pub fn render_message_list(conversation: &Conversation) -> String {
    let mut out = String::from(r#"<div class="message-list">"#);
    for message in conversation.iter() {
        out.push_str(&render_message(message));
    }
    let _ = write!(out, r#"</div><div id="{SCROLL_ANCHOR_ID}"></div>"#);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conversation {
        let mut conversation = Conversation::with_greeting("Hello! **Welcome**");
        conversation.push(Message::user("What is a list comprehension?"));
        conversation.push(Message::bot("A list comprehension is..."));
        conversation
    }

    #[test]
    fn test_rerender_is_identical() {
        let conversation = sample();
        assert_eq!(
            render_message_list(&conversation),
            render_message_list(&conversation.clone())
        );
    }

    #[test]
    fn test_messages_render_in_order_with_sender_class() {
        let html = render_message_list(&sample());
        let greeting = html.find("<strong>Welcome</strong>").unwrap();
        let question = html.find("What is a list comprehension?").unwrap();
        let answer = html.find("A list comprehension is...").unwrap();
        assert!(greeting < question && question < answer);
        assert_eq!(html.matches(r#"class="message bot""#).count(), 2);
        assert_eq!(html.matches(r#"class="message user""#).count(), 1);
        assert!(html.ends_with(r#"<div id="messages-end"></div>"#));
    }

    #[test]
    fn test_empty_placeholder_renders_empty_bubble() {
        let html = render_message(&Message::bot(""));
        assert_eq!(
            html,
            r#"<div class="message bot"><div class="markdown-content"></div></div>"#
        );
    }
}
