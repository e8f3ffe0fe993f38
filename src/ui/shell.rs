//! Full page for one chat view.

use super::chat::{SCROLL_ANCHOR_ID, render_message_list};
use super::markdown::escape_html;
use crate::chat::Conversation;
use crate::config::UiConfig;

const PAGE_STYLES: &str = r#"
    :root { --bg: #f4f6fb; --panel: #ffffff; --text: #1f2937; --muted: #6b7280; --user: #2563eb; --bot: #eef1f6; --border: #d9dee8; }
    [data-theme="dark"] { --bg: #0f172a; --panel: #111827; --text: #e5e7eb; --muted: #9ca3af; --user: #3b82f6; --bot: #1f2937; --border: #374151; }
    html, body { margin: 0; height: 100%; background: var(--bg); color: var(--text); font-family: system-ui, sans-serif; }
    .app { display: flex; justify-content: center; align-items: center; height: 100vh; width: 100vw; }
    .chat-window { display: flex; flex-direction: column; width: min(760px, 100vw); height: min(860px, 100vh); background: var(--panel); border: 1px solid var(--border); border-radius: 16px; overflow: hidden; }
    .chat-header { display: flex; justify-content: space-between; align-items: center; padding: 12px 20px; border-bottom: 1px solid var(--border); }
    .header-title { display: flex; align-items: center; gap: 8px; }
    .header-title h2 { margin: 0; font-size: 1.1rem; }
    .status-dot { width: 8px; height: 8px; border-radius: 50%; background: #22c55e; }
    .status-dot.streaming { background: #f59e0b; }
    .theme-toggle { background: none; border: none; font-size: 1.2rem; cursor: pointer; }
    .chat-body { flex: 1; overflow-y: auto; padding: 16px 20px; }
    .message-list { display: flex; flex-direction: column; gap: 12px; }
    .message { max-width: 80%; padding: 10px 14px; border-radius: 14px; line-height: 1.5; overflow-wrap: anywhere; }
    .message.user { align-self: flex-end; background: var(--user); color: #fff; }
    .message.bot { align-self: flex-start; background: var(--bot); }
    .markdown-content p { margin: 0 0 0.6em; }
    .markdown-content p:last-child { margin-bottom: 0; }
    .markdown-content pre { background: #0b1020; color: #e5e7eb; padding: 0.8em; border-radius: 8px; overflow-x: auto; }
    .markdown-content code { font-family: ui-monospace, SFMono-Regular, Menlo, monospace; font-size: 0.9em; }
    .chat-footer { border-top: 1px solid var(--border); padding: 12px 20px; }
    .message-input-container { display: flex; gap: 8px; }
    .message-input { flex: 1; min-height: 44px; max-height: 200px; resize: none; padding: 10px 12px; border-radius: 12px; border: 1px solid var(--border); background: var(--bg); color: var(--text); font: inherit; }
    .send-button, .stop-button { border: none; border-radius: 12px; padding: 0 18px; cursor: pointer; font: inherit; }
    .send-button { background: var(--user); color: #fff; }
    .stop-button { background: var(--bot); color: var(--text); }
"#;

// Talks to the view routes: SSE for rendered updates, form posts for drafts.
const PAGE_SCRIPT: &str = r#"
    (() => {
        const viewId = document.body.dataset.view;
        const list = document.getElementById('messages');
        const dot = document.querySelector('.status-dot');
        const form = document.getElementById('chat-form');
        const draft = form.querySelector('textarea');
        const base = `/views/${viewId}`;

        const scrollToBottom = () => {
            document.getElementById(list.dataset.anchor)?.scrollIntoView({ behavior: 'smooth' });
        };

        const events = new EventSource(`${base}/events`);
        events.addEventListener('messages', (e) => {
            list.innerHTML = e.data;
            scrollToBottom();
        });
        events.addEventListener('status', (e) => {
            dot.classList.toggle('streaming', e.data === 'streaming');
        });

        draft.addEventListener('keydown', (e) => {
            if (e.key === 'Enter' && !e.shiftKey) {
                e.preventDefault();
                form.requestSubmit();
            }
        });

        form.addEventListener('submit', async (e) => {
            e.preventDefault();
            const res = await fetch(`${base}/send`, {
                method: 'POST',
                body: new URLSearchParams({ draft: draft.value }),
            });
            if (res.status === 202) {
                draft.value = '';
            }
        });

        document.getElementById('stop').addEventListener('click', () => {
            fetch(`${base}/cancel`, { method: 'POST' });
        });

        document.getElementById('theme-toggle').addEventListener('click', (e) => {
            const root = document.documentElement;
            const next = root.dataset.theme === 'dark' ? 'light' : 'dark';
            root.dataset.theme = next;
            e.currentTarget.textContent = next === 'light' ? '🌙' : '☀️';
        });

        scrollToBottom();
    })();
"#;

/// Render the complete HTML document for a chat view.
///
/// The conversation is rendered inline so the page is complete before the
/// event stream connects.
pub fn render_page(view_id: &str, conversation: &Conversation, ui: &UiConfig) -> String {
    let title = escape_html(&ui.title);
    let placeholder = escape_html(&ui.placeholder);
    let view_id = escape_html(view_id);
    let messages = render_message_list(conversation);

    format!(
        r#"<!DOCTYPE html>
<html lang="en" data-theme="light">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title}</title>
    <style>{PAGE_STYLES}</style>
</head>
<body data-view="{view_id}">
    <div class="app">
        <div class="chat-window">
            <div class="chat-header">
                <div class="header-title">
                    <h2>{title}</h2>
                    <span class="status-dot"></span>
                </div>
                <button id="theme-toggle" class="theme-toggle" aria-label="Toggle Theme">🌙</button>
            </div>

            <div class="chat-body">
                <div id="messages" data-anchor="{SCROLL_ANCHOR_ID}" aria-live="polite">{messages}</div>
            </div>

            <div class="chat-footer">
                <form id="chat-form" class="message-input-container">
                    <textarea name="draft" class="message-input" rows="1" placeholder="{placeholder}"></textarea>
                    <button type="submit" class="send-button">Send</button>
                    <button type="button" id="stop" class="stop-button">Stop</button>
                </form>
            </div>
        </div>
    </div>
    <script>{PAGE_SCRIPT}</script>
</body>
</html>"#
    )
}
