//! Draft text and the submit trigger.

/// Holds the current draft and decides when a send is accepted.
#[derive(Debug, Clone, Default)]
pub struct InputController {
    draft: String,
}

impl InputController {
    /// Create a controller with an empty draft.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current draft text.
    #[must_use]
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Replace the draft (the textarea changed).
    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    /// Submit the draft (Enter without Shift, or the Send button).
    ///
    /// Blank drafts are rejected and left untouched. An accepted draft is
    /// returned as typed and the draft is cleared.
    pub fn submit(&mut self) -> Option<String> {
        if self.draft.trim().is_empty() {
            return None;
        }
        Some(std::mem::take(&mut self.draft))
    }
}
