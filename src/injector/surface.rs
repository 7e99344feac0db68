//! Document surface abstraction
//!
//! The injector never touches a DOM directly; it reads and writes the
//! document through this trait. The production surface lives in the browser
//! shim, tests use [`MockDocument`].

/// What the injector needs from the document it runs in.
pub trait DocumentSurface {
    /// Current document location (full URL).
    fn location(&self) -> String;

    /// Tab-specific persona override marker. Non-durable: cleared with the
    /// browsing session, survives same-document navigation.
    fn session_marker(&self) -> Option<String>;

    /// Set the override marker for this document.
    fn set_session_marker(&mut self, persona_id: &str);

    /// Whether the document holds no prior chat content, judged from its
    /// address and structure.
    fn is_fresh_conversation(&self) -> bool;

    /// Current text of the chat input element, or `None` when no matching
    /// input exists in the document.
    fn input_text(&self) -> Option<String>;

    /// Write text into the chat input. Returns false when the input is
    /// missing (the operation no-ops).
    fn write_input(&mut self, text: &str) -> bool;
}

// ─────────────────────────────────────────────────────────────────
// Mock document
// ─────────────────────────────────────────────────────────────────

/// In-memory document for tests.
#[derive(Debug, Clone)]
pub struct MockDocument {
    pub location: String,
    pub marker: Option<String>,
    pub fresh: bool,
    /// `None` models a document with no input element.
    pub input: Option<String>,
}

impl MockDocument {
    /// A fresh, empty conversation page.
    pub fn fresh_conversation(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            marker: None,
            fresh: true,
            input: Some(String::new()),
        }
    }

    /// An existing conversation with chat history.
    pub fn existing_conversation(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            marker: None,
            fresh: false,
            input: Some(String::new()),
        }
    }

    pub fn with_marker(mut self, persona_id: impl Into<String>) -> Self {
        self.marker = Some(persona_id.into());
        self
    }

    pub fn with_input_text(mut self, text: impl Into<String>) -> Self {
        self.input = Some(text.into());
        self
    }

    pub fn without_input(mut self) -> Self {
        self.input = None;
        self
    }
}

impl DocumentSurface for MockDocument {
    fn location(&self) -> String {
        self.location.clone()
    }

    fn session_marker(&self) -> Option<String> {
        self.marker.clone()
    }

    fn set_session_marker(&mut self, persona_id: &str) {
        self.marker = Some(persona_id.to_string());
    }

    fn is_fresh_conversation(&self) -> bool {
        self.fresh
    }

    fn input_text(&self) -> Option<String> {
        self.input.clone()
    }

    fn write_input(&mut self, text: &str) -> bool {
        match self.input.as_mut() {
            Some(input) => {
                *input = text.to_string();
                true
            }
            None => false,
        }
    }
}
