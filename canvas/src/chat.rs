//! Chat transcript model shared by the session and the chat bridge.
//!
//! DESIGN
//! ======
//! Entries are addressed by a stable id rather than by index so that a
//! streaming response can keep writing to "its" assistant message while
//! the user adds or deletes other messages. Writes to an id that no longer
//! exists are reported as `false` and otherwise ignored.

#[cfg(test)]
#[path = "chat_test.rs"]
mod chat_test;

use uuid::Uuid;

/// Stable identifier of a chat entry.
pub type MessageId = Uuid;

/// Shown in place of an assistant reply that consisted only of an image reference.
pub const IMAGE_ONLY_REPLY: &str = "Image generated and inserted into canvas.";

/// First assistant message of a session without restored history.
pub const WELCOME_MESSAGE: &str = "System ready. Select elements and generate. Ctrl + mouse wheel to zoom.";

/// Author of a chat entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    /// Display label, also used in the persisted snapshot.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Assistant => "Assistant",
            Self::System => "System",
        }
    }

    /// Role name on the chat-completions wire.
    #[must_use]
    pub fn wire_name(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
        }
    }

    /// Parse a persisted label. Unknown labels are treated as assistant text.
    #[must_use]
    pub fn from_label_lossy(label: &str) -> Self {
        if label.eq_ignore_ascii_case("user") {
            Self::User
        } else if label.eq_ignore_ascii_case("system") {
            Self::System
        } else {
            Self::Assistant
        }
    }
}

/// One message in the transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatEntry {
    pub id: MessageId,
    pub role: ChatRole,
    pub content: String,
    /// Local path or URL of an attached / generated image.
    pub image_url: Option<String>,
}

/// Ordered chat transcript.
#[derive(Debug, Clone, Default)]
pub struct ChatLog {
    entries: Vec<ChatEntry>,
}

impl ChatLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, role: ChatRole, content: impl Into<String>, image_url: Option<String>) -> MessageId {
        let id = Uuid::new_v4();
        self.entries.push(ChatEntry { id, role, content: content.into(), image_url });
        id
    }

    /// Append a streamed fragment. Returns `false` if the entry is gone.
    pub fn append(&mut self, id: &MessageId, fragment: &str) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.content.push_str(fragment);
                true
            }
            None => false,
        }
    }

    /// Replace an entry's text. Returns `false` if the entry is gone.
    pub fn set_content(&mut self, id: &MessageId, content: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn set_image_url(&mut self, id: &MessageId, url: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.image_url = Some(url.into());
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: &MessageId) -> Option<ChatEntry> {
        let idx = self.entries.iter().position(|e| e.id == *id)?;
        Some(self.entries.remove(idx))
    }

    #[must_use]
    pub fn get(&self, id: &MessageId) -> Option<&ChatEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    fn get_mut(&mut self, id: &MessageId) -> Option<&mut ChatEntry> {
        self.entries.iter_mut().find(|e| e.id == *id)
    }

    #[must_use]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A markdown image reference found in an assistant reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// URL of the first reference.
    pub url: String,
    /// Reply text with every reference removed and surrounding whitespace trimmed.
    pub cleaned: String,
}

/// Find `![alt](http(s)://...)` references in `text`.
///
/// Returns the first reference's URL and the text with all references
/// stripped, or `None` when the text has no reference. References never span
/// lines.
#[must_use]
pub fn extract_image_reference(text: &str) -> Option<ImageReference> {
    let first = find_reference(text, 0)?;
    let url = text[first.url_start..first.url_end].to_owned();

    let mut cleaned = String::with_capacity(text.len());
    let mut cursor = 0;
    let mut next = Some(first);
    while let Some(m) = next {
        cleaned.push_str(&text[cursor..m.start]);
        cursor = m.end;
        next = find_reference(text, cursor);
    }
    cleaned.push_str(&text[cursor..]);

    Some(ImageReference { url, cleaned: cleaned.trim().to_owned() })
}

struct ReferenceMatch {
    start: usize,
    end: usize,
    url_start: usize,
    url_end: usize,
}

fn find_reference(text: &str, from: usize) -> Option<ReferenceMatch> {
    let mut search = from;
    while let Some(rel) = text[search..].find("![") {
        let start = search + rel;
        if let Some(m) = match_at(text, start) {
            return Some(m);
        }
        search = start + 2;
    }
    None
}

/// Try every `](` on the line after `start` until one is followed by an
/// http(s) URL closed by `)`.
fn match_at(text: &str, start: usize) -> Option<ReferenceMatch> {
    let line_end = text[start..].find('\n').map_or(text.len(), |i| start + i);
    let line = &text[..line_end];
    let mut from = start + 2;
    while let Some(rel) = line[from..].find("](") {
        let url_start = from + rel + 2;
        let rest = &line[url_start..];
        let scheme_len = if rest.starts_with("https://") {
            Some(8)
        } else if rest.starts_with("http://") {
            Some(7)
        } else {
            None
        };
        if let Some(scheme_len) = scheme_len {
            if let Some(close) = rest[scheme_len..].find(')') {
                let url_end = url_start + scheme_len + close;
                return Some(ReferenceMatch { start, end: url_end + 1, url_start, url_end });
            }
        }
        from = from + rel + 1;
    }
    None
}
