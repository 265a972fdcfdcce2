//! # Conversation Manager
//!
//! An append-only message log plus a metadata map and a context map, with
//! `<think>…</think>` extraction applied to assistant messages on the way
//! in.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Who produced a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// the system prompt
    System,
    /// the end user
    User,
    /// a model reply
    Assistant,
    /// a tool's result, fed back to the model
    Tool,
}

/// A single entry in a [`Conversation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// who produced this message
    pub role: Role,
    /// the message body, with any extracted thought block removed unless
    /// `show_thinking` was set when it was added
    pub content: String,
    /// tool identifier; required for `role: Tool` messages to be surfaced
    /// by [`Conversation::get_messages`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// reasoning text extracted from a `<think>` block, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thoughts: Option<String>,
}

/// An ordered, append-only sequence of [`Message`]s plus scoped metadata and
/// context maps.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
    metadata: HashMap<String, Value>,
    context: HashMap<String, Value>,
    thought_start: String,
    thought_end: String,
}

/// Options controlling how an assistant message is parsed on `add_message`.
#[derive(Debug, Clone, Copy)]
pub struct ThoughtOptions {
    /// whether to search for and extract a thought block at all
    pub extract_thoughts: bool,
    /// whether the extracted block stays in `content` (true) or is stripped (false)
    pub show_thinking: bool,
}

impl Default for ThoughtOptions {
    fn default() -> Self {
        Self {
            extract_thoughts: true,
            show_thinking: false,
        }
    }
}

impl Conversation {
    /// Create an empty conversation using the default `<think>`/`</think>`
    /// tag pair.
    pub fn new() -> Self {
        Self {
            thought_start: "<think>".to_string(),
            thought_end: "</think>".to_string(),
            ..Default::default()
        }
    }

    /// Create a conversation using a custom thought tag pair.
    pub fn with_thought_tags(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self {
            thought_start: start.into(),
            thought_end: end.into(),
            ..Default::default()
        }
    }

    /// Append a message. For `role: Assistant`, thought extraction runs
    /// first per `options`; other roles are stored verbatim.
    pub fn add_message(
        &mut self,
        role: Role,
        content: impl Into<String>,
        name: Option<String>,
        options: ThoughtOptions,
    ) {
        let content = content.into();
        if role == Role::Assistant {
            let (final_content, thoughts) = extract_thoughts(
                &content,
                &self.thought_start,
                &self.thought_end,
                options,
            );
            self.messages.push(Message {
                role,
                content: final_content,
                name,
                thoughts,
            });
        } else {
            self.messages.push(Message {
                role,
                content,
                name,
                thoughts: None,
            });
        }
    }

    /// Convenience for the common user→assistant turn.
    pub fn add_interaction(
        &mut self,
        user_content: impl Into<String>,
        assistant_content: impl Into<String>,
        options: ThoughtOptions,
    ) {
        self.add_message(Role::User, user_content, None, ThoughtOptions::default());
        self.add_message(Role::Assistant, assistant_content, None, options);
    }

    /// All messages, omitting `role: Tool` entries that carry no `name`
    /// (matches the reference manager: an un-attributed tool message is
    /// treated as malformed and hidden from callers, though it still
    /// occupies its append slot for ordering purposes).
    pub fn get_messages(&self) -> Vec<&Message> {
        self.messages
            .iter()
            .filter(|m| m.name.is_some() || m.role != Role::Tool)
            .collect()
    }

    /// The most recently appended message, if any (including ones filtered
    /// out of `get_messages`).
    pub fn get_last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Remove all messages, keeping metadata and context intact. Use
    /// [`Conversation::reset`] to clear everything together.
    pub fn clear_messages(&mut self) {
        self.messages.clear();
    }

    /// Set a metadata value.
    pub fn set_metadata(&mut self, key: impl Into<String>, value: Value) {
        self.metadata.insert(key.into(), value);
    }

    /// Read a metadata value.
    pub fn get_metadata(&self, key: &str) -> Option<&Value> {
        self.metadata.get(key)
    }

    /// All metadata.
    pub fn get_all_metadata(&self) -> &HashMap<String, Value> {
        &self.metadata
    }

    /// Remove all metadata.
    pub fn clear_metadata(&mut self) {
        self.metadata.clear();
    }

    /// Set a context value (distinct namespace from metadata; used for
    /// cross-component bookkeeping like the orchestrator id).
    pub fn set_context(&mut self, key: impl Into<String>, value: Value) {
        self.context.insert(key.into(), value);
    }

    /// Read a context value.
    pub fn get_context(&self, key: &str) -> Option<&Value> {
        self.context.get(key)
    }

    /// Clear messages, metadata, and context together.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.metadata.clear();
        self.context.clear();
    }
}

/// Extract a `<think>…</think>` block from `content` per §4.6's fallback
/// rules. Returns `(final_content, thoughts)`.
///
/// Matches only the first, non-nested block (non-greedy + DOTALL
/// equivalent); nested think tags are undefined behavior, per design notes.
fn extract_thoughts(
    content: &str,
    start_tag: &str,
    end_tag: &str,
    options: ThoughtOptions,
) -> (String, Option<String>) {
    if !options.extract_thoughts {
        return (content.to_string(), None);
    }

    let pattern = format!(
        "(?s){}(.*?){}",
        regex::escape(start_tag),
        regex::escape(end_tag)
    );
    let re = match Regex::new(&pattern) {
        Ok(re) => re,
        Err(_) => return (content.to_string(), None),
    };

    let Some(captures) = re.captures(content) else {
        return (content.to_string(), None);
    };

    let thoughts = captures.get(1).map(|m| m.as_str().trim().to_string());
    let mut clean_content = re.replace(content, "").trim().to_string();

    if clean_content.is_empty() {
        let after_last_tag = content.rsplit(end_tag).next().unwrap_or("").trim();
        clean_content = if after_last_tag.is_empty() {
            content.to_string()
        } else {
            after_last_tag.to_string()
        };
    }

    let final_content = if options.show_thinking {
        content.to_string()
    } else {
        clean_content
    };

    (final_content, thoughts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hide() -> ThoughtOptions {
        ThoughtOptions {
            extract_thoughts: true,
            show_thinking: false,
        }
    }

    #[test]
    fn extracts_and_hides_thought_block() {
        let mut conv = Conversation::new();
        conv.add_message(
            Role::Assistant,
            "<think>step1</think>Answer: 7",
            None,
            hide(),
        );
        let msg = conv.get_last_message().unwrap();
        assert_eq!(msg.content, "Answer: 7");
        assert_eq!(msg.thoughts.as_deref(), Some("step1"));
    }

    #[test]
    fn show_thinking_keeps_original_content_but_still_extracts_thoughts() {
        let mut conv = Conversation::new();
        conv.add_message(
            Role::Assistant,
            "<think>step1</think>Answer: 7",
            None,
            ThoughtOptions {
                extract_thoughts: true,
                show_thinking: true,
            },
        );
        let msg = conv.get_last_message().unwrap();
        assert_eq!(msg.content, "<think>step1</think>Answer: 7");
        assert_eq!(msg.thoughts.as_deref(), Some("step1"));
    }

    #[test]
    fn falls_back_to_content_after_last_closing_tag_when_stripped_is_empty() {
        let mut conv = Conversation::new();
        conv.add_message(Role::Assistant, "<think>only thoughts</think>", None, hide());
        let msg = conv.get_last_message().unwrap();
        // stripping leaves "" -> falls back to split on end_tag, last segment is also "" -> whole response
        assert_eq!(msg.content, "<think>only thoughts</think>");
    }

    #[test]
    fn no_thought_block_passes_content_through() {
        let mut conv = Conversation::new();
        conv.add_message(Role::Assistant, "just an answer", None, hide());
        let msg = conv.get_last_message().unwrap();
        assert_eq!(msg.content, "just an answer");
        assert!(msg.thoughts.is_none());
    }

    #[test]
    fn get_messages_hides_unnamed_tool_messages() {
        let mut conv = Conversation::new();
        conv.add_message(Role::User, "hi", None, ThoughtOptions::default());
        conv.add_message(Role::Tool, "result", None, ThoughtOptions::default());
        conv.add_message(
            Role::Tool,
            "result2",
            Some("add_numbers".to_string()),
            ThoughtOptions::default(),
        );
        let visible = conv.get_messages();
        assert_eq!(visible.len(), 2);
        assert_eq!(visible[1].name.as_deref(), Some("add_numbers"));
    }

    #[test]
    fn reset_clears_messages_metadata_and_context_together() {
        let mut conv = Conversation::new();
        conv.add_message(Role::User, "hi", None, ThoughtOptions::default());
        conv.set_metadata("k", Value::from("v"));
        conv.set_context("orchestrator_id", Value::from("abc"));
        conv.reset();
        assert!(conv.get_messages().is_empty());
        assert!(conv.get_all_metadata().is_empty());
        assert!(conv.get_context("orchestrator_id").is_none());
    }

    #[test]
    fn clear_messages_preserves_metadata() {
        let mut conv = Conversation::new();
        conv.add_message(Role::User, "hi", None, ThoughtOptions::default());
        conv.set_metadata("k", Value::from("v"));
        conv.clear_messages();
        assert!(conv.get_messages().is_empty());
        assert_eq!(conv.get_metadata("k"), Some(&Value::from("v")));
    }
}
