//! Conversation transcript
//!
//! Append-only for the lifetime of one interactive session. Nothing is ever
//! trimmed, so long sessions grow the request size without bound.

use crate::core::Message;

/// Ordered conversation history sent to the model
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    /// Message history, oldest first
    messages: Vec<Message>,
    /// System prompt (always first)
    system_prompt: Option<String>,
}

impl Conversation {
    /// Create an empty conversation
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the system prompt
    pub fn set_system_prompt(&mut self, prompt: impl Into<String>) {
        self.system_prompt = Some(prompt.into());
    }

    /// Current system prompt, if any
    pub fn system_prompt(&self) -> Option<&str> {
        self.system_prompt.as_deref()
    }

    /// Add a user message
    pub fn add_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    /// Add an assistant message
    pub fn add_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Add a system message, e.g. tool results
    pub fn add_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::system(content));
    }

    /// Get all messages including system prompt
    pub fn get_messages(&self) -> Vec<Message> {
        let mut result = Vec::with_capacity(self.messages.len() + 1);

        if let Some(ref prompt) = self.system_prompt {
            result.push(Message::system(prompt.clone()));
        }

        result.extend(self.messages.iter().cloned());
        result
    }

    /// Get message count
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Role;

    #[test]
    fn test_conversation_basic() {
        let mut conv = Conversation::new();
        conv.add_user("Hello");
        conv.add_assistant("Hi there!");

        assert_eq!(conv.len(), 2);
        let messages = conv.get_messages();
        assert_eq!(messages[1].role, Role::Assistant);
        assert_eq!(messages[1].content, "Hi there!");
    }

    #[test]
    fn test_never_truncates() {
        let mut conv = Conversation::new();
        for i in 0..500 {
            conv.add_user(i.to_string());
        }
        assert_eq!(conv.len(), 500);
        assert_eq!(conv.get_messages()[0].content, "0");
    }

    #[test]
    fn test_system_prompt_first() {
        let mut conv = Conversation::new();
        conv.set_system_prompt("You are a helpful assistant");
        conv.add_user("Hello");
        conv.add_system("{}");

        let messages = conv.get_messages();
        let roles: Vec<Role> = messages.iter().map(|m| m.role).collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::System]);
        assert_eq!(messages[0].content, "You are a helpful assistant");
    }
}
