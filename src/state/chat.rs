use chrono::Local;

const MAX_MESSAGES: usize = 200;
pub const ASSISTANT_NAME: &str = "assistant";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatMessage {
    pub author: String,
    pub body: String,
    pub timestamp: String,
    pub is_system: bool,
}

/// Conversation with the booking assistant. Each question is a single
/// request; the reply lands here when the worker gets it back.
#[derive(Debug)]
pub struct ChatState {
    pub messages: Vec<ChatMessage>,
    pub input: String,
    pub composing: bool,
    pub scroll_offset: u16,
    pub username: String,
    pub awaiting_reply: bool,
}

impl ChatState {
    pub fn new(username: impl Into<String>) -> Self {
        let mut chat = Self {
            messages: Vec::new(),
            input: String::new(),
            composing: false,
            scroll_offset: 0,
            username: username.into(),
            awaiting_reply: false,
        };
        chat.push_system("Ask for a pitch, a match or a time slot near you.");
        chat
    }

    /// Takes the typed question, if any, and records it in the conversation.
    pub fn submit_input(&mut self) -> Option<String> {
        let question = self.input.trim().to_string();
        self.composing = false;
        self.input.clear();
        if question.is_empty() {
            return None;
        }
        let author = self.username.clone();
        self.push(author, question.clone(), false);
        self.awaiting_reply = true;
        self.scroll_offset = 0;
        Some(question)
    }

    pub fn push_reply(&mut self, reply: impl Into<String>) {
        self.awaiting_reply = false;
        self.push(ASSISTANT_NAME.to_string(), reply.into(), false);
    }

    pub fn push_system(&mut self, body: impl Into<String>) {
        let body = body.into();
        if let Some(last) = self.messages.last()
            && last.is_system
            && last.body == body
        {
            return;
        }
        self.push("system".to_string(), body, true);
    }

    /// A failed question stops waiting and says why.
    pub fn reply_failed(&mut self, reason: &str) {
        if self.awaiting_reply {
            self.awaiting_reply = false;
            self.push_system(format!("assistant unavailable: {reason}"));
        }
    }

    pub fn scroll_up(&mut self) {
        let max = self.messages.len().saturating_sub(1) as u16;
        self.scroll_offset = (self.scroll_offset + 1).min(max);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    fn push(&mut self, author: String, body: String, is_system: bool) {
        self.messages.push(ChatMessage {
            author,
            body,
            timestamp: Local::now().format("%H:%M").to_string(),
            is_system,
        });
        if self.messages.len() > MAX_MESSAGES {
            let remove_count = self.messages.len() - MAX_MESSAGES;
            self.messages.drain(0..remove_count);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_input_is_not_sent() {
        let mut chat = ChatState::new("amine");
        chat.composing = true;
        chat.input = "   ".into();
        assert_eq!(chat.submit_input(), None);
        assert!(!chat.composing);
        assert!(!chat.awaiting_reply);
        assert_eq!(chat.messages.len(), 1);
    }

    #[test]
    fn question_then_reply() {
        let mut chat = ChatState::new("amine");
        chat.input = " 5v5 tonight? ".into();
        assert_eq!(chat.submit_input().as_deref(), Some("5v5 tonight?"));
        assert!(chat.awaiting_reply);
        assert!(chat.input.is_empty());

        chat.push_reply("Stade A has 20:00 free");
        assert!(!chat.awaiting_reply);
        let last = chat.messages.last().unwrap();
        assert_eq!(last.author, ASSISTANT_NAME);
        assert_eq!(chat.messages[1].author, "amine");
    }

    #[test]
    fn failures_only_reported_while_waiting() {
        let mut chat = ChatState::new("amine");
        chat.reply_failed("timeout");
        assert_eq!(chat.messages.len(), 1);

        chat.input = "hello".into();
        chat.submit_input();
        chat.reply_failed("timeout");
        chat.reply_failed("timeout");
        assert!(chat.messages.last().unwrap().is_system);
        assert_eq!(chat.messages.len(), 3);
    }

    #[test]
    fn history_is_bounded() {
        let mut chat = ChatState::new("amine");
        for i in 0..250 {
            chat.push_reply(format!("reply {i}"));
        }
        assert_eq!(chat.messages.len(), MAX_MESSAGES);
        assert_eq!(chat.messages.last().unwrap().body, "reply 249");
    }
}
