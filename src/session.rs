use serde::Deserialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub text: String,
}

/// Conversation state for one user session.
///
/// Owned by the orchestrator and handed to each turn by `&mut`. Nothing is
/// persisted: dropping the session drops the history.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<Message>,
    chat_id: String,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Identifier of the backend conversation, empty before the first reply
    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn push(&mut self, role: Role, text: impl Into<String>) {
        self.messages.push(Message {
            role,
            text: text.into(),
        });
    }

    /// Keep the current id unless the backend handed out a new non-empty one
    pub fn adopt_chat_id(&mut self, chat_id: Option<&str>) {
        if let Some(id) = chat_id.filter(|id| !id.is_empty()) {
            self.chat_id = id.to_string();
        }
    }

    /// Forget the conversation; the next question starts a fresh backend chat
    pub fn new_chat(&mut self) {
        self.messages.clear();
        self.chat_id.clear();
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomerEntry {
    pub customer: String,
    pub table: String,
    pub customer_id: String,
}

/// Maps a (customer, table) selection to the backend's customer id
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct CustomerDirectory {
    entries: Vec<CustomerEntry>,
}

impl CustomerDirectory {
    pub fn new(entries: Vec<CustomerEntry>) -> Self {
        Self { entries }
    }

    pub fn lookup(&self, customer: &str, table: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.customer == customer && e.table == table)
            .map(|e| e.customer_id.as_str())
    }

    /// Distinct customer names, in configured order
    pub fn customers(&self) -> Vec<&str> {
        distinct(self.entries.iter().map(|e| e.customer.as_str()))
    }

    /// Distinct table names, in configured order
    pub fn tables(&self) -> Vec<&str> {
        distinct(self.entries.iter().map(|e| e.table.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn distinct<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut out: Vec<&str> = Vec::new();
    for name in names {
        if !out.contains(&name) {
            out.push(name);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(customer: &str, table: &str, id: &str) -> CustomerEntry {
        CustomerEntry {
            customer: customer.to_string(),
            table: table.to_string(),
            customer_id: id.to_string(),
        }
    }

    #[test]
    fn test_chat_id_adoption() {
        let mut session = ChatSession::new();
        assert_eq!(session.chat_id(), "");

        session.adopt_chat_id(Some("c-1"));
        assert_eq!(session.chat_id(), "c-1");

        session.adopt_chat_id(Some(""));
        session.adopt_chat_id(None);
        assert_eq!(session.chat_id(), "c-1");
    }

    #[test]
    fn test_new_chat_clears_state() {
        let mut session = ChatSession::new();
        session.push(Role::User, "hi");
        session.push(Role::Assistant, "hello");
        session.adopt_chat_id(Some("c-1"));

        session.new_chat();
        assert!(session.messages().is_empty());
        assert_eq!(session.chat_id(), "");
    }

    #[test]
    fn test_directory_lookup() {
        let dir = CustomerDirectory::new(vec![
            entry("customer_1", "compliance", "id-1c"),
            entry("customer_1", "inventory", "id-1i"),
            entry("customer_2", "compliance", "id-2c"),
        ]);

        assert_eq!(dir.lookup("customer_1", "inventory"), Some("id-1i"));
        assert_eq!(dir.lookup("customer_2", "inventory"), None);
        assert_eq!(dir.customers(), vec!["customer_1", "customer_2"]);
        assert_eq!(dir.tables(), vec!["compliance", "inventory"]);
    }
}
