use crate::domain::LogEntry;

/// One user's activity from a single feed fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct UserFeed {
    pub user_link: String,
    pub display_name: String,
    pub entries: Vec<LogEntry>,
}

impl UserFeed {
    pub fn new(user_link: String, display_name: String) -> Self {
        Self {
            user_link,
            display_name,
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
