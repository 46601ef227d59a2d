use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ConfigError;

/// The tracked usernames, one per line in a text file.
///
/// Every change is written back immediately.
#[derive(Debug, Clone)]
pub struct UserList {
    path: PathBuf,
    users: Vec<String>,
}

/// Usernames are letters, digits and underscores.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_alphanumeric() || c == '_')
}

impl UserList {
    /// Read the list; a missing file is an empty list.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let users = match fs::read_to_string(path) {
            Ok(content) => content
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .map(String::from)
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            users,
        })
    }

    pub fn users(&self) -> &[String] {
        &self.users
    }

    pub fn contains(&self, name: &str) -> bool {
        self.users.iter().any(|u| u.eq_ignore_ascii_case(name))
    }

    /// Returns `false` if the user was already tracked.
    pub fn add(&mut self, name: &str) -> Result<bool, ConfigError> {
        if !is_valid_username(name) {
            return Err(ConfigError::Invalid(format!("invalid username: {:?}", name)));
        }
        if self.contains(name) {
            return Ok(false);
        }
        self.users.push(name.to_string());
        self.save()?;
        Ok(true)
    }

    /// Returns `false` if the user was not tracked.
    pub fn remove(&mut self, name: &str) -> Result<bool, ConfigError> {
        let before = self.users.len();
        self.users.retain(|u| !u.eq_ignore_ascii_case(name));
        if self.users.len() == before {
            return Ok(false);
        }
        self.save()?;
        Ok(true)
    }

    fn save(&self) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ConfigError::Io {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        fs::write(&self.path, self.users.join("\n")).map_err(|e| ConfigError::Io {
            path: self.path.clone(),
            source: e,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let list = UserList::load(&dir.path().join("users.txt")).unwrap();
        assert!(list.users().is_empty());
    }

    #[test]
    fn test_load_skips_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("users.txt");
        fs::write(&path, "jane\n\n  bob  \n").unwrap();

        let list = UserList::load(&path).unwrap();
        assert_eq!(list.users(), ["jane", "bob"]);
    }

    #[test]
    fn test_add_and_remove_persist() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("users.txt");

        let mut list = UserList::load(&path).unwrap();
        assert!(list.add("jane").unwrap());
        assert!(list.add("bob_2").unwrap());
        assert!(!list.add("JANE").unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "jane\nbob_2");

        assert!(list.remove("jane").unwrap());
        assert!(!list.remove("jane").unwrap());

        let reloaded = UserList::load(&path).unwrap();
        assert_eq!(reloaded.users(), ["bob_2"]);
    }

    #[test]
    fn test_rejects_invalid_username() {
        let dir = tempfile::tempdir().unwrap();
        let mut list = UserList::load(&dir.path().join("users.txt")).unwrap();
        assert!(list.add("no spaces").is_err());
        assert!(list.add("").is_err());
        assert!(!is_valid_username("a/b"));
        assert!(is_valid_username("film_fan99"));
    }
}
