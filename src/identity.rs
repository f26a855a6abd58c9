use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use log::{error, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Opaque node identifier. Lexicographic order is the only tie-break rule
/// used by elections, so `Ord` here decides who wins.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(String);

impl NodeId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        NodeId(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        NodeId(s)
    }
}

/// Generate a fresh random identifier: 128 bits rendered as lowercase hex.
pub fn generate() -> NodeId {
    let raw: u128 = rand::rng().random();
    NodeId(format!("{raw:032x}"))
}

/// Load the node identity from `path`, or generate and persist a new one.
///
/// Failures never propagate: an unreadable file falls back to a fresh
/// ephemeral identifier, and a failed save only costs identity stability
/// across restarts.
pub fn load_or_generate(path: &Path) -> NodeId {
    match load(path) {
        Ok(Some(id)) => {
            info!("Loaded node identity {id} from {}", path.display());
            id
        }
        Ok(None) => {
            let id = generate();
            if let Err(e) = save(path, &id) {
                warn!(
                    "Failed to save node identity to {}: {e}; identity will not survive a restart",
                    path.display()
                );
            } else {
                info!("Generated node identity {id}, saved to {}", path.display());
            }
            id
        }
        Err(e) => {
            error!(
                "Failed to read node identity from {}: {e}; using an ephemeral identity",
                path.display()
            );
            generate()
        }
    }
}

fn load(path: &Path) -> io::Result<Option<NodeId>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)?;
    let trimmed = contents.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    Ok(Some(NodeId::from(trimmed)))
}

fn save(path: &Path, id: &NodeId) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, id.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn generated_ids_are_32_hex_chars_and_distinct() {
        let a = generate();
        let b = generate();
        assert_eq!(a.as_str().len(), 32);
        assert!(a.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn load_or_generate_round_trips_across_processes() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("node-id.txt");

        let first = load_or_generate(&path);
        let second = load_or_generate(&path);
        assert_eq!(first, second);
    }

    #[test]
    fn empty_file_is_treated_as_absent() {
        let tmp = tempdir().expect("tempdir");
        let path = tmp.path().join("node-id.txt");
        fs::write(&path, "  \n").expect("write");

        let id = load_or_generate(&path);
        assert!(!id.as_str().is_empty());
        // The generated identity replaced the empty file.
        assert_eq!(load_or_generate(&path), id);
    }

    #[test]
    fn unwritable_save_path_still_yields_an_identity() {
        let tmp = tempdir().expect("tempdir");
        let blocker = tmp.path().join("blocker");
        fs::write(&blocker, "not a directory").expect("write");

        // Parent of the id file is a regular file, so the save must fail.
        let id = load_or_generate(&blocker.join("node-id.txt"));
        assert_eq!(id.as_str().len(), 32);
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(NodeId::from("9") > NodeId::from("5"));
        assert!(NodeId::from("5") > NodeId::from("3"));
    }
}
