use crate::{NodeDirectoryError, UNKNOWN};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;
use tracing::{debug, info, warn};

/// `XXX_MGT_NN <free text>`
static NODE_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w{3}_MGT_\d{2})\s+(.*)$").expect("node name pattern"));

/// Reference data for one node.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NodeInfo {
    pub name: String,
    /// Any other fields carried by the reference file.
    #[serde(flatten)]
    pub attributes: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct NodeEntry {
    id: String,
    #[serde(flatten)]
    info: NodeInfo,
}

/// Read-only mapping from node identifier to its reference data.
#[derive(Debug, Clone, Default)]
pub struct NodeDirectory {
    nodes: HashMap<String, NodeInfo>,
}

impl NodeDirectory {
    /// A directory in which every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load a JSON array of `{ "id": ..., "name": ..., ... }` objects.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, NodeDirectoryError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => NodeDirectoryError::NotFound(path.to_path_buf()),
            _ => NodeDirectoryError::Io(e),
        })?;

        let directory = Self::from_reader(BufReader::new(file)).map_err(|source| {
            NodeDirectoryError::Malformed {
                path: path.to_path_buf(),
                source,
            }
        })?;
        info!("Loaded {} nodes from {}", directory.len(), path.display());
        Ok(directory)
    }

    /// Fails only when the document is not a JSON array. Entries that lack an
    /// `id` or `name` are skipped with a warning.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, serde_json::Error> {
        let values: Vec<serde_json::Value> = serde_json::from_reader(reader)?;
        let mut nodes = HashMap::with_capacity(values.len());
        for value in values {
            match NodeEntry::deserialize(&value) {
                Ok(entry) => {
                    nodes.insert(entry.id, entry.info);
                }
                Err(e) => warn!("Skipping node entry {}: {}", value, e),
            }
        }
        Ok(Self { nodes })
    }

    pub fn insert(&mut self, id: impl Into<String>, info: NodeInfo) {
        self.nodes.insert(id.into(), info);
    }

    pub fn get(&self, id: &str) -> Option<&NodeInfo> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Structured code and display name for a node, `("?", "?")` when the node
    /// is unknown or its name does not follow the `XXX_MGT_NN <text>` form.
    pub fn describe(&self, id: &str) -> (String, String) {
        match self.get(id) {
            Some(info) => split_node_name(&info.name).unwrap_or_else(|| {
                debug!("Node '{}' has unrecognised name '{}'", id, info.name);
                unknown_pair()
            }),
            None => unknown_pair(),
        }
    }
}

/// Split `ABC_MGT_07 Pump House` into `("ABC_MGT_07", "Pump House")`.
pub fn split_node_name(name: &str) -> Option<(String, String)> {
    let caps = NODE_NAME_RE.captures(name)?;
    Some((
        caps.get(1)?.as_str().trim().to_string(),
        caps.get(2)?.as_str().trim().to_string(),
    ))
}

fn unknown_pair() -> (String, String) {
    (UNKNOWN.to_string(), UNKNOWN.to_string())
}
