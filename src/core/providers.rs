//! Tool provider declarations
//!
//! Reads the `mcpServers` JSON file that names every provider subprocess.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use tracing::warn;

use crate::core::error::{BridgeError, Result};

/// How to launch one tool provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolProviderConfig {
    /// Logical name, unique within a provider set
    #[serde(skip)]
    pub name: String,
    /// Executable to spawn
    pub command: String,
    /// Arguments passed to the executable
    #[serde(default)]
    pub args: Vec<String>,
    /// Environment overrides layered over the parent environment
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl ToolProviderConfig {
    pub fn new(name: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
        }
    }
}

/// All providers declared in a config file, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderSet {
    providers: Vec<ToolProviderConfig>,
}

#[derive(Deserialize)]
struct ProviderFile {
    #[serde(rename = "mcpServers")]
    mcp_servers: ProviderSet,
}

impl ProviderSet {
    /// Load providers from a JSON file.
    ///
    /// A missing file is not an error: the session simply has no tools.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.is_file() {
            warn!(path = %path.display(), "no tool provider config found");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            BridgeError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Self::from_json(&content)
    }

    /// Parse providers from the text of a config file
    pub fn from_json(content: &str) -> Result<Self> {
        let file: ProviderFile = serde_json::from_str(content)
            .map_err(|e| BridgeError::config(format!("Invalid provider config: {}", e)))?;
        Ok(file.mcp_servers)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolProviderConfig> {
        self.providers.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl IntoIterator for ProviderSet {
    type Item = ToolProviderConfig;
    type IntoIter = std::vec::IntoIter<ToolProviderConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.providers.into_iter()
    }
}

struct ProviderSetVisitor;

impl<'de> Visitor<'de> for ProviderSetVisitor {
    type Value = ProviderSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping provider names to launch settings")
    }

    fn visit_map<A>(self, mut map: A) -> std::result::Result<ProviderSet, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut providers: Vec<ToolProviderConfig> = Vec::new();

        while let Some(name) = map.next_key::<String>()? {
            if providers.iter().any(|p| p.name == name) {
                return Err(de::Error::custom(format!(
                    "duplicate provider name '{}'",
                    name
                )));
            }
            let mut provider: ToolProviderConfig = map.next_value()?;
            provider.name = name;
            providers.push(provider);
        }

        Ok(ProviderSet { providers })
    }
}

impl<'de> Deserialize<'de> for ProviderSet {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(ProviderSetVisitor)
    }
}
