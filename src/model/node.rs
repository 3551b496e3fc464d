//! Node in the relationship graph.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Opaque node identifier (dossier UUID in production).
///
/// Ordered lexicographically so that tie-breaks on node id sequences are
/// reproducible.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The closed set of entity kinds a dossier can be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DossierType {
    Country,
    Organization,
    Forum,
    Person,
    Engagement,
    WorkingGroup,
    Topic,
}

impl DossierType {
    pub const ALL: [DossierType; 7] = [
        DossierType::Country,
        DossierType::Organization,
        DossierType::Forum,
        DossierType::Person,
        DossierType::Engagement,
        DossierType::WorkingGroup,
        DossierType::Topic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DossierType::Country => "country",
            DossierType::Organization => "organization",
            DossierType::Forum => "forum",
            DossierType::Person => "person",
            DossierType::Engagement => "engagement",
            DossierType::WorkingGroup => "working_group",
            DossierType::Topic => "topic",
        }
    }
}

impl std::fmt::Display for DossierType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DossierType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DossierType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidParameter(format!("unknown dossier type '{s}'")))
    }
}

/// A read-only view of an external dossier entity.
///
/// `label` and `status` are only used for filtering and statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: DossierType,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub status: String,
}

impl Node {
    pub fn new(id: impl Into<NodeId>, kind: DossierType) -> Self {
        Self {
            id: id.into(),
            kind,
            label: String::new(),
            status: "active".to_string(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}
