//! Relationship (edge) between two dossiers.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::NodeId;
use crate::Error;

/// Derived traversal cost of an edge. Always positive.
pub type Weight = u32;

/// Added to the strength weight of an edge that is no longer active.
pub const INACTIVE_PENALTY: Weight = 3;

/// Relationship type name, e.g. `member_of` or `bilateral_relation`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelType(pub String);

impl RelType {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RelType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// How close a relationship is. Lower weight is closer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strength {
    Primary,
    Secondary,
    Observer,
}

impl Strength {
    pub fn weight(self) -> Weight {
        match self {
            Strength::Primary => 1,
            Strength::Secondary => 2,
            Strength::Observer => 3,
        }
    }
}

impl FromStr for Strength {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "primary" => Ok(Strength::Primary),
            "secondary" => Ok(Strength::Secondary),
            "observer" => Ok(Strength::Observer),
            other => Err(Error::InvalidParameter(format!("unknown relationship strength '{other}'"))),
        }
    }
}

/// Lifecycle status of a relationship record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeStatus {
    Active,
    Historical,
    Terminated,
}

impl FromStr for EdgeStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EdgeStatus::Active),
            "historical" | "inactive" => Ok(EdgeStatus::Historical),
            "terminated" => Ok(EdgeStatus::Terminated),
            other => Err(Error::InvalidParameter(format!("unknown relationship status '{other}'"))),
        }
    }
}

/// Traversal direction relative to stored edge direction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Follow stored direction (source → target).
    #[default]
    Forward,
    /// Follow edges backwards (target → source).
    Reverse,
    /// Either way ("any direction").
    Both,
}

impl Direction {
    pub fn includes_forward(self) -> bool {
        matches!(self, Direction::Forward | Direction::Both)
    }

    pub fn includes_reverse(self) -> bool {
        matches!(self, Direction::Reverse | Direction::Both)
    }
}

/// A directed, typed relationship between two dossiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub source: NodeId,
    pub target: NodeId,
    pub rel_type: RelType,
    pub strength: Strength,
    pub status: EdgeStatus,
    pub established: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended: Option<NaiveDate>,
}

impl Edge {
    /// An active edge established on 2000-01-01 with no end date.
    pub fn new(
        source: impl Into<NodeId>,
        target: impl Into<NodeId>,
        rel_type: impl Into<String>,
        strength: Strength,
    ) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            rel_type: RelType::new(rel_type),
            strength,
            status: EdgeStatus::Active,
            established: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default(),
            ended: None,
        }
    }

    pub fn with_status(mut self, status: EdgeStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_established(mut self, date: NaiveDate) -> Self {
        self.established = date;
        self
    }

    pub fn with_end(mut self, date: NaiveDate) -> Self {
        self.ended = Some(date);
        self
    }

    /// Active on `as_of`: status is active and no end date on or before it.
    pub fn is_active(&self, as_of: NaiveDate) -> bool {
        self.status == EdgeStatus::Active && self.ended.is_none_or(|end| end > as_of)
    }

    pub fn weight(&self, as_of: NaiveDate) -> Weight {
        if self.is_active(as_of) {
            self.strength.weight()
        } else {
            self.strength.weight() + INACTIVE_PENALTY
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source == self.target
    }
}
