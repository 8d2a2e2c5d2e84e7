//! Resource types: the registry key classifying a document's schema.

use serde::{Deserialize, Serialize};

/// The kind of resource a serialized document represents.
///
/// Used only as a lookup key into the [`FieldRegistry`](crate::FieldRegistry);
/// the transformer never interprets it beyond that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    /// Alerting contact points, policies, and templates.
    Alerting,
    /// Data source connections.
    Connection,
    /// Dashboards.
    Dashboard,
    /// Folders.
    Folder,
    /// Library panels and variables.
    LibraryElement,
    /// Organizations.
    Organization,
    /// Teams.
    Team,
    /// Users.
    User,
}

impl ResourceType {
    /// Every resource type, in declaration order.
    pub const ALL: [Self; 8] = [
        Self::Alerting,
        Self::Connection,
        Self::Dashboard,
        Self::Folder,
        Self::LibraryElement,
        Self::Organization,
        Self::Team,
        Self::User,
    ];

    /// The identifier used in settings files and on the command line.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Alerting => "alerting",
            Self::Connection => "connection",
            Self::Dashboard => "dashboard",
            Self::Folder => "folder",
            Self::LibraryElement => "library_element",
            Self::Organization => "organization",
            Self::Team => "team",
            Self::User => "user",
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known resource type.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown resource type '{0}'")]
pub struct UnknownResourceType(pub String);

impl std::str::FromStr for ResourceType {
    type Err = UnknownResourceType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == wanted)
            .ok_or_else(|| UnknownResourceType(s.to_owned()))
    }
}
