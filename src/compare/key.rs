use serde::Serialize;
use std::fmt;

/// Identity under which lines from different sources are matched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineKey {
    /// Identifier that occurs in more than one source.
    Id { id: String },
    /// Unordered endpoint pair, stored sorted.
    Endpoints { a: String, b: String },
}

impl LineKey {
    pub fn id(id: &str) -> Self {
        LineKey::Id { id: id.to_string() }
    }

    pub fn endpoints(bus0: &str, bus1: &str) -> Self {
        let (a, b) = if bus0 <= bus1 {
            (bus0, bus1)
        } else {
            (bus1, bus0)
        };
        LineKey::Endpoints {
            a: a.to_string(),
            b: b.to_string(),
        }
    }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineKey::Id { id } => write!(f, "{id}"),
            LineKey::Endpoints { a, b } => write!(f, "{a} - {b}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_unordered() {
        assert_eq!(LineKey::endpoints("A", "B"), LineKey::endpoints("B", "A"));
        assert_ne!(LineKey::endpoints("A", "B"), LineKey::endpoints("A", "C"));
    }

    #[test]
    fn test_id_and_endpoints_never_collide() {
        assert_ne!(LineKey::id("A - B"), LineKey::endpoints("A", "B"));
    }

    #[test]
    fn test_display() {
        assert_eq!(LineKey::endpoints("Wolmirstedt", "Helmstedt").to_string(), "Helmstedt - Wolmirstedt");
        assert_eq!(LineKey::id("l42").to_string(), "l42");
    }
}
