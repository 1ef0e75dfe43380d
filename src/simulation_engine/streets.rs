use crate::simulation_engine::intersection::IntersectionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a street.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StreetId(pub u32);

impl fmt::Display for StreetId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "S{}", self.0)
    }
}

/// Represents a street (road connection between intersections).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Street {
    pub id: StreetId,
    /// Start intersection (node).
    pub from: IntersectionId,
    /// End intersection (node).
    pub to: IntersectionId,
}

impl Street {
    pub fn new(id: u32, from: IntersectionId, to: IntersectionId) -> Self {
        Self {
            id: StreetId(id),
            from,
            to,
        }
    }

    /// The intersection at the other end, if `at` is one of the endpoints.
    pub fn other_end(&self, at: IntersectionId) -> Option<IntersectionId> {
        if self.from == at {
            Some(self.to)
        } else if self.to == at {
            Some(self.from)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn other_end_of_street() {
        let street = Street::new(1, IntersectionId(0), IntersectionId(1));
        assert_eq!(street.other_end(IntersectionId(0)), Some(IntersectionId(1)));
        assert_eq!(street.other_end(IntersectionId(1)), Some(IntersectionId(0)));
        assert_eq!(street.other_end(IntersectionId(2)), None);
    }
}
