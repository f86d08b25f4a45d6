use super::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map as JsonMap, Value as JsonValue};
use std::fmt;
use std::str::FromStr;

/// Opaque 64-bit member identity.
///
/// Used both as the sharding key and as the entries of adjacency lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub i64);

impl MemberId {
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> i64 {
        self.0
    }

    /// Canonical string form, also used as the stored member value.
    pub fn canonical(self) -> String {
        self.0.to_string()
    }
}

impl From<i64> for MemberId {
    fn from(raw: i64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for MemberId {
    type Err = GraphError;

    fn from_str(raw: &str) -> Result<Self> {
        raw.trim()
            .parse::<i64>()
            .map(MemberId)
            .map_err(|err| GraphError::InvalidInput(format!("invalid member id '{}': {}", raw, err)))
    }
}

/// Directed edge between two members.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    pub source_id: MemberId,
    pub dest_id: MemberId,
    #[serde(default, skip_serializing_if = "JsonMap::is_empty")]
    pub metadata: JsonMap<String, JsonValue>,
}

impl Connection {
    pub fn new(source_id: impl Into<MemberId>, dest_id: impl Into<MemberId>) -> Self {
        Self {
            source_id: source_id.into(),
            dest_id: dest_id.into(),
            metadata: JsonMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: JsonValue) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

/// Hop-count classification between two members.
///
/// `Beyond` means "not established within 3 hops", which is not a proof of absence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum Distance {
    First,
    Second,
    Third,
    Beyond,
}

impl Distance {
    pub const fn hops(self) -> u8 {
        match self {
            Self::First => 1,
            Self::Second => 2,
            Self::Third => 3,
            Self::Beyond => 4,
        }
    }
}

impl From<Distance> for u8 {
    fn from(distance: Distance) -> Self {
        distance.hops()
    }
}

impl TryFrom<u8> for Distance {
    type Error = GraphError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            3 => Ok(Self::Third),
            4 => Ok(Self::Beyond),
            other => Err(GraphError::InvalidInput(format!(
                "distance must be within 1..=4, got {}",
                other
            ))),
        }
    }
}

/// Per-request distance answer; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphDistance {
    pub source_id: MemberId,
    pub dest_id: MemberId,
    pub distance: Distance,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn member_id_parses_decimal_strings() {
        assert_eq!(" 42 ".parse::<MemberId>().unwrap(), MemberId(42));
        assert_eq!("-7".parse::<MemberId>().unwrap(), MemberId(-7));
        assert!(matches!(
            "4x2".parse::<MemberId>(),
            Err(GraphError::InvalidInput(_))
        ));
        assert!("".parse::<MemberId>().is_err());
    }

    #[test]
    fn graph_distance_serializes_distance_as_hop_count() {
        let value = serde_json::to_value(GraphDistance {
            source_id: MemberId(100),
            dest_id: MemberId(999),
            distance: Distance::Beyond,
        })
        .unwrap();
        assert_eq!(value, json!({"sourceId": 100, "destId": 999, "distance": 4}));
    }

    #[test]
    fn distance_rejects_out_of_range_values() {
        assert!(serde_json::from_value::<Distance>(json!(0)).is_err());
        assert!(serde_json::from_value::<Distance>(json!(5)).is_err());
        assert_eq!(
            serde_json::from_value::<Distance>(json!(3)).unwrap(),
            Distance::Third
        );
    }

    #[test]
    fn connection_metadata_is_optional_on_the_wire() {
        let conn: Connection =
            serde_json::from_value(json!({"sourceId": 1, "destId": 2})).unwrap();
        assert_eq!(conn, Connection::new(1, 2));

        let tagged = Connection::new(1, 2).with_metadata("since", json!(2019));
        let value = serde_json::to_value(&tagged).unwrap();
        assert_eq!(value["metadata"]["since"], 2019);
    }
}
