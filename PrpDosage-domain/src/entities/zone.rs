use serde::{Deserialize, Serialize};

#[cfg(feature = "with-api")]
use utoipa::ToSchema;

/// Identifier of an anatomical treatment zone
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "with-api", derive(ToSchema))]
#[serde(rename_all = "snake_case")]
pub enum ZoneKey {
    /// Temporal and crown areas
    TemporalCrown,
    /// Whole scalp
    FullScalp,
}

impl ZoneKey {
    /// Key used in the response envelope
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneKey::TemporalCrown => "temporal_crown",
            ZoneKey::FullScalp => "full_scalp",
        }
    }
}

impl std::fmt::Display for ZoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Clinical targets for one treatment zone
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneConfig {
    /// Zone identifier
    pub key: ZoneKey,
    /// Display name
    pub name: &'static str,
    /// Fewest platelets that make up an effective treatment
    pub min_platelets: f64,
    /// Most platelets the zone should receive
    pub max_platelets: f64,
    /// Nominal platelet dose
    pub target_platelets: f64,
    /// Smallest injectable volume that covers the zone (mL)
    pub min_volume_ml: f64,
}

/// Temporal/Crown zone
pub const TEMPORAL_CROWN: ZoneConfig = ZoneConfig {
    key: ZoneKey::TemporalCrown,
    name: "Temporal/Crown",
    min_platelets: 1.5e9,
    max_platelets: 2.0e9,
    target_platelets: 1.75e9,
    min_volume_ml: 2.0,
};

/// Full Scalp zone
pub const FULL_SCALP: ZoneConfig = ZoneConfig {
    key: ZoneKey::FullScalp,
    name: "Full Scalp",
    min_platelets: 3.0e9,
    max_platelets: 4.0e9,
    target_platelets: 3.5e9,
    min_volume_ml: 3.0,
};

/// Zones planned for every request, in response order
pub const ZONES: [ZoneConfig; 2] = [TEMPORAL_CROWN, FULL_SCALP];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zone_targets_are_consistent() {
        for zone in ZONES.iter() {
            assert!(zone.min_platelets <= zone.target_platelets, "{}", zone.name);
            assert!(zone.target_platelets <= zone.max_platelets, "{}", zone.name);
            assert!(zone.min_volume_ml > 0.0, "{}", zone.name);
        }
    }

    #[test]
    fn test_temporal_crown_is_smaller_than_full_scalp() {
        assert!(TEMPORAL_CROWN.target_platelets < FULL_SCALP.target_platelets);
        assert!(TEMPORAL_CROWN.min_platelets < FULL_SCALP.min_platelets);
        assert!(TEMPORAL_CROWN.max_platelets < FULL_SCALP.max_platelets);
        assert!(TEMPORAL_CROWN.min_volume_ml < FULL_SCALP.min_volume_ml);
    }

    #[test]
    fn test_protocol_targets() {
        assert_eq!(TEMPORAL_CROWN.target_platelets, 1.75e9);
        assert_eq!(FULL_SCALP.target_platelets, 3.5e9);
        assert_eq!(TEMPORAL_CROWN.min_volume_ml, 2.0);
    }

    #[test]
    fn test_zone_key_serializes_snake_case() {
        assert_eq!(ZoneKey::TemporalCrown.to_string(), "temporal_crown");
        assert_eq!(
            serde_json::to_value(ZoneKey::FullScalp).unwrap(),
            serde_json::json!("full_scalp")
        );
    }
}
