//! Externally supplied zone and portal records.
//!
//! The renderer consumes these as read-only input; loading them from the
//! remote metadata API (including pagination and caching) is the caller's
//! job. The types derive `Deserialize` so the caller can feed API JSON
//! straight in.
//!
//! Manual corrections to API data are expressed as [`ZoneOverrides`], an
//! explicit field-by-field merge rather than a dynamic map union: present
//! override fields win, absent ones leave the base record untouched.

use serde::Deserialize;

use crate::coord::{ContinentPoint, ContinentRect};

/// Gameplay category of a zone. Drives boundary/label draw order, special
/// coloring and the secondary label text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ZoneCategory {
    City,
    Lobby,
    Outpost,
    OpenWorld,
    Festival,
    Homestead,
    GuildHall,
    Dungeon,
    Raid,
    RaidConvergence,
    Strike,
    Story,
    HybridInstance,
    PublicInstance,
    Lounge,
    Misc,
}

/// Content-gating tier required to access a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessTier {
    Gw2,
    Lw1,
    Lw2,
    Hot,
    Lw3,
    Pof,
    Lw4,
    Lw5,
    Eod,
    Soto,
    Gem,
}

/// One zone record as supplied by the metadata API plus local annotations.
#[derive(Debug, Clone, Deserialize)]
pub struct Zone {
    pub id: i64,
    pub name: String,
    pub category: ZoneCategory,
    pub continent_rect: ContinentRect,
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub max_level: Option<u32>,
    /// Overrides the boundary rect as the label's destination rectangle.
    #[serde(default)]
    pub label_rect: Option<ContinentRect>,
    /// Two-letter anchor code (`{l,m,r}{t,m,b}`); `mm` when absent.
    #[serde(default)]
    pub label_anchor: Option<String>,
    /// Per-zone label size multiplier; category default when absent.
    #[serde(default)]
    pub label_size: Option<f64>,
    #[serde(default)]
    pub access_req: Option<AccessTier>,
    #[serde(default)]
    pub mastery_region: Option<String>,
}

/// Optional mirror of [`Zone`] used for manual data corrections.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ZoneOverrides {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<ZoneCategory>,
    #[serde(default)]
    pub continent_rect: Option<ContinentRect>,
    #[serde(default)]
    pub min_level: Option<u32>,
    #[serde(default)]
    pub max_level: Option<u32>,
    #[serde(default)]
    pub label_rect: Option<ContinentRect>,
    #[serde(default)]
    pub label_anchor: Option<String>,
    #[serde(default)]
    pub label_size: Option<f64>,
    #[serde(default)]
    pub access_req: Option<AccessTier>,
    #[serde(default)]
    pub mastery_region: Option<String>,
}

impl ZoneOverrides {
    /// Applies every present field onto `zone`.
    pub fn apply(&self, zone: &mut Zone) {
        if let Some(name) = &self.name {
            zone.name = name.clone();
        }
        if let Some(category) = self.category {
            zone.category = category;
        }
        if let Some(rect) = self.continent_rect {
            zone.continent_rect = rect;
        }
        if let Some(min_level) = self.min_level {
            zone.min_level = Some(min_level);
        }
        if let Some(max_level) = self.max_level {
            zone.max_level = Some(max_level);
        }
        if let Some(rect) = self.label_rect {
            zone.label_rect = Some(rect);
        }
        if let Some(anchor) = &self.label_anchor {
            zone.label_anchor = Some(anchor.clone());
        }
        if let Some(size) = self.label_size {
            zone.label_size = Some(size);
        }
        if let Some(access) = self.access_req {
            zone.access_req = Some(access);
        }
        if let Some(region) = &self.mastery_region {
            zone.mastery_region = Some(region.clone());
        }
    }
}

/// A marked connection point between zones: a single marker, or two
/// endpoints joined by a drawn line.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum PortalMarker {
    /// Two endpoints connected by a line.
    Pair(f64, f64, f64, f64),
    /// A single marker.
    Single(f64, f64),
}

impl PortalMarker {
    pub fn endpoint(&self) -> ContinentPoint {
        match *self {
            PortalMarker::Single(x, y) => (x, y),
            PortalMarker::Pair(x, y, _, _) => (x, y),
        }
    }

    pub fn far_endpoint(&self) -> Option<ContinentPoint> {
        match *self {
            PortalMarker::Single(..) => None,
            PortalMarker::Pair(_, _, x, y) => Some((x, y)),
        }
    }
}

/// Portal markers grouped by portal-type key, in declaration order.
///
/// The key may be a slash-joined composite (`"dungeon/strike"`), in which
/// case the icon blender renders one pie-slice composite icon for it.
pub type PortalTable = Vec<(String, Vec<PortalMarker>)>;

#[cfg(test)]
mod tests {
    use super::*;

    fn base_zone() -> Zone {
        Zone {
            id: 15,
            name: "Queensdale".to_string(),
            category: ZoneCategory::OpenWorld,
            continent_rect: ((42624.0, 28032.0), (46080.0, 30720.0)),
            min_level: Some(1),
            max_level: Some(15),
            label_rect: None,
            label_anchor: None,
            label_size: None,
            access_req: Some(AccessTier::Gw2),
            mastery_region: Some("Central Tyria".to_string()),
        }
    }

    #[test]
    fn test_overrides_present_fields_win() {
        let mut zone = base_zone();
        let overrides = ZoneOverrides {
            name: Some("Queensdale (revised)".to_string()),
            label_anchor: Some("lt".to_string()),
            label_size: Some(0.8),
            ..Default::default()
        };

        overrides.apply(&mut zone);

        assert_eq!(zone.name, "Queensdale (revised)");
        assert_eq!(zone.label_anchor.as_deref(), Some("lt"));
        assert_eq!(zone.label_size, Some(0.8));
        // Absent override fields leave the base untouched.
        assert_eq!(zone.category, ZoneCategory::OpenWorld);
        assert_eq!(zone.min_level, Some(1));
    }

    #[test]
    fn test_empty_overrides_are_identity() {
        let mut zone = base_zone();
        let before = format!("{:?}", zone);
        ZoneOverrides::default().apply(&mut zone);
        assert_eq!(format!("{:?}", zone), before);
    }

    #[test]
    fn test_zone_deserializes_from_api_shape() {
        let json = r#"{
            "id": 26,
            "name": "Dredgehaunt Cliffs",
            "category": "open_world",
            "continent_rect": [[51200.0, 32768.0], [53760.0, 36352.0]],
            "min_level": 40,
            "max_level": 50,
            "access_req": "gw2"
        }"#;
        let zone: Zone = serde_json::from_str(json).unwrap();
        assert_eq!(zone.id, 26);
        assert_eq!(zone.category, ZoneCategory::OpenWorld);
        assert_eq!(zone.access_req, Some(AccessTier::Gw2));
        assert!(zone.label_rect.is_none());
    }

    #[test]
    fn test_portal_marker_deserializes_both_arities() {
        let table: Vec<PortalMarker> =
            serde_json::from_str("[[100.0, 200.0], [1.0, 2.0, 3.0, 4.0]]").unwrap();
        assert_eq!(table[0].endpoint(), (100.0, 200.0));
        assert_eq!(table[0].far_endpoint(), None);
        assert_eq!(table[1].endpoint(), (1.0, 2.0));
        assert_eq!(table[1].far_endpoint(), Some((3.0, 4.0)));
    }
}
