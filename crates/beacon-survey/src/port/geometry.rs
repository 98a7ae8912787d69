//! Beacon geometry lookup, owned by the map/calibration side.

use std::collections::{BTreeMap, HashMap};

use crate::domain::distance::BeaconGeometry;

/// Read-only lookup of beacon geometry by beacon ID.
pub trait GeometrySource: Sync {
    /// Geometry for `beacon_id`, if the beacon has been placed on the map.
    fn geometry(&self, beacon_id: &str) -> Option<BeaconGeometry>;
}

impl GeometrySource for HashMap<String, BeaconGeometry> {
    fn geometry(&self, beacon_id: &str) -> Option<BeaconGeometry> {
        self.get(beacon_id).copied()
    }
}

impl GeometrySource for BTreeMap<String, BeaconGeometry> {
    fn geometry(&self, beacon_id: &str) -> Option<BeaconGeometry> {
        self.get(beacon_id).copied()
    }
}
