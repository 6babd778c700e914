//! Interfaces to collaborators this crate consumes but does not implement:
//! OSM tag interpretation, way labeling. Out of scope per the purpose
//! statement this crate was built against — represented here purely as the
//! shape a builder needs, not how any implementation produces it.

use enumset::EnumSet;

use crate::flags::EdgeFlag;
use crate::geo::FixedDegrees;

/// Per-way labeling output: forward/backward flags and car speed. Produced
/// externally from OSM tags; this crate only consumes the result.
pub trait EdgeLabeler {
    /// Flags and speed (km/h x 100) for one direction of one way.
    fn forward(&self, way_id: i64) -> (EnumSet<EdgeFlag>, i16);
    fn backward(&self, way_id: i64) -> (EnumSet<EdgeFlag>, i16);
}

/// A read-only view of one OSM node, as an external reader would supply it.
pub trait OsmNode {
    fn id(&self) -> i64;
    fn lat(&self) -> FixedDegrees;
    fn lon(&self) -> FixedDegrees;
    fn is_intersection(&self) -> bool;
}

/// A read-only view of one OSM way, as an external reader would supply it.
pub trait OsmWay {
    fn id(&self) -> i64;
    fn node_ids(&self) -> &[i64];
}
