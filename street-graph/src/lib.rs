//! Column-oriented street graph store, scenario overlays, and point-to-street
//! linkage.
//!
//! This is the storage and topology layer of a multimodal street-network
//! router: [`VertexStore`]/[`EdgeStore`] hold the graph as struct-of-arrays
//! columns with zero-allocation cursor views, [`street_layer::StreetLayer`]
//! owns those stores plus a spatial index and exposes point-to-street
//! projection (`find_split`) and the extend-only scenario overlay, and
//! [`turn_restriction`] models multi-way turn restrictions and the table
//! used for reverse search. [`street_router`] (a sibling crate) borrows a
//! frozen `StreetLayer` read-only to run searches over it.

pub mod append_only;
pub mod edge_store;
pub mod error;
pub mod external;
pub mod flags;
pub mod geo;
pub mod indices;
pub mod spatial_index;
pub mod street_layer;
pub mod turn_restriction;
pub mod vertex_store;

pub use edge_store::{EdgeCursor, EdgeStore, EdgeView};
pub use error::{GraphError, ScenarioError};
pub use flags::{EdgeFlag, StreetClass, StreetMode, VertexFlag};
pub use geo::{Brads, FixedDegrees};
pub use indices::{EdgeIndex, EdgePairIndex, VertexIndex};
pub use street_layer::{BuilderConfig, Split, StreetLayer};
pub use turn_restriction::{TurnRestriction, TurnRestrictionTable};
pub use vertex_store::{VertexCursor, VertexStore};
