//! Fixed-point coordinates, compass angles, and distance/envelope math.
//!
//! This plays the role of `spatial.rs` in the teacher crate, generalized
//! from a float-only helper into the fixed-point representation the column
//! store needs (spec.md section 3: "fixed-point degrees").

use geo::{coord, Coord, CoordFloat, Destination, Haversine, Point, Rect};
use num_traits::FromPrimitive;

/// WGS-84 degrees scaled by 1e7 and stored as a 32-bit integer.
///
/// Chosen the same way the teacher packs lat/lon offsets into integer bit
/// fields: enough precision for routing (about 1.1cm at the equator), no
/// floating-point comparison surprises when persisted or diffed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FixedDegrees(pub i32);

const FIXED_SCALE: f64 = 1e7;

impl FixedDegrees {
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_degrees(degrees: f64) -> Self {
        Self((degrees * FIXED_SCALE).round() as i32)
    }

    #[must_use]
    pub fn to_degrees(self) -> f64 {
        f64::from(self.0) / FIXED_SCALE
    }
}

/// A signed 8-bit compass angle, clockwise from north, where 256 brads is a
/// full turn (spec.md section 3: "binary-radians").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Brads(pub i8);

impl Brads {
    /// Converts a bearing in radians, clockwise from north in `[0, 2*pi)`,
    /// into binary radians.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn from_radians_cw(radians: f64) -> Self {
        let turns = radians / std::f64::consts::TAU;
        let wrapped = (turns * 256.0).round() as i64;
        Self(wrapped.rem_euclid(256) as u8 as i8)
    }

    /// Returns the angle as radians clockwise from north, in `[0, 2*pi)`.
    #[must_use]
    pub fn to_radians_cw(self) -> f64 {
        let raw = u8::from_ne_bytes(self.0.to_ne_bytes());
        f64::from(raw) / 256.0 * std::f64::consts::TAU
    }

    /// The angle rotated by half a turn (mod 256): the bearing this edge
    /// direction would have if you were walking the opposite way.
    #[must_use]
    pub const fn opposite(self) -> Self {
        Self(self.0.wrapping_add(-128))
    }
}

/// Returns a bounding box centered upon `center` containing a circle with
/// radius `radius` meters, as `(north, east, south, west)`.
pub fn bbox_with_center<F: CoordFloat + FromPrimitive>(
    center: Point<F>,
    radius: F,
) -> (F, F, F, F) {
    let north = Haversine.destination(center, F::zero(), radius).y();
    let east = Haversine
        .destination(center, F::from_i64(90).unwrap(), radius)
        .x();
    let south = Haversine
        .destination(center, F::from_i64(180).unwrap(), radius)
        .y();
    let west = Haversine
        .destination(center, F::from_i64(270).unwrap(), radius)
        .x();
    (north, east, south, west)
}

/// Fast squared-distance approximation, valid for short distances (up to a
/// few kilometers) around a fixed center; avoids repeated trigonometry when
/// scanning many candidate points/edges against one query point.
pub struct DistanceApproximator {
    center: Coord<f64>,
    meters_per_lon_degree: f64,
    meters_per_lat_degree: f64,
}

const METERS_PER_DEGREE_LAT: f64 = 111_132.954;

impl DistanceApproximator {
    #[must_use]
    pub fn new(center: Coord<f64>) -> Self {
        let lon_scale = center.y.to_radians().cos();
        Self {
            center,
            meters_per_lon_degree: lon_scale * METERS_PER_DEGREE_LAT,
            meters_per_lat_degree: METERS_PER_DEGREE_LAT,
        }
    }

    /// An over-estimate of the squared distance in meters to `other`.
    #[must_use]
    pub fn distance_squared(&self, other: Coord<f64>) -> f64 {
        let dlat = (other.y - self.center.y) * self.meters_per_lat_degree;
        let dlon = (other.x - self.center.x) * self.meters_per_lon_degree;
        dlat.mul_add(dlat, dlon * dlon)
    }

    /// Projects `other` into a locally-flat `(east_meters, north_meters)`
    /// plane centered on this approximator's center. Valid for the same
    /// short-range radius as [`Self::distance_squared`]; used to do
    /// perpendicular-projection geometry in ordinary Euclidean arithmetic
    /// instead of spherical trig.
    #[must_use]
    pub fn to_local_meters(&self, other: Coord<f64>) -> (f64, f64) {
        let east = (other.x - self.center.x) * self.meters_per_lon_degree;
        let north = (other.y - self.center.y) * self.meters_per_lat_degree;
        (east, north)
    }

    /// Inverse of [`Self::to_local_meters`].
    #[must_use]
    pub fn from_local_meters(&self, east: f64, north: f64) -> Coord<f64> {
        coord! {
            x: self.center.x + east / self.meters_per_lon_degree,
            y: self.center.y + north / self.meters_per_lat_degree,
        }
    }
}

/// Computes the envelope (bounding box) of a poly-line, including its
/// endpoints. Returns `None` for an empty slice.
#[must_use]
pub fn envelope_of(points: &[Coord<f64>]) -> Option<Rect<f64>> {
    let mut iter = points.iter();
    let first = *iter.next()?;
    let mut min = first;
    let mut max = first;
    for p in iter {
        min.x = min.x.min(p.x);
        min.y = min.y.min(p.y);
        max.x = max.x.max(p.x);
        max.y = max.y.max(p.y);
    }
    Some(Rect::new(min, max))
}

#[must_use]
pub fn coord_from_fixed(lat: FixedDegrees, lon: FixedDegrees) -> Coord<f64> {
    coord! { x: lon.to_degrees(), y: lat.to_degrees() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn fixed_degrees_round_trip_to_micro_precision() {
        let original = 41.0112_928_3_f64;
        let fixed = FixedDegrees::from_degrees(original);
        assert!((fixed.to_degrees() - original).abs() < 1e-6);
    }

    #[test]
    fn opposite_brads_is_involutive() {
        for raw in i8::MIN..=i8::MAX {
            let b = Brads(raw);
            assert_eq!(b.opposite().opposite(), b);
        }
    }

    #[test]
    fn opposite_brads_is_half_turn() {
        let b = Brads::from_radians_cw(0.0);
        let opp = b.opposite();
        // 0 radians -> 180 degrees is brads value 128, stored as -128 (i8 wrap).
        assert_eq!(opp.0, i8::MIN);
    }

    proptest! {
        #[test]
        fn distance_approximator_overestimates_haversine(
            lat in -80.0f64..80.0, lon in -170.0f64..170.0,
            dlat in -0.01f64..0.01, dlon in -0.01f64..0.01,
        ) {
            use geo::Distance;
            let a = coord! {x: lon, y: lat};
            let b = coord! {x: lon + dlon, y: lat + dlat};
            let approx = DistanceApproximator::new(a);
            let sq_dist = approx.distance_squared(b);
            let haversine = Haversine.distance(Point::from(a), Point::from(b));
            prop_assert!(sq_dist.sqrt() + 1.0 >= haversine);
        }
    }
}
