//! Enum-set based bitflags for vertices and directed edges.
//!
//! Modeled on the teacher's `Access` (an `EnumSetType` with a compact repr
//! used as a permission bitset): every flag group below is a small closed
//! set of bits rather than a free-form integer, so invalid combinations are
//! unrepresentable and `EnumSet` gives us set algebra for free.

use enumset::{EnumSet, EnumSetType};

/// Per-vertex attributes that affect routing or snapping.
#[derive(EnumSetType, Debug)]
#[cfg_attr(feature = "serde", enumset(serialize_as_list))]
pub enum VertexFlag {
    TrafficSignal,
    ParkAndRide,
    BikeShare,
}

/// A travel mode, used both as a single selector (`StreetMode::Walk`) and,
/// via `EnumSet<StreetMode>`, as a small permission set.
#[derive(EnumSetType, Debug)]
#[cfg_attr(feature = "serde", enumset(serialize_as_list))]
pub enum StreetMode {
    Walk,
    Bicycle,
    Car,
}

/// Per-direction edge attributes: classification bits, mode permissions, and
/// the (mutually exclusive) bike level-of-traffic-stress rating, all packed
/// into one `EnumSet` the way the teacher packs edge-use and access bits
/// into one `DirectedEdge` bitfield.
#[derive(EnumSetType, Debug)]
#[cfg_attr(feature = "serde", enumset(serialize_as_list))]
pub enum EdgeFlag {
    // Classification.
    BikePath,
    Sidewalk,
    Crossing,
    Roundabout,
    Elevator,
    Stairs,
    Platform,
    Link,
    NoThruTraffic,
    NoThruTrafficPedestrian,

    // Per-direction mode permission.
    AllowsPedestrian,
    AllowsBike,
    AllowsCar,
    AllowsWheelchair,
    AllowsLimitedWheelchair,

    // Bike level of traffic stress; mutually exclusive, see `lts()`.
    LtsExplicit,
    Lts1,
    Lts2,
    Lts3,
    Lts4,
}

const LTS_BITS: EnumSet<EdgeFlag> = enumset::enum_set!(
    EdgeFlag::LtsExplicit | EdgeFlag::Lts1 | EdgeFlag::Lts2 | EdgeFlag::Lts3 | EdgeFlag::Lts4
);

impl EdgeFlag {
    /// Reads the LTS rating out of a flag set, if one of the LTS bits is
    /// set. `LtsExplicit` means a rating was read directly from source data
    /// rather than inferred, and carries no numeric level of its own.
    #[must_use]
    pub fn lts(flags: EnumSet<EdgeFlag>) -> Option<u8> {
        if flags.contains(EdgeFlag::Lts1) {
            Some(1)
        } else if flags.contains(EdgeFlag::Lts2) {
            Some(2)
        } else if flags.contains(EdgeFlag::Lts3) {
            Some(3)
        } else if flags.contains(EdgeFlag::Lts4) {
            Some(4)
        } else {
            None
        }
    }

    /// Sets `lts` as the only LTS bit in `flags`, clearing any previously
    /// set LTS level (the levels are mutually exclusive).
    pub fn set_lts(flags: &mut EnumSet<EdgeFlag>, bit: EdgeFlag) {
        debug_assert!(LTS_BITS.contains(bit), "set_lts called with a non-LTS flag");
        *flags &= !LTS_BITS;
        flags.insert(bit);
    }

    /// Permission bit corresponding to a travel mode.
    #[must_use]
    pub const fn allows_for_mode(mode: StreetMode) -> Self {
        match mode {
            StreetMode::Walk => EdgeFlag::AllowsPedestrian,
            StreetMode::Bicycle => EdgeFlag::AllowsBike,
            StreetMode::Car => EdgeFlag::AllowsCar,
        }
    }
}

/// Functional road classification, ordered from highest-speed/least-local to
/// most-local, matching the teacher's `RoadClass` ordering but trimmed to the
/// five classes this router distinguishes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum StreetClass {
    Motorway = 0,
    Primary = 1,
    Secondary = 2,
    Local = 3,
    Path = 4,
}

impl StreetClass {
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Motorway),
            1 => Some(Self::Primary),
            2 => Some(Self::Secondary),
            3 => Some(Self::Local),
            4 => Some(Self::Path),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lts_bits_are_mutually_exclusive_under_set_lts() {
        let mut flags: EnumSet<EdgeFlag> = EnumSet::empty();
        EdgeFlag::set_lts(&mut flags, EdgeFlag::Lts2);
        assert_eq!(EdgeFlag::lts(flags), Some(2));
        EdgeFlag::set_lts(&mut flags, EdgeFlag::Lts4);
        assert_eq!(EdgeFlag::lts(flags), Some(4));
        assert!(!flags.contains(EdgeFlag::Lts2));
    }

    #[test]
    fn set_lts_preserves_non_lts_bits() {
        let mut flags: EnumSet<EdgeFlag> = EnumSet::only(EdgeFlag::AllowsBike);
        EdgeFlag::set_lts(&mut flags, EdgeFlag::Lts1);
        assert!(flags.contains(EdgeFlag::AllowsBike));
        assert_eq!(EdgeFlag::lts(flags), Some(1));
    }

    #[test]
    fn street_class_round_trips_through_u8() {
        for raw in 0..5u8 {
            let class = StreetClass::from_u8(raw).unwrap();
            assert_eq!(class as u8, raw);
        }
        assert!(StreetClass::from_u8(5).is_none());
    }

    #[test]
    fn allows_for_mode_matches_street_mode() {
        assert_eq!(EdgeFlag::allows_for_mode(StreetMode::Walk), EdgeFlag::AllowsPedestrian);
        assert_eq!(EdgeFlag::allows_for_mode(StreetMode::Bicycle), EdgeFlag::AllowsBike);
        assert_eq!(EdgeFlag::allows_for_mode(StreetMode::Car), EdgeFlag::AllowsCar);
    }
}
