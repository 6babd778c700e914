//! The car turn-cost table (spec.md §4.4).
//!
//! Buckets the angle between the previous edge's `outAngle` and the new
//! edge's `inAngle` into straight/turn/u-turn, the way the teacher's
//! `valinor-sif::costing` bucket-evaluates bearing deltas for intersection
//! penalties, but fixed to the four ranges and drive-side flip spec.md's
//! table spells out rather than a tunable curve.

use std::f64::consts::PI;

use street_graph::Brads;

use crate::request::DriveSide;

const STRAIGHT_END: f64 = 0.15 * PI;
const LEFT_RIGHT_END: f64 = 0.85 * PI;
const U_TURN_END: f64 = 1.15 * PI;
const RIGHT_LEFT_END: f64 = 1.85 * PI;

const STRAIGHT_COST_S: f64 = 0.0;
const MINOR_TURN_COST_S: f64 = 10.0;
const MAJOR_TURN_COST_S: f64 = 30.0;
const U_TURN_COST_S: f64 = 90.0;

/// Seconds of turn cost for a car moving from `prev_out_angle` to
/// `this_in_angle`. `0.0` for everything but cars (spec.md: "for non-car
/// modes, turn cost is 0") is the caller's responsibility — this function
/// always applies the car table.
#[must_use]
pub fn car_turn_cost_seconds(prev_out_angle: Brads, this_in_angle: Brads, drive_side: DriveSide) -> f64 {
    let delta = (this_in_angle.to_radians_cw() - prev_out_angle.to_radians_cw()).rem_euclid(std::f64::consts::TAU);

    if !(STRAIGHT_END..RIGHT_LEFT_END).contains(&delta) {
        STRAIGHT_COST_S
    } else if delta < LEFT_RIGHT_END {
        // [0.15pi, 0.85pi): left under drive-on-right, right under drive-on-left.
        match drive_side {
            DriveSide::Right => MAJOR_TURN_COST_S,
            DriveSide::Left => MINOR_TURN_COST_S,
        }
    } else if delta < U_TURN_END {
        U_TURN_COST_S
    } else {
        // [1.15pi, 1.85pi): right under drive-on-right, left under drive-on-left.
        match drive_side {
            DriveSide::Right => MINOR_TURN_COST_S,
            DriveSide::Left => MAJOR_TURN_COST_S,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn straight_ahead_costs_nothing() {
        let cost = car_turn_cost_seconds(Brads::from_radians_cw(0.0), Brads::from_radians_cw(0.0), DriveSide::Right);
        assert_eq!(cost, STRAIGHT_COST_S);
    }

    #[test]
    fn quarter_turn_is_a_major_turn_under_drive_on_right() {
        // outAngle = 0, inAngle = 90deg -> spec.md scenario 2: cost 30s.
        let prev_out = Brads::from_radians_cw(0.0);
        let this_in = Brads::from_radians_cw(PI / 2.0);
        assert_eq!(car_turn_cost_seconds(prev_out, this_in, DriveSide::Right), MAJOR_TURN_COST_S);
    }

    #[test]
    fn quarter_turn_is_a_minor_turn_under_drive_on_left() {
        let prev_out = Brads::from_radians_cw(0.0);
        let this_in = Brads::from_radians_cw(PI / 2.0);
        assert_eq!(car_turn_cost_seconds(prev_out, this_in, DriveSide::Left), MINOR_TURN_COST_S);
    }

    #[test]
    fn near_reversal_is_a_u_turn() {
        let prev_out = Brads::from_radians_cw(0.0);
        let this_in = Brads::from_radians_cw(PI);
        assert_eq!(car_turn_cost_seconds(prev_out, this_in, DriveSide::Right), U_TURN_COST_S);
    }

    #[test]
    fn three_quarter_turn_is_a_minor_turn_under_drive_on_right() {
        let prev_out = Brads::from_radians_cw(0.0);
        let this_in = Brads::from_radians_cw(3.0 * PI / 2.0);
        assert_eq!(car_turn_cost_seconds(prev_out, this_in, DriveSide::Right), MINOR_TURN_COST_S);
    }
}
