//! # Layout Rings
//!
//! Initial rendering positions. Nodes are spread on rings around their
//! parent: operations and deployments around the contract, fields around
//! their operation.
//!
//! Positions are hints for a renderer and nothing else. No other component
//! reads them.

#![allow(clippy::float_arithmetic)]

use crate::types::LayoutHint;
use std::f64::consts::TAU;

/// Position of item `index` out of `count` on a ring of `radius` centred on
/// `center`, at evenly spaced angles starting from the positive x axis.
#[must_use]
pub fn ring_position(center: LayoutHint, index: usize, count: usize, radius: f64) -> LayoutHint {
    if count == 0 {
        return LayoutHint::at(center.x, center.y);
    }
    let theta = TAU * index as f64 / count as f64;
    LayoutHint::at(
        center.x + theta.cos() * radius,
        center.y + theta.sin() * radius,
    )
}

/// Pinned origin used for the contract node.
#[must_use]
pub const fn origin() -> LayoutHint {
    LayoutHint::pinned(0.0, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn first_item_sits_on_the_x_axis() {
        let p = ring_position(origin(), 0, 4, 100.0);
        assert!(close(p.x, 100.0));
        assert!(close(p.y, 0.0));
        assert!(!p.fixed);
    }

    #[test]
    fn quarter_turn_for_second_of_four() {
        let p = ring_position(origin(), 1, 4, 100.0);
        assert!(close(p.x, 0.0));
        assert!(close(p.y, 100.0));
    }

    #[test]
    fn offsets_by_center() {
        let p = ring_position(LayoutHint::at(10.0, -5.0), 0, 1, 2.0);
        assert!(close(p.x, 12.0));
        assert!(close(p.y, -5.0));
    }

    #[test]
    fn empty_ring_collapses_to_center() {
        let p = ring_position(LayoutHint::at(3.0, 4.0), 0, 0, 50.0);
        assert!(close(p.x, 3.0));
        assert!(close(p.y, 4.0));
    }
}
