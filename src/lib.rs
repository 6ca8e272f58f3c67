//! Planar point location via a randomized incremental trapezoidal map.
//!
//! Given a set of pairwise non-crossing line segments, [`TrapMap`]
//! decomposes the plane into trapezoids and builds a search DAG over
//! them, answering "which segment is immediately above / below this
//! point" queries in expected O(log n) time after expected
//! O(n log n) construction.
//!
//! This is [Seidel]'s randomized incremental construction: segments
//! are inserted one at a time in random order, each insertion locating
//! the trapezoids it crosses through the DAG built so far and
//! rewriting them locally. The randomness source is injected, so
//! builds are reproducible with a seeded generator.
//!
//! # Usage
//!
//! ```rust
//! use geo::{Coordinate, Line};
//! use geo_traploc::TrapMap;
//!
//! let segments = vec![
//!     Line::from([(-50., 20.), (50., 20.)]),
//!     Line::from([(-50., -20.), (50., -20.)]),
//! ];
//! let map = TrapMap::build(segments, &mut rand::thread_rng());
//!
//! let region = map.locate(Coordinate { x: 0., y: 0. });
//! assert_eq!(region.top(), Line::from([(-50., 20.), (50., 20.)]));
//! assert_eq!(region.bottom(), Line::from([(-50., -20.), (50., -20.)]));
//! ```
//!
//! The inputs must be in general position (no crossings, overlaps or
//! shared end-points) and lie strictly inside the bounding box of
//! [`Params`]; see [`TrapMap`] for the precise contract.
//!
//! [Seidel]: //en.wikipedia.org/wiki/Point_location#Trapezoidal_decomposition
mod dag;
mod segment;
mod trapezoid;

mod map;
pub use map::{Params, Region, TrapMap};
pub use segment::Segment;
