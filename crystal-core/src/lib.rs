//! Core 2-D crystal growth and crystallization library.
//!
//! Main components:
//! - [`particle`] — the free particle pool and boundary emitters.
//! - [`frontier`] — frontier slots, particle capture and the lattice.
//! - [`rebuild`] — perimeter reconstruction from a finished lattice.
//! - [`geometry`] — polygon helpers shared by the other modules.
//! - [`persist`] — run-scoped persistence of completed shapes.
//! - [`config`] — tuning knobs for the pool, engine and rebuild.
//! - [`types`] — shared type aliases and IDs.

pub mod config;
pub mod frontier;
pub mod geometry;
pub mod particle;
pub mod persist;
pub mod rebuild;
pub mod types;
