//! Metaball simulation
//!
//! Pure CPU state with no rendering or platform dependencies:
//! - Seeded RNG only
//! - Stable source order (the GPU uniform array follows it)
//! - One fixed tick per display frame

pub mod field;
pub mod potential;
pub mod source;

pub use field::{Field, Snapshot, source_count};
pub use potential::{is_inside, potential, shade};
pub use source::Source;
