//! Vector distance and exhaustive nearest-neighbour search

mod brute_force;
mod distance;

pub use brute_force::nearest;
pub use distance::{compute_distance, dot_product};
