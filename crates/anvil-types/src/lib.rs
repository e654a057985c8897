pub mod body;
pub mod feature;
pub mod geometry;
pub mod mesh;
pub mod sketch;

pub use body::*;
pub use feature::*;
pub use geometry::*;
pub use mesh::*;
pub use sketch::*;
