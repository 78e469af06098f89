//! Geometry adapter: transforms, bounding boxes and normalized positions

pub mod normalize;
pub mod transform;
pub mod types;

pub use normalize::{normalized_size, to_normalized_position, Anchor};
pub use transform::Transform;
pub use types::{BoundingBox, NormalizedPoint, NormalizedSize, Point};
