use glam::{IVec3, Vec3};
use thiserror::Error;

use crate::model::{VertexFormat, VertexSemantic};

#[derive(Debug, Error)]
pub enum Error {
    #[error("point {point} maps to cell {cell} which is outside the static geometry grid")]
    PointOutOfBounds { point: Vec3, cell: IVec3 },

    #[error("region dimensions must be positive and finite, got {0}")]
    InvalidRegionDimensions(Vec3),

    #[error("geometry bucket capacity must be between 3 and {max} vertices, got {requested}")]
    InvalidBucketCapacity { requested: usize, max: usize },

    #[error("vertex layout has no {0:?} element")]
    MissingElement(VertexSemantic),

    #[error("{semantic:?} element uses unsupported format {format:?}")]
    UnsupportedFormat {
        semantic: VertexSemantic,
        format: VertexFormat,
    },

    #[error("vertex data is {len} bytes, which is not a multiple of the {stride} byte stride")]
    MisalignedVertexData { len: usize, stride: usize },

    #[error("{semantic:?} element at offset {offset} with {size} bytes does not fit the {stride} byte stride")]
    ElementOutsideStride {
        semantic: VertexSemantic,
        offset: usize,
        size: usize,
        stride: usize,
    },

    #[error("index {index} is out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    #[error("index count {count} is not a multiple of {per_primitive}")]
    IncompletePrimitive { count: usize, per_primitive: usize },

    #[error("submesh {submesh} of mesh '{mesh}' has no vertex data")]
    MissingVertexData { mesh: String, submesh: usize },

    #[error("unknown mesh")]
    UnknownMesh,

    #[error("unknown scene object")]
    UnknownObject,

    #[error("material '{0}' not found")]
    MaterialNotFound(String),

    #[error("buffer allocation failed: {0}")]
    BufferAllocation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
