pub mod buffers;
pub mod camera;
pub mod error;
pub mod material_manager;
pub mod math;
pub mod mesh_manager;
pub mod model;
pub mod render_queue;
pub mod scene_graph;
pub mod static_geometry;

pub use error::{Error, Result};
pub use static_geometry::{BuildStats, StaticGeometry, StaticGeometryConfig};
