use crate::error::Result;
use crate::math::AABB;
use crate::model::VertexData;
use crate::scene_graph::WorldTransform;

/// World-space bounds of `vertex_data` placed with `transform`. Empty data gives the null box.
pub fn calculate_bounds(vertex_data: &VertexData, transform: &WorldTransform) -> Result<AABB> {
    let positions = vertex_data.positions()?;
    Ok(AABB::from_points(
        positions.map(|position| transform.transform_point(position)),
    ))
}
