use anyhow::Context;
use glam::{Quat, Vec2, Vec3};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

use staticgeom::buffers::HostBufferManager;
use staticgeom::camera::Camera;
use staticgeom::material_manager::MaterialManager;
use staticgeom::mesh_manager::{MeshId, MeshManager};
use staticgeom::model::{IndexData, Mesh, SubMesh, Vertex, VertexData};
use staticgeom::render_queue::RenderQueue;
use staticgeom::scene_graph::{Entity, Light, MovableObject, Object3D, Scene};
use staticgeom::{StaticGeometry, StaticGeometryConfig};

const ROCK_COUNT: usize = 2_000;
const FIELD_SIZE: f32 = 1_500.0;

/// A cube with per-face normals and a half-resolution LOD that drops the bottom face.
fn rock_mesh() -> Mesh {
    let faces = [
        (Vec3::X, Vec3::Y),
        (Vec3::NEG_X, Vec3::Y),
        (Vec3::Y, Vec3::Z),
        (Vec3::NEG_Y, Vec3::Z),
        (Vec3::Z, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y),
    ];

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (normal, up) in faces {
        let right = up.cross(normal);
        let base = vertices.len() as u16;

        for (u, v) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let position = normal + right * u + up * v;
            vertices.push(Vertex::new(position, normal, Vec2::new(u, v) * 0.5 + 0.5));
        }

        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    let lod_indices: Vec<u16> = indices
        .chunks(6)
        .enumerate()
        .filter(|(face, _)| *face != 3)
        .flat_map(|(_, face)| face.iter().copied())
        .collect();

    Mesh::new("Rock")
        .with_submesh(
            SubMesh::new(
                "Rock",
                VertexData::from_vertices(&vertices),
                IndexData::U16(indices),
            )
            .with_lod_indices(IndexData::U16(lod_indices)),
        )
        .with_lod_level(300.0)
}

fn scatter_rocks(
    scene: &mut Scene,
    meshes: &MeshManager,
    rock: MeshId,
    rng: &mut impl Rng,
) -> anyhow::Result<()> {
    for i in 0..ROCK_COUNT {
        let mut entity = Entity::new(format!("Rock {i}"), rock, meshes)?;
        if rng.gen_bool(0.3) {
            entity.set_material_name("MossyRock");
        }

        let mut node = Object3D::new(format!("Rock node {i}"));
        node.transform.set_transform(
            Vec3::new(
                rng.gen_range(-FIELD_SIZE..FIELD_SIZE),
                0.0,
                rng.gen_range(-FIELD_SIZE..FIELD_SIZE),
            ),
            Quat::from_rotation_y(rng.gen_range(0.0..std::f32::consts::TAU)),
            Vec3::splat(rng.gen_range(0.5..4.0)),
        );
        node.attach(MovableObject::Entity(entity));
        scene.add_object(node);
    }

    Ok(())
}

pub fn run() -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);

    let mut meshes = MeshManager::new();
    let rock = meshes.add_mesh(rock_mesh());

    let mut materials = MaterialManager::new();
    materials.add_named("Rock");
    materials.add_named("MossyRock");

    let mut scene = Scene::new();
    scatter_rocks(&mut scene, &meshes, rock, &mut rng)?;

    let mut lamp = Object3D::new("Lamp");
    lamp.transform.set_translation(Vec3::new(0.0, 50.0, 0.0));
    lamp.attach(MovableObject::Light(Light {
        name: "Lamp".to_string(),
        range: 400.0,
    }));
    scene.add_object(lamp);

    let config = StaticGeometryConfig {
        region_dimensions: Vec3::new(500.0, 500.0, 500.0),
        upper_distance: 2_000.0,
        ..Default::default()
    };
    let mut geometry = StaticGeometry::with_config("Rocks", config)?;

    let nodes: Vec<_> = scene
        .objects
        .iter()
        .filter(|(_, object)| object.entities().next().is_some())
        .map(|(id, _)| id)
        .collect();
    for node in nodes {
        geometry
            .add_scene_node(&meshes, &scene, node)
            .context("Failed to queue rock")?;
    }

    let mut buffers = HostBufferManager::new();
    geometry
        .build(&materials, &mut buffers)
        .context("Failed to build static geometry")?;

    let stats = geometry.stats();
    info!(
        "{} submeshes baked into {} regions, {} LOD buckets, {} material buckets, {} geometry buckets ({} bytes of buffers)",
        geometry.queued_count(),
        stats.regions,
        stats.lod_buckets,
        stats.material_buckets,
        stats.geometry_buckets,
        buffers.bytes_in_use()
    );

    let camera = Camera {
        eye: Vec3::new(0.0, 200.0, -1_200.0),
        target: Vec3::ZERO,
        ..Default::default()
    };
    let lights = scene.lights();

    let mut queue = RenderQueue::new();
    geometry.find_visible_objects(&camera, 16.0 / 9.0, &lights, &mut queue);
    queue.sort_by_material();

    info!(
        "{} draw calls, {} indices submitted",
        queue.len(),
        queue.total_index_count()
    );
    drop(queue);

    for region in geometry.regions() {
        info!(
            "Region {} LOD {} at {:.0} units, {} lights",
            region.name(),
            region.current_lod(),
            region.camera_distance_squared().sqrt(),
            region.lights().len()
        );
    }

    geometry.destroy(&mut buffers);
    Ok(())
}
