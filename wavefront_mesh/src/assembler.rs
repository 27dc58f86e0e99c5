//! Turns an accumulated `ObjState` into renderer-facing mesh units.

use crate::{mtl::Material, obj::ObjState};

use std::sync::Arc;

use itertools::Itertools;
use log::debug;
use ultraviolet::{Vec2, Vec3};

/// One corner of a triangle, indexing the shared buffers of a `MeshUnit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FaceVertex {
    pub vertex: usize,
    pub normal: usize,
    pub texcoord: usize,
}

/// A triangulated, single-material piece of a group.
///
/// The position/normal/texcoord buffers are shared by every unit of the model.
/// Normals and texcoords contain one zero entry when the file declared none,
/// so the sentinel index 0 is always valid.
#[derive(Debug, Clone)]
pub struct MeshUnit {
    positions: Arc<[Vec3]>,
    normals: Arc<[Vec3]>,
    texcoords: Arc<[Vec2]>,
    faces: Box<[usize]>,
    material: Arc<Material>,
    ambient_color: Option<Vec3>,
}

impl MeshUnit {
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    /// Returns the flat `(vertex, normal, texcoord)` index stream.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    /// Iterates the index stream as triples.
    pub fn face_vertices(&self) -> impl Iterator<Item = FaceVertex> + '_ {
        self.faces
            .iter()
            .copied()
            .tuples()
            .map(|(vertex, normal, texcoord)| FaceVertex {
                vertex,
                normal,
                texcoord,
            })
    }

    pub fn triangle_count(&self) -> usize {
        self.faces.len() / 9
    }

    pub fn material(&self) -> &Material {
        &self.material
    }

    pub fn ambient_color(&self) -> Option<Vec3> {
        self.ambient_color
    }
}

/// The mesh units of one OBJ group.
#[derive(Debug, Clone)]
pub struct MeshGroup {
    name: String,
    meshes: Box<[MeshUnit]>,
}

impl MeshGroup {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn meshes(&self) -> &[MeshUnit] {
        &self.meshes
    }
}

/// Every group of an OBJ file, ready to be handed to a renderer.
#[derive(Debug, Clone)]
pub struct AssembledModel {
    positions: Arc<[Vec3]>,
    groups: Box<[MeshGroup]>,
}

impl AssembledModel {
    pub fn groups(&self) -> &[MeshGroup] {
        &self.groups
    }

    /// Returns the shared position buffer.
    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    /// Multiplies every position by `factor`.
    pub fn scale_positions(&mut self, factor: f32) {
        let scaled: Arc<[Vec3]> = self.positions.iter().map(|&p| p * factor).collect();
        for mesh in self.groups.iter_mut().flat_map(|g| g.meshes.iter_mut()) {
            mesh.positions = scaled.clone();
        }
        self.positions = scaled;
    }
}

/// Builds one `MeshUnit` per non-empty subgroup.
///
/// Empty subgroups (typically the initial one of a group followed by
/// `usemtl`) are skipped. The implicit default group is dropped when it ends
/// up without meshes; explicit groups are always kept.
pub fn assemble(state: ObjState) -> AssembledModel {
    let (vertices, mut normals, mut texcoords, groups) = state.into_parts();
    if normals.is_empty() {
        normals.push(Vec3::zero());
    }
    if texcoords.is_empty() {
        texcoords.push(Vec2::zero());
    }

    let positions: Arc<[Vec3]> = vertices.into();
    let normals: Arc<[Vec3]> = normals.into();
    let texcoords: Arc<[Vec2]> = texcoords.into();

    let mut mesh_groups = vec![];
    for group in groups {
        let meshes: Vec<_> = group
            .subgroups()
            .iter()
            .filter(|subgroup| !subgroup.faces().is_empty())
            .map(|subgroup| MeshUnit {
                positions: positions.clone(),
                normals: normals.clone(),
                texcoords: texcoords.clone(),
                faces: subgroup.faces().into(),
                material: subgroup.material().clone(),
                ambient_color: subgroup.ambient_color(),
            })
            .collect();

        if meshes.is_empty() && group.is_implicit() {
            debug!("Dropping unused implicit group");
            continue;
        }
        debug!("Group {}: {} meshes", group.name(), meshes.len());
        mesh_groups.push(MeshGroup {
            name: group.name().to_owned(),
            meshes: meshes.into_boxed_slice(),
        });
    }

    AssembledModel {
        positions,
        groups: mesh_groups.into_boxed_slice(),
    }
}
