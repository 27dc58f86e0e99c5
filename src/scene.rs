//! A plain scene tree built from imported meshes.

use std::fmt::{Display, Formatter, Result as FmtResult};

use ultraviolet::Vec3;
use wavefront_mesh::{MeshUnit, SceneBuilder};

/// Represents an ambient light.
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientLight {
    /// Light color
    pub color: Vec3,
}

/// A renderable mesh with its material applied.
#[derive(Debug, Clone)]
pub struct MeshView {
    pub mesh: MeshUnit,

    /// Always `false` for imported meshes.
    pub cull_back_faces: bool,
}

/// Represents a node of the scene tree.
#[derive(Debug, Clone)]
pub enum SceneNode {
    Group {
        name: Option<String>,
        children: Vec<SceneNode>,
    },
    Mesh(MeshView),
    Light(AmbientLight),
}

impl SceneNode {
    pub fn children(&self) -> &[SceneNode] {
        match self {
            SceneNode::Group { children, .. } => children,
            _ => &[],
        }
    }

    /// Visits every mesh view under this node, depth first.
    pub fn visit_meshes<'a>(&'a self, visitor: &mut impl FnMut(&'a MeshView)) {
        match self {
            SceneNode::Mesh(view) => visitor(view),
            SceneNode::Group { children, .. } => {
                for child in children {
                    child.visit_meshes(visitor);
                }
            }
            SceneNode::Light(_) => (),
        }
    }

    fn write_indented(&self, f: &mut Formatter<'_>, depth: usize) -> FmtResult {
        let indent = "  ".repeat(depth);
        match self {
            SceneNode::Group { name, children } => {
                writeln!(f, "{}+ {}", indent, name.as_deref().unwrap_or("(unnamed)"))?;
                for child in children {
                    child.write_indented(f, depth + 1)?;
                }
                Ok(())
            }
            SceneNode::Mesh(view) => writeln!(
                f,
                "{}- mesh: {} triangles, material {}, {}",
                indent,
                view.mesh.triangle_count(),
                view.mesh.material().name(),
                if view.cull_back_faces {
                    "back faces culled"
                } else {
                    "double-sided"
                }
            ),
            SceneNode::Light(light) => writeln!(
                f,
                "{}- ambient light ({:.3}, {:.3}, {:.3})",
                indent, light.color.x, light.color.y, light.color.z
            ),
        }
    }
}

impl Display for SceneNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        self.write_indented(f, 0)
    }
}

/// Builds `SceneNode` trees.
#[derive(Debug, Default)]
pub struct SceneTreeBuilder {
    root_name: Option<String>,
}

impl SceneTreeBuilder {
    /// Creates a builder whose root node carries `root_name`.
    pub fn new(root_name: impl Into<String>) -> SceneTreeBuilder {
        SceneTreeBuilder {
            root_name: Some(root_name.into()),
        }
    }
}

impl SceneBuilder for SceneTreeBuilder {
    type Node = SceneNode;

    fn mesh_node(&mut self, mesh: &MeshUnit) -> SceneNode {
        let mut children = vec![SceneNode::Mesh(MeshView {
            mesh: mesh.clone(),
            cull_back_faces: false,
        })];
        if let Some(color) = mesh.ambient_color() {
            children.push(SceneNode::Light(AmbientLight { color }));
        }

        SceneNode::Group {
            name: None,
            children,
        }
    }

    fn group_node(&mut self, name: &str, children: Vec<SceneNode>) -> SceneNode {
        SceneNode::Group {
            name: Some(name.to_owned()),
            children,
        }
    }

    fn root_node(&mut self, children: Vec<SceneNode>) -> SceneNode {
        SceneNode::Group {
            name: self.root_name.clone(),
            children,
        }
    }
}
