//! The import entry point and the rendering collaborator interface.

use crate::{
    assembler::{assemble, AssembledModel, MeshUnit},
    obj::Parser,
    ImportError,
};

use std::{fs::File, io::prelude::*};

use log::info;

/// Uniform scale applied to every vertex position before the meshes are handed over.
pub const MODEL_SCALE: f32 = 0.05;

/// Materializes scene nodes from assembled meshes.
///
/// An implementation is expected to make one renderable node per mesh unit
/// (material applied, back-face culling disabled, plus an ambient light when
/// the unit carries an ambient color), one node per group, and one root.
pub trait SceneBuilder {
    type Node;

    fn mesh_node(&mut self, mesh: &MeshUnit) -> Self::Node;

    fn group_node(&mut self, name: &str, children: Vec<Self::Node>) -> Self::Node;

    fn root_node(&mut self, children: Vec<Self::Node>) -> Self::Node;
}

/// Loads a model file into a scene built by a `SceneBuilder`.
pub trait Importer {
    fn load<B: SceneBuilder>(&mut self, location: &str, builder: &mut B)
        -> Result<B::Node, ImportError>;
}

/// Imports Wavefront OBJ files.
pub struct ObjImporter<R> {
    parser: Parser<R>,
}

impl ObjImporter<File> {
    /// Creates an importer which treats locations as filesystem paths.
    pub fn from_filesystem() -> ObjImporter<File> {
        ObjImporter::new(|location: &str| File::open(location))
    }
}

impl<R: Read> ObjImporter<R> {
    /// Creates an importer reading OBJ/MTL streams from `open_function`.
    pub fn new(
        open_function: impl FnMut(&str) -> std::io::Result<R> + Send + 'static,
    ) -> ObjImporter<R> {
        ObjImporter {
            parser: Parser::new(open_function),
        }
    }

    /// Parses and assembles the model at `location`, with positions already scaled.
    pub fn read_model(&mut self, location: &str) -> Result<AssembledModel, ImportError> {
        let state = self
            .parser
            .parse(location)
            .map_err(|cause| ImportError::new(location, cause))?;

        let mut model = assemble(state);
        model.scale_positions(MODEL_SCALE);
        Ok(model)
    }
}

impl<R: Read> Importer for ObjImporter<R> {
    fn load<B: SceneBuilder>(
        &mut self,
        location: &str,
        builder: &mut B,
    ) -> Result<B::Node, ImportError> {
        let model = self.read_model(location)?;

        let mut group_nodes = Vec::with_capacity(model.groups().len());
        for group in model.groups() {
            let mesh_nodes = group
                .meshes()
                .iter()
                .map(|mesh| builder.mesh_node(mesh))
                .collect();
            group_nodes.push(builder.group_node(group.name(), mesh_nodes));
        }

        info!("Loaded {} ({} groups)", location, group_nodes.len());
        Ok(builder.root_node(group_nodes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorCause, ParseErrorKind};

    use std::{collections::HashMap, io::Cursor};

    use approx::assert_relative_eq;
    use ultraviolet::Vec3;

    /// Records what the importer hands over.
    #[derive(Debug, Clone, PartialEq)]
    enum Node {
        Mesh {
            material: String,
            diffuse: Vec3,
            triangles: usize,
            first_position: Vec3,
            ambient: Option<Vec3>,
        },
        Group(String, Vec<Node>),
        Root(Vec<Node>),
    }

    struct Recorder;

    impl SceneBuilder for Recorder {
        type Node = Node;

        fn mesh_node(&mut self, mesh: &MeshUnit) -> Node {
            Node::Mesh {
                material: mesh.material().name().to_owned(),
                diffuse: mesh.material().diffuse_color(),
                triangles: mesh.triangle_count(),
                first_position: mesh.positions()[0],
                ambient: mesh.ambient_color(),
            }
        }

        fn group_node(&mut self, name: &str, children: Vec<Node>) -> Node {
            Node::Group(name.to_owned(), children)
        }

        fn root_node(&mut self, children: Vec<Node>) -> Node {
            Node::Root(children)
        }
    }

    fn importer(files: &[(&str, &str)]) -> ObjImporter<Cursor<Vec<u8>>> {
        let files: HashMap<String, Vec<u8>> = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.as_bytes().to_vec()))
            .collect();
        ObjImporter::new(move |location| {
            files.get(location).cloned().map(Cursor::new).ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::NotFound, location.to_owned())
            })
        })
    }

    #[test]
    fn material_from_library_reaches_the_builder() {
        let mut importer = importer(&[
            (
                "assets/obj/box.obj",
                "mtllib m.mtl\nv 20 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nusemtl Red\nf 1 2 3 4\n",
            ),
            ("assets/obj/m.mtl", "newmtl Red\nKd 1 0 0\nKa 2.5 0.5 0\n"),
        ]);
        let root = importer.load("assets/obj/box.obj", &mut Recorder).unwrap();

        let groups = match root {
            Node::Root(groups) => groups,
            otherwise => panic!("unexpected root {:?}", otherwise),
        };
        assert_eq!(groups.len(), 1);
        let meshes = match &groups[0] {
            Node::Group(name, meshes) => {
                assert_eq!(name, "default");
                meshes
            }
            otherwise => panic!("unexpected group {:?}", otherwise),
        };
        assert_eq!(meshes.len(), 1);
        match &meshes[0] {
            Node::Mesh {
                material,
                diffuse,
                triangles,
                first_position,
                ambient,
            } => {
                assert_eq!(material, "Red");
                assert_eq!(*diffuse, Vec3::new(1.0, 0.0, 0.0));
                assert_eq!(*triangles, 2);
                assert_relative_eq!(first_position.x, 20.0 * MODEL_SCALE);
                assert_eq!(*ambient, Some(Vec3::new(1.0, 0.5, 0.0)));
            }
            otherwise => panic!("unexpected mesh {:?}", otherwise),
        }
    }

    #[test]
    fn failure_carries_location_and_cause() {
        let mut importer = importer(&[("bad.obj", "v 0 0 0\nv 1 0 0\nv 1 1 0\nusemtl Ghost\nf 1 2 3\n")]);
        let error = importer.load("bad.obj", &mut Recorder).unwrap_err();
        assert_eq!(error.location, "bad.obj");
        assert!(matches!(error.cause, ErrorCause::Reference(_)));

        let message = error.to_string();
        assert!(message.contains("bad.obj"));
        assert!(message.contains("Ghost"));
    }

    #[test]
    fn missing_file_is_an_import_error() {
        let error = importer(&[]).read_model("absent.obj").unwrap_err();
        assert_eq!(error.location, "absent.obj");
        assert!(matches!(error.cause, ErrorCause::Io(_)));
    }

    #[test]
    fn malformed_material_library_aborts_the_import() {
        let mut importer = importer(&[
            ("a.obj", "mtllib a.mtl\nv 0 0 0\n"),
            ("a.mtl", "Ns 10\n"),
        ]);
        let error = importer.read_model("a.obj").unwrap_err();
        match error.cause {
            ErrorCause::Parse(cause) => {
                assert_eq!(cause.location, "a.mtl");
                assert_eq!(cause.kind, ParseErrorKind::NoCurrentMaterial("Ns".to_owned()));
            }
            otherwise => panic!("unexpected cause {:?}", otherwise),
        }
    }

    #[test]
    fn importers_run_on_worker_threads() {
        let handles: Vec<_> = (0..2)
            .map(|i| {
                let location = format!("m{}.obj", i);
                let source = "v 0 0 0\nv 1 0 0\nv 1 1 0\nf 1 2 3\n";
                let mut importer = importer(&[(location.as_str(), source)]);
                std::thread::spawn(move || {
                    let model = importer.read_model(&location).unwrap();
                    model.groups()[0].meshes()[0].triangle_count()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), 1);
        }
    }
}
