//! The OBJ accumulator and its directive handlers.

use crate::{
    mtl::{parse_mtl, Material, MaterialMap},
    tokenizer::{read_directives, take_floats, take_name, Line, ObjDirective},
    IoError, ParseError, ParseErrorKind, Result,
};

use std::{io::prelude::*, sync::Arc};

use itertools::Itertools;
use log::{debug, info};
use ultraviolet::{Vec2, Vec3};

/// Name of the group used when no `g` precedes the faces, or `g` has no name.
pub const DEFAULT_GROUP_NAME: &str = "default";

/// A material-homogeneous run of faces inside a group.
#[derive(Debug, Clone)]
pub struct Subgroup {
    /// Flat `(vertex, normal, texcoord)` index stream, three entries per face vertex.
    faces: Vec<usize>,
    material: Arc<Material>,
    ambient_color: Option<Vec3>,
}

impl Subgroup {
    fn new(material: Arc<Material>) -> Subgroup {
        let ambient_color = material.ambient_color();
        Subgroup {
            faces: vec![],
            material,
            ambient_color,
        }
    }

    /// Returns the flat index stream.
    pub fn faces(&self) -> &[usize] {
        &self.faces
    }

    pub fn material(&self) -> &Arc<Material> {
        &self.material
    }

    pub fn ambient_color(&self) -> Option<Vec3> {
        self.ambient_color
    }
}

/// Represents a group (`g`) in the OBJ file.
#[derive(Debug, Clone)]
pub struct Group {
    name: String,
    subgroups: Vec<Subgroup>,
    implicit: bool,
}

impl Group {
    fn new(name: &str, default_material: &Arc<Material>, implicit: bool) -> Group {
        Group {
            name: name.to_owned(),
            subgroups: vec![Subgroup::new(default_material.clone())],
            implicit,
        }
    }

    /// Returns the name of this group.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the subgroups, in `usemtl` order. Never empty.
    pub fn subgroups(&self) -> &[Subgroup] {
        &self.subgroups
    }

    /// Whether this group was synthesized because no `g` came first.
    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    fn current_subgroup(&mut self) -> &mut Subgroup {
        self.subgroups
            .last_mut()
            .expect("A group always owns at least one subgroup")
    }
}

/// The accumulated content of one OBJ file.
#[derive(Debug, Clone)]
pub struct ObjState {
    vertices: Vec<Vec3>,
    normals: Vec<Vec3>,
    texcoords: Vec<Vec2>,
    groups: Vec<Group>,
    materials: MaterialMap,
    default_material: Arc<Material>,
}

impl Default for ObjState {
    fn default() -> ObjState {
        ObjState::new()
    }
}

impl ObjState {
    /// Creates a state which already holds the implicit default group.
    pub fn new() -> ObjState {
        let default_material = Arc::new(Material::default());
        ObjState {
            vertices: vec![],
            normals: vec![],
            texcoords: vec![],
            groups: vec![Group::new(DEFAULT_GROUP_NAME, &default_material, true)],
            materials: MaterialMap::new(),
            default_material,
        }
    }

    pub fn vertices(&self) -> &[Vec3] {
        &self.vertices
    }

    pub fn normals(&self) -> &[Vec3] {
        &self.normals
    }

    pub fn texcoords(&self) -> &[Vec2] {
        &self.texcoords
    }

    /// Returns all groups in declaration order. Never empty.
    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn materials(&self) -> &MaterialMap {
        &self.materials
    }

    pub(crate) fn into_parts(self) -> (Vec<Vec3>, Vec<Vec3>, Vec<Vec2>, Vec<Group>) {
        (self.vertices, self.normals, self.texcoords, self.groups)
    }

    fn current_group(&mut self) -> &mut Group {
        self.groups
            .last_mut()
            .expect("The state always owns at least one group")
    }

    /// Adds materials included by `mtllib`; later definitions replace earlier ones.
    pub fn merge_materials(&mut self, materials: MaterialMap) {
        self.materials.extend(materials);
    }

    fn process_line(
        &mut self,
        directive: ObjDirective,
        line: &Line,
        tokens: &[&str],
        include: &mut impl FnMut(&str) -> Result<MaterialMap>,
    ) -> Result<()> {
        match directive {
            ObjDirective::Group => {
                let name = tokens.first().copied().unwrap_or(DEFAULT_GROUP_NAME);
                debug!("Group {}", name);
                self.groups
                    .push(Group::new(name, &self.default_material, false));
            }
            ObjDirective::VertexTexcoord => {
                let [u, v] = take_floats::<2>(line, tokens)?;
                self.texcoords.push(Vec2::new(u, v));
            }
            ObjDirective::VertexNormal => {
                let [x, y, z] = take_floats::<3>(line, tokens)?;
                self.normals.push(Vec3::new(x, y, z));
            }
            ObjDirective::Vertex => {
                let [x, y, z] = take_floats::<3>(line, tokens)?;
                self.vertices.push(Vec3::new(x, y, z));
            }
            ObjDirective::Face => self.push_face(line, tokens)?,
            ObjDirective::UseMaterial => self.use_material(line, tokens)?,
            ObjDirective::MaterialLib => {
                take_name(line, tokens)?;
                for &file_name in tokens {
                    let materials = include(file_name)?;
                    self.merge_materials(materials);
                }
            }
        }
        Ok(())
    }

    /// Opens a new subgroup with the named material.
    fn use_material(&mut self, line: &Line, tokens: &[&str]) -> Result<()> {
        let name = take_name(line, tokens)?;
        let material = self
            .materials
            .get(name)
            .cloned()
            .ok_or_else(|| line.reference_error(name))?;

        debug!("Switching to material {}", name);
        self.current_group().subgroups.push(Subgroup::new(material));
        Ok(())
    }

    /// Appends a face to the current subgroup, fan-triangulating n-gons around the first vertex.
    fn push_face(&mut self, line: &Line, tokens: &[&str]) -> Result<(), ParseError> {
        if tokens.len() < 3 {
            return Err(line.parse_error(ParseErrorKind::DegenerateFace(tokens.len())));
        }

        let corners = tokens
            .iter()
            .map(|token| self.resolve_face_vertex(line, token))
            .collect::<Result<Vec<_>, _>>()?;

        let anchor = corners[0];
        let faces = &mut self.current_group().current_subgroup().faces;
        for (second, third) in corners[1..].iter().tuple_windows() {
            faces.extend_from_slice(&anchor);
            faces.extend_from_slice(second);
            faces.extend_from_slice(third);
        }
        Ok(())
    }

    /// Resolves `v`, `v/vt`, `v//vn` or `v/vt/vn` into a 0-based
    /// `[vertex, normal, texcoord]` triple. Absent slots resolve to 0.
    fn resolve_face_vertex(&self, line: &Line, token: &str) -> Result<[usize; 3], ParseError> {
        let invalid = || line.parse_error(ParseErrorKind::InvalidFaceVertex(token.to_owned()));
        let parts: Vec<&str> = token.split('/').collect();

        let vertex = match parts[0] {
            "" => return Err(invalid()),
            s => parse_index(line, s, "vertex", self.vertices.len())?,
        };
        let (normal_part, texcoord_part) = match parts.len() {
            1 => ("", ""),
            2 => ("", parts[1]),
            3 if parts[2].is_empty() => return Err(invalid()),
            3 => (parts[2], parts[1]),
            _ => return Err(invalid()),
        };
        let normal = match normal_part {
            "" => 0,
            s => parse_index(line, s, "normal", self.normals.len())?,
        };
        let texcoord = match texcoord_part {
            "" => 0,
            s => parse_index(line, s, "texcoord", self.texcoords.len())?,
        };

        Ok([vertex, normal, texcoord])
    }
}

/// Converts a 1-based OBJ index into a 0-based one, checking it against the declared count.
fn parse_index(
    line: &Line,
    value: &str,
    kind: &'static str,
    count: usize,
) -> Result<usize, ParseError> {
    let index: i64 = value.parse().map_err(|_| {
        line.parse_error(ParseErrorKind::InvalidFaceVertex(value.to_owned()))
    })?;
    if index <= 0 {
        return Err(line.parse_error(ParseErrorKind::InvalidIndex(value.to_owned())));
    }

    let index = (index - 1) as usize;
    if index >= count {
        return Err(line.parse_error(ParseErrorKind::DanglingIndex {
            kind,
            index: index + 1,
            count,
        }));
    }
    Ok(index)
}

/// Replaces the last path segment of `location` with `file_name`.
pub(crate) fn sibling_location(location: &str, file_name: &str) -> String {
    match location.rfind(|c: char| c == '/' || c == '\\') {
        Some(separator) => format!("{}{}", &location[..=separator], file_name),
        None => file_name.to_owned(),
    }
}

/// Represents the parser of OBJ/MTL.
pub struct Parser<R> {
    open_function: Box<dyn FnMut(&str) -> std::io::Result<R> + Send>,
}

impl<R: Read> Parser<R> {
    /// Creates an instance of `Parser`.
    /// # Parameters
    /// * `open_function`
    ///     - A resolver closure/function for OBJ and MTL locations
    ///     - The parser calls it with the OBJ location, and with the derived
    ///       location of every `mtllib` file, so you can return any `Read`
    ///       instance or error.
    pub fn new(
        open_function: impl FnMut(&str) -> std::io::Result<R> + Send + 'static,
    ) -> Parser<R> {
        Parser {
            open_function: Box::new(open_function),
        }
    }

    fn open(&mut self, location: &str) -> Result<R> {
        let reader = (self.open_function)(location).map_err(|source| IoError {
            location: location.to_owned(),
            source,
        })?;
        Ok(reader)
    }

    /// Parses the OBJ file at `location`, including every referenced MTL file.
    pub fn parse(&mut self, location: &str) -> Result<ObjState> {
        let reader = self.open(location)?;
        let mut state = ObjState::new();

        let mut include = |file_name: &str| -> Result<MaterialMap> {
            let mtl_location = sibling_location(location, file_name);
            debug!("Including material library {}", mtl_location);
            let mtl_reader = self.open(&mtl_location)?;
            parse_mtl(&mtl_location, mtl_reader)
        };
        read_directives(location, reader, |directive: ObjDirective, line, tokens| {
            state.process_line(directive, line, tokens, &mut include)
        })?;

        info!(
            "Parsed {}: {} vertices, {} normals, {} texcoords, {} groups",
            location,
            state.vertices.len(),
            state.normals.len(),
            state.texcoords.len(),
            state.groups.len()
        );
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorCause;

    use std::{collections::HashMap, io::Cursor};

    fn parser(files: &[(&str, &str)]) -> Parser<Cursor<Vec<u8>>> {
        let files: HashMap<String, String> = files
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Parser::new(move |location| {
            files
                .get(location)
                .map(|content| Cursor::new(content.clone().into_bytes()))
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, location.to_owned()))
        })
    }

    fn parse(source: &str) -> Result<ObjState> {
        parser(&[("model.obj", source)]).parse("model.obj")
    }

    fn parse_error(source: &str) -> ParseError {
        match parse(source) {
            Err(ErrorCause::Parse(error)) => error,
            otherwise => panic!("expected a parse error, got {:?}", otherwise),
        }
    }

    const TRIANGLE: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\n";

    #[test]
    fn single_triangle_lands_in_default_group() {
        let state = parse(&format!("{}f 1 2 3\n", TRIANGLE)).unwrap();
        assert_eq!(state.vertices().len(), 3);
        assert_eq!(state.groups().len(), 1);

        let group = &state.groups()[0];
        assert_eq!(group.name(), "default");
        assert!(group.is_implicit());
        assert_eq!(group.subgroups().len(), 1);

        let subgroup = &group.subgroups()[0];
        assert_eq!(subgroup.faces(), &[0, 0, 0, 1, 0, 0, 2, 0, 0]);
        assert_eq!(**subgroup.material(), Material::default());
        assert_eq!(subgroup.ambient_color(), None);
    }

    #[test]
    fn quad_is_fan_triangulated() {
        let state = parse("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n").unwrap();
        let faces = state.groups()[0].subgroups()[0].faces();
        assert_eq!(faces, &[0, 0, 0, 1, 0, 0, 2, 0, 0, 0, 0, 0, 2, 0, 0, 3, 0, 0]);
    }

    #[test]
    fn ngon_emits_n_minus_two_triangles_sharing_first_vertex() {
        let mut source = String::new();
        for i in 0..7 {
            source.push_str(&format!("v {} 0 0\n", i));
        }
        source.push_str("f 1 2 3 4 5 6 7\n");
        let state = parse(&source).unwrap();

        let faces = state.groups()[0].subgroups()[0].faces();
        assert_eq!(faces.len(), 5 * 9);
        for triangle in faces.chunks(9) {
            assert_eq!(triangle[0], 0);
        }
    }

    #[test]
    fn face_vertex_slots() {
        let source = "v 0 0 0\nv 1 0 0\nv 1 1 0\nvt 0 0\nvt 1 0\nvn 0 0 1\nvn 0 1 0\n\
                      f 1 2/2 3//2\nf 3/1/2 2/2/1 1//1\n";
        let faces = parse(source).unwrap().groups()[0].subgroups()[0].faces().to_vec();
        assert_eq!(
            faces,
            vec![
                0, 0, 0, // 1
                1, 0, 1, // 2/2
                2, 1, 0, // 3//2
                2, 1, 0, // 3/1/2
                1, 0, 1, // 2/2/1
                0, 0, 0, // 1//1
            ]
        );
    }

    #[test]
    fn one_based_index_is_decremented() {
        let mut source = String::new();
        for i in 0..5 {
            source.push_str(&format!("v {} 0 0\n", i));
        }
        source.push_str("f 5 1 2\n");
        let state = parse(&source).unwrap();
        assert_eq!(state.groups()[0].subgroups()[0].faces()[0], 4);
    }

    #[test]
    fn groups_start_with_default_subgroup() {
        let state = parse(&format!("g\n{}g body\nf 1 2 3\n", TRIANGLE)).unwrap();
        let names: Vec<_> = state.groups().iter().map(Group::name).collect();
        assert_eq!(names, vec!["default", "default", "body"]);
        assert!(!state.groups()[1].is_implicit());
        assert_eq!(state.groups()[2].subgroups().len(), 1);
        assert_eq!(state.groups()[2].subgroups()[0].faces().len(), 9);
    }

    #[test]
    fn usemtl_opens_subgroup_with_material() {
        let mut parser = parser(&[
            (
                "models/car.obj",
                "mtllib car.mtl\nv 0 0 0\nv 1 0 0\nv 1 1 0\ng body\nusemtl Red\nf 1 2 3\nusemtl Blue\nf 3 2 1\n",
            ),
            (
                "models/car.mtl",
                "newmtl Red\nKa 0.2 0 0\nKd 1 0 0\nnewmtl Blue\nKd 0 0 1\n",
            ),
        ]);
        let state = parser.parse("models/car.obj").unwrap();
        assert_eq!(state.materials().len(), 2);

        let group = &state.groups()[1];
        assert_eq!(group.subgroups().len(), 3);
        assert!(group.subgroups()[0].faces().is_empty());

        let red = &group.subgroups()[1];
        assert_eq!(red.material().name(), "Red");
        assert_eq!(red.material().diffuse_color(), Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(red.ambient_color(), Some(Vec3::new(0.2, 0.0, 0.0)));
        assert_eq!(red.faces().len(), 9);

        let blue = &group.subgroups()[2];
        assert_eq!(blue.material().name(), "Blue");
        assert_eq!(blue.ambient_color(), None);
        assert_eq!(blue.faces(), &[2, 0, 0, 1, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn undefined_material_is_a_reference_error() {
        match parse(&format!("{}usemtl Missing\nf 1 2 3\n", TRIANGLE)) {
            Err(ErrorCause::Reference(error)) => {
                assert_eq!(error.name, "Missing");
                assert_eq!(error.line, 4);
            }
            otherwise => panic!("expected a reference error, got {:?}", otherwise),
        }
    }

    #[test]
    fn material_libraries_merge_in_order() {
        let mut parser = parser(&[
            (
                "models/scene.obj",
                "mtllib a.mtl b.mtl\nmtllib c.mtl\nv 0 0 0\nv 1 0 0\nv 1 1 0\nusemtl X\nf 1 2 3\n",
            ),
            ("models/a.mtl", "newmtl X\nKd 1 0 0\nnewmtl A\n"),
            ("models/b.mtl", "newmtl X\nKd 0 1 0\nnewmtl B\n"),
            ("models/c.mtl", "newmtl C\nKd 0 0 1\n"),
        ]);
        let state = parser.parse("models/scene.obj").unwrap();

        let mut names: Vec<_> = state.materials().keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["A", "B", "C", "X"]);
        assert_eq!(state.materials()["X"].diffuse_color(), Vec3::new(0.0, 1.0, 0.0));

        let used = state.groups()[0].subgroups()[1].material();
        assert_eq!(used.diffuse_color(), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn missing_material_library_is_an_io_error() {
        match parse("mtllib nowhere.mtl\n") {
            Err(ErrorCause::Io(error)) => assert_eq!(error.location, "nowhere.mtl"),
            otherwise => panic!("expected an io error, got {:?}", otherwise),
        }
    }

    #[test]
    fn malformed_vertex_reports_line() {
        let error = parse_error("v 0 0 0\nv 1 zero 0\n");
        assert_eq!(error.line, 2);
        assert_eq!(error.content, "v 1 zero 0");
        assert_eq!(error.kind, ParseErrorKind::InvalidNumber("zero".to_owned()));
    }

    #[test]
    fn negative_index_is_rejected() {
        let error = parse_error(&format!("{}f -3 -2 -1\n", TRIANGLE));
        assert_eq!(error.kind, ParseErrorKind::InvalidIndex("-3".to_owned()));
    }

    #[test]
    fn forward_reference_is_rejected() {
        let error = parse_error("v 0 0 0\nv 1 0 0\nf 1 2 3\nv 1 1 0\n");
        assert_eq!(
            error.kind,
            ParseErrorKind::DanglingIndex {
                kind: "vertex",
                index: 3,
                count: 2
            }
        );
    }

    #[test]
    fn texcoord_index_without_texcoords_is_rejected() {
        let error = parse_error(&format!("{}f 1/1 2/1 3/1\n", TRIANGLE));
        assert_eq!(
            error.kind,
            ParseErrorKind::DanglingIndex {
                kind: "texcoord",
                index: 1,
                count: 0
            }
        );
    }

    #[test]
    fn malformed_faces_are_rejected() {
        assert_eq!(
            parse_error(&format!("{}f 1 2\n", TRIANGLE)).kind,
            ParseErrorKind::DegenerateFace(2)
        );
        assert_eq!(
            parse_error(&format!("{}f 1/1/1/1 2 3\n", TRIANGLE)).kind,
            ParseErrorKind::InvalidFaceVertex("1/1/1/1".to_owned())
        );
        assert_eq!(
            parse_error(&format!("{}f /1 2 3\n", TRIANGLE)).kind,
            ParseErrorKind::InvalidFaceVertex("/1".to_owned())
        );
        assert_eq!(
            parse_error(&format!("{}f 0 1 2\n", TRIANGLE)).kind,
            ParseErrorKind::InvalidIndex("0".to_owned())
        );
    }

    #[test]
    fn sibling_location_replaces_last_segment() {
        assert_eq!(
            sibling_location("file:///assets/obj/cooper.obj", "cooper.mtl"),
            "file:///assets/obj/cooper.mtl"
        );
        assert_eq!(sibling_location("obj\\car.obj", "car.mtl"), "obj\\car.mtl");
        assert_eq!(sibling_location("car.obj", "car.mtl"), "car.mtl");
    }
}
