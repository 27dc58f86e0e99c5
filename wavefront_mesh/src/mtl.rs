//! Material library (`.mtl`) loading.

use crate::{
    tokenizer::{read_directives, take_floats, take_name, Line, MtlDirective},
    ParseErrorKind, Result,
};

use std::{collections::HashMap, io::prelude::*, sync::Arc};

use log::{debug, info};
use ultraviolet::Vec3;

/// Materials defined by `mtllib` files, keyed by `newmtl` name.
pub type MaterialMap = HashMap<String, Arc<Material>>;

/// Represents a material defined in a .mtl file.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    name: String,
    diffuse_color: Vec3,
    specular_color: Vec3,
    specular_power: f32,
    ambient_color: Option<Vec3>,
}

impl Default for Material {
    /// The implicit white material used before any `usemtl`.
    fn default() -> Material {
        Material::new("default")
    }
}

impl Material {
    /// Creates a white material with zero specular power.
    pub fn new(name: impl Into<String>) -> Material {
        Material {
            name: name.into(),
            diffuse_color: Vec3::new(1.0, 1.0, 1.0),
            specular_color: Vec3::new(1.0, 1.0, 1.0),
            specular_power: 0.0,
            ambient_color: None,
        }
    }

    /// Returns the material name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the value of `Kd`.
    pub fn diffuse_color(&self) -> Vec3 {
        self.diffuse_color
    }

    /// Returns the value of `Ks`.
    pub fn specular_color(&self) -> Vec3 {
        self.specular_color
    }

    /// Returns the value of `Ns`.
    pub fn specular_power(&self) -> f32 {
        self.specular_power
    }

    /// Returns the value of `Ka`, if the library declared one.
    pub fn ambient_color(&self) -> Option<Vec3> {
        self.ambient_color
    }
}

#[derive(Debug, Default)]
struct MtlBuffer {
    current: Option<Material>,
    complete_materials: MaterialMap,
}

impl MtlBuffer {
    fn commit_material(&mut self) {
        if let Some(material) = self.current.take() {
            debug!("Defined material {}", material.name);
            self.complete_materials
                .insert(material.name.clone(), Arc::new(material));
        }
    }

    fn current_material(&mut self, line: &Line, keyword: &str) -> Result<&mut Material> {
        match self.current.as_mut() {
            Some(material) => Ok(material),
            None => Err(line
                .parse_error(ParseErrorKind::NoCurrentMaterial(keyword.to_owned()))
                .into()),
        }
    }

    fn process_line(&mut self, directive: MtlDirective, line: &Line, tokens: &[&str]) -> Result<()> {
        match directive {
            MtlDirective::NewMaterial => {
                let name = take_name(line, tokens)?;
                self.commit_material();
                self.current = Some(Material::new(name));
            }
            MtlDirective::Ambient => {
                let color = take_color(line, tokens)?;
                self.current_material(line, "Ka")?.ambient_color = Some(color);
            }
            MtlDirective::Diffuse => {
                let color = take_color(line, tokens)?;
                self.current_material(line, "Kd")?.diffuse_color = color;
            }
            MtlDirective::Specular => {
                let color = take_color(line, tokens)?;
                self.current_material(line, "Ks")?.specular_color = color;
            }
            MtlDirective::SpecularPower => {
                let [power] = take_floats::<1>(line, tokens)?;
                self.current_material(line, "Ns")?.specular_power = power;
            }
        }
        Ok(())
    }
}

/// Parses a .mtl file read from `reader`; `location` only labels errors and logs.
pub fn parse_mtl(location: &str, reader: impl Read) -> Result<MaterialMap> {
    let mut buffer = MtlBuffer::default();
    read_directives(location, reader, |directive: MtlDirective, line, tokens| {
        buffer.process_line(directive, line, tokens)
    })?;
    buffer.commit_material();

    info!(
        "Loaded {} materials from {}",
        buffer.complete_materials.len(),
        location
    );
    Ok(buffer.complete_materials)
}

/// Parses an RGB triple. Channels above 1.0 are clamped, lower values pass through.
fn take_color(line: &Line, tokens: &[&str]) -> Result<Vec3> {
    let [r, g, b] = take_floats::<3>(line, tokens)?;
    Ok(Vec3::new(clamp_channel(r), clamp_channel(g), clamp_channel(b)))
}

fn clamp_channel(value: f32) -> f32 {
    if value > 1.0 {
        1.0
    } else {
        value
    }
}
