mod cli;
mod config;
mod scene;

use crate::{cli::Arguments, config::Config, scene::SceneTreeBuilder};

use anyhow::{bail, Context, Result};
use clap::Parser;
use log::info;
use wavefront_mesh::{Importer, ObjImporter};

fn main() -> Result<()> {
    pretty_env_logger::init();
    let arguments = Arguments::parse();

    let config = Config::load(&arguments.config)?;
    let mut locations = config.model_locations();
    locations.extend(arguments.models);
    if locations.is_empty() {
        bail!(
            "No models to import; pass OBJ files or list them in {}",
            arguments.config
        );
    }

    let mut importer = ObjImporter::from_filesystem();
    for location in &locations {
        info!("Importing {}", location);
        let mut builder = SceneTreeBuilder::new(location.as_str());
        let root = importer
            .load(location, &mut builder)
            .with_context(|| format!("Failed to import \"{}\"", location))?;

        let mut meshes = 0;
        let mut triangles = 0;
        root.visit_meshes(&mut |view| {
            meshes += 1;
            triangles += view.mesh.triangle_count();
        });

        print!("{}", root);
        println!(
            "{}: {} groups, {} meshes, {} triangles",
            location,
            root.children().len(),
            meshes,
            triangles
        );
    }

    Ok(())
}
