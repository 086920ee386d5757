use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{images_dir, json_to_value, load_config, site_dir, to_labeled};
use crate::ops;
use crate::GalleryPlugin;

pub struct Catalog;

impl PluginCommand for Catalog {
    type Plugin = GalleryPlugin;

    fn name(&self) -> &str {
        "gallery catalog"
    }

    fn description(&self) -> &str {
        "List product image folders and their images"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::Nothing, Type::record())
            .named("site", SyntaxShape::Filepath, "Site root (default: current directory)", Some('s'))
            .named(
                "images",
                SyntaxShape::Filepath,
                "Catalog root (default: asset prefix under the site root)",
                Some('i'),
            )
            .named("config", SyntaxShape::Filepath, "Config file", None)
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["images", "folders", "products", "gallery"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "gallery catalog --site ~/sites/inksnap",
                description: "Folders and images of a site's product catalog",
                result: None,
            },
            Example {
                example: "gallery catalog | get folders | where count < 3",
                description: "Folders too small for a full gallery",
                result: None,
            },
        ]
    }

    fn run(
        &self,
        _plugin: &GalleryPlugin,
        engine: &EngineInterface,
        call: &EvaluatedCall,
        _input: PipelineData,
    ) -> Result<PipelineData, LabeledError> {
        let head = call.head;
        let config = load_config(engine, call)?;
        let root = match images_dir(engine, call)? {
            Some(dir) => dir,
            None => config.catalog_dir(&site_dir(engine, call)?),
        };
        let result = ops::op_catalog(&root, &config).map_err(|e| to_labeled(e, head))?;
        Ok(PipelineData::Value(json_to_value(result, head), None))
    }
}
