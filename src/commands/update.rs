use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{images_dir, json_to_value, load_config, site_dir, to_labeled};
use crate::ops;
use crate::pipeline::RunOptions;
use crate::GalleryPlugin;

pub struct Update;

impl PluginCommand for Update {
    type Plugin = GalleryPlugin;

    fn name(&self) -> &str {
        "gallery update"
    }

    fn description(&self) -> &str {
        "Point every product page's main image, thumbnails and preload at its image folder"
    }

    fn extra_description(&self) -> &str {
        "Each page is matched to a folder (override table first, then name similarity), \
         the leading images are picked, and the page is rewritten in place. \
         Pages that cannot be handled are reported as skipped with a reason."
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
            .switch("recursive", "Descend into subdirectories", Some('r'))
            .switch("dry-run", "Report without writing", Some('n'))
            .switch("backup", "Keep a <page>.backup copy (created once)", Some('b'))
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["images", "thumbnails", "rewrite", "html", "products"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "gallery update --site ~/sites/inksnap --dry-run | get pages | where status == skipped",
                description: "Pages that would be skipped, with reasons",
                result: None,
            },
            Example {
                example: "gallery update --backup | get summary",
                description: "Rewrite the site in the current directory, keeping backups",
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
        let options = RunOptions {
            site: site_dir(engine, call)?,
            images: images_dir(engine, call)?,
            recursive: call.has_flag("recursive")?,
            dry_run: call.has_flag("dry-run")?,
            backup: call.has_flag("backup")?,
        };
        let result = ops::op_update(&options, &config).map_err(|e| to_labeled(e, head))?;
        Ok(PipelineData::Value(json_to_value(result, head), None))
    }
}
