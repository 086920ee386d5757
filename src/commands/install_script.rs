use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{json_to_value, load_config, site_dir, to_labeled};
use crate::ops;
use crate::pipeline::RunOptions;
use crate::GalleryPlugin;

pub struct InstallScript;

impl PluginCommand for InstallScript {
    type Plugin = GalleryPlugin;

    fn name(&self) -> &str {
        "gallery install-script"
    }

    fn description(&self) -> &str {
        "Add the thumbnail click handler to pages that call it but never define it"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::Nothing, Type::table())
            .named("site", SyntaxShape::Filepath, "Site root (default: current directory)", Some('s'))
            .named("config", SyntaxShape::Filepath, "Config file", None)
            .switch("recursive", "Descend into subdirectories", Some('r'))
            .switch("dry-run", "Report without writing", Some('n'))
            .switch("backup", "Keep a <page>.backup copy (created once)", Some('b'))
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["script", "javascript", "thumbnails", "onclick"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: "gallery install-script --recursive | where status == installed",
            description: "Install the handler site-wide and list the pages changed",
            result: None,
        }]
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
            images: None,
            recursive: call.has_flag("recursive")?,
            dry_run: call.has_flag("dry-run")?,
            backup: call.has_flag("backup")?,
        };
        let result = ops::op_install_script(&options, &config).map_err(|e| to_labeled(e, head))?;
        Ok(PipelineData::Value(json_to_value(result, head), None))
    }
}
