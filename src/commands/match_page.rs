use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{images_dir, json_to_value, load_config, site_dir, to_labeled};
use crate::ops;
use crate::GalleryPlugin;

pub struct MatchPage;

impl PluginCommand for MatchPage {
    type Plugin = GalleryPlugin;

    fn name(&self) -> &str {
        "gallery match"
    }

    fn description(&self) -> &str {
        "Show which image folder a page would use, with the best candidates"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::Nothing, Type::record())
            .required("page", SyntaxShape::String, "Page file name, e.g. mugs.html")
            .named("site", SyntaxShape::Filepath, "Site root (default: current directory)", Some('s'))
            .named(
                "images",
                SyntaxShape::Filepath,
                "Catalog root (default: asset prefix under the site root)",
                Some('i'),
            )
            .named("top", SyntaxShape::Int, "Ranked candidates to show (default: 5)", Some('n'))
            .named(
                "metric",
                SyntaxShape::String,
                "Suggestion metric when nothing matches: levenshtein, jaro-winkler (default: jaro-winkler)",
                Some('m'),
            )
            .named("config", SyntaxShape::Filepath, "Config file", None)
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["match", "folder", "candidates", "override"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![
            Example {
                example: "gallery match mugs.html",
                description: "Match decision for one page",
                result: None,
            },
            Example {
                example: "gallery match flyer-printing.html --top 10 | get candidates",
                description: "Ten best-scoring folders for a page",
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
        let page: String = call.req(0)?;
        let top = call.get_flag::<i64>("top")?.unwrap_or(5).max(0) as usize;
        let metric: String = call
            .get_flag::<String>("metric")?
            .unwrap_or_else(|| "jaro-winkler".into());
        let config = load_config(engine, call)?;
        let root = match images_dir(engine, call)? {
            Some(dir) => dir,
            None => config.catalog_dir(&site_dir(engine, call)?),
        };
        let result = ops::op_match(&page, &root, top, &metric, &config).map_err(|e| to_labeled(e, head))?;
        Ok(PipelineData::Value(json_to_value(result, head), None))
    }
}
