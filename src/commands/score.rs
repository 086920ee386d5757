use nu_plugin::{EngineInterface, EvaluatedCall, PluginCommand};
use nu_protocol::{Category, Example, LabeledError, PipelineData, Signature, SyntaxShape, Type};

use super::util::{json_to_value, load_config};
use crate::ops;
use crate::GalleryPlugin;

pub struct Score;

impl PluginCommand for Score {
    type Plugin = GalleryPlugin;

    fn name(&self) -> &str {
        "gallery score"
    }

    fn description(&self) -> &str {
        "Score how well a page name matches a folder name"
    }

    fn signature(&self) -> Signature {
        Signature::build(self.name())
            .input_output_type(Type::Nothing, Type::record())
            .required("page", SyntaxShape::String, "Page file name, e.g. mugs.html")
            .required("folder", SyntaxShape::String, "Catalog folder name")
            .named("config", SyntaxShape::Filepath, "Config file", None)
            .category(Category::Experimental)
    }

    fn search_terms(&self) -> Vec<&str> {
        vec!["similarity", "jaccard", "slug", "match"]
    }

    fn examples(&self) -> Vec<Example<'_>> {
        vec![Example {
            example: r#"gallery score "custom-poster-printing.html" "poster-a1""#,
            description: "Tokens, similarity, slug bonus and total score",
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
        let page: String = call.req(0)?;
        let folder: String = call.req(1)?;
        let config = load_config(engine, call)?;
        let result = ops::op_score(&page, &folder, &config);
        Ok(PipelineData::Value(json_to_value(result, call.head), None))
    }
}
