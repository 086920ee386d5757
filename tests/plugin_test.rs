#![cfg(feature = "plugin")]

use std::sync::Arc;

use nu_plugin_gallery::GalleryPlugin;
use nu_plugin_test_support::PluginTest;
use nu_protocol::{ShellError, Span};

fn plugin_test() -> Result<PluginTest, ShellError> {
    PluginTest::new("gallery", Arc::new(GalleryPlugin))
}

#[test]
fn score_returns_record() -> Result<(), ShellError> {
    let value = plugin_test()?
        .eval("gallery score mug.html mug")?
        .into_value(Span::test_data())?;
    let record = value.as_record()?;
    assert_eq!(record.get("folder").unwrap().as_str()?, "mug");
    assert_eq!(record.get("slug_bonus").unwrap().as_float()?, 0.6);
    assert!(record.get("accepted").unwrap().as_bool()?);
    Ok(())
}

#[test]
fn score_below_threshold_not_accepted() -> Result<(), ShellError> {
    let value = plugin_test()?
        .eval("gallery score xyz-unrelated-product.html mug")?
        .into_value(Span::test_data())?;
    let record = value.as_record()?;
    assert_eq!(record.get("score").unwrap().as_float()?, 0.0);
    assert!(!record.get("accepted").unwrap().as_bool()?);
    Ok(())
}

#[test]
fn score_requires_both_names() {
    let result = plugin_test().and_then(|mut t| t.eval("gallery score mug.html"));
    assert!(result.is_err());
}
