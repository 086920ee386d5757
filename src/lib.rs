pub mod algo;
pub mod config;
pub mod error;
pub mod ops;
pub mod pipeline;

#[cfg(feature = "plugin")]
pub mod commands;

pub use error::{GalleryError, Result};

#[cfg(feature = "plugin")]
use nu_plugin::{Plugin, PluginCommand};

#[cfg(feature = "plugin")]
pub struct GalleryPlugin;

#[cfg(feature = "plugin")]
impl Plugin for GalleryPlugin {
    fn version(&self) -> String {
        env!("CARGO_PKG_VERSION").into()
    }

    fn commands(&self) -> Vec<Box<dyn PluginCommand<Plugin = Self>>> {
        vec![
            Box::new(commands::Catalog),
            Box::new(commands::Score),
            Box::new(commands::MatchPage),
            Box::new(commands::Update),
            Box::new(commands::InstallScript),
        ]
    }
}
