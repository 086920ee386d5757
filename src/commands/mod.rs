mod catalog;
mod install_script;
mod match_page;
mod score;
mod update;
pub mod util;

pub use catalog::Catalog;
pub use install_script::InstallScript;
pub use match_page::MatchPage;
pub use score::Score;
pub use update::Update;
