pub mod classify;
pub mod manage;
pub mod run;

pub use classify::{classify, ClassifyArgs};
pub use manage::{create_configuration, list_configurations, remove_configuration, update_configuration, ConfigAction};
pub use run::run;
