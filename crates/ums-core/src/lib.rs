pub mod config;
pub mod outcome;
pub mod paths;
pub mod results;
pub mod trigger;
pub mod types;

pub use config::CoordinationConfig;
pub use outcome::ValidationOutcome;
pub use paths::{write_atomic, UmsPaths};
pub use results::ResultFiles;
pub use trigger::{
    MergeTriggerFile, PostCommitTriggerFile, ReloadTriggerFile, ValidationTriggerFile,
};
pub use types::*;
