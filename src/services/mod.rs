pub mod classifier;
pub mod fetcher;
pub mod field_matcher;
pub mod form_discovery;
pub mod intake;
pub mod orchestrator;
pub mod report;
pub mod rules;
pub mod submitter;
pub mod surface;
pub mod triage;

pub use classifier::*;
pub use fetcher::*;
pub use field_matcher::*;
pub use form_discovery::*;
pub use intake::*;
pub use orchestrator::*;
pub use submitter::*;
pub use surface::*;
pub use triage::*;
