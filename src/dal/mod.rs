pub mod entry_store;
pub mod worklist;

pub use entry_store::*;
pub use worklist::*;
