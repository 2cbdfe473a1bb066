pub mod classification;
pub mod form;
pub mod product;
pub mod target;

pub use classification::*;
pub use form::*;
pub use product::*;
pub use target::*;
