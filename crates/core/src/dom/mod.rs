pub mod document;
pub mod host;
pub mod traits;
