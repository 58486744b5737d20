pub mod invoice;
pub mod panel;
pub mod settings;
pub mod summary;
