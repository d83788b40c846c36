pub mod catalog_loader;
pub mod view_evictor;
