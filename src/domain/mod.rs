pub mod filename;
pub mod models;
pub mod normalize;
