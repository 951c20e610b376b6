pub mod cache;
pub mod catalog;
pub mod lister;
pub mod tvdb;
