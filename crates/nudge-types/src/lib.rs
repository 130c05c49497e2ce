pub mod api;
pub mod idset;
pub mod models;

pub use idset::IdSet;
