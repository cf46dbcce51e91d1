pub mod priority;
pub mod timestamps;
