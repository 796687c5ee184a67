pub mod annotate;
pub mod project;
pub mod series;
pub mod sync;
pub mod window;
