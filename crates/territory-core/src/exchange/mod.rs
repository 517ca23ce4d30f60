//! Exchange formats: JSON envelope, CSV, and the fill snapshot consumed by
//! the image compositor.

pub mod csv;
pub mod envelope;
pub mod fills;
