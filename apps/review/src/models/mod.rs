pub mod feedback;
pub mod project;
