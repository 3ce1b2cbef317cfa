pub mod feedback;
pub mod job;
