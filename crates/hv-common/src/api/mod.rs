pub mod assignment;
pub mod opportunity;
pub mod profile;
pub mod recommendation;
