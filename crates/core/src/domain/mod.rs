pub mod digest;
pub mod expert;
pub mod gap;
