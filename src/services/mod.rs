pub mod sessions;
pub mod source;
pub mod trainer;
