pub mod eda;
pub mod features;
pub mod inference;
pub mod modeling;
pub mod summary;
