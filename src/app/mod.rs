pub mod application;
pub mod urls;
