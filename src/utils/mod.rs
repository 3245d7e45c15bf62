pub mod error;
pub mod locks;
pub mod logger;
pub mod validation;
