pub mod access;
pub mod assignment;
pub mod ast;
pub mod error_codes;
pub mod indicator;
pub mod json;
pub mod path;
pub mod resolve;
pub mod span;
pub mod walk;
