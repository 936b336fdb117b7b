pub mod admin;
pub mod cleanup;
pub mod deletion;
