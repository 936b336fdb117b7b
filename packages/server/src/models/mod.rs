pub mod cleanup;
pub mod deletion;
pub mod shared;
