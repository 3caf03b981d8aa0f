pub mod import;
pub mod status;
pub mod verify;
