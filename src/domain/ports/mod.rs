pub mod clock;
pub mod file_storage;
pub mod message_repository;
