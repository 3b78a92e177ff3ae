pub mod chat;
pub mod index;
pub mod init;
pub mod tools;
