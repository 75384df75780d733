pub mod command;
pub mod command_reader;
pub mod references;
pub mod response;
pub mod session;
