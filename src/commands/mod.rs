pub mod extract;
pub mod init;
pub mod replace;
pub mod report;
