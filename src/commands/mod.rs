pub mod call;
pub mod init;
pub mod methods;
pub mod serve;
pub mod set;
