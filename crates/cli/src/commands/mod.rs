pub mod config_cmd;
pub mod count;
pub mod serve;
pub mod token;
