pub mod builtin;
pub mod copy_config;
pub mod delete_config;
pub mod edit_config;
pub mod get;
pub mod get_config;
pub mod hello;
pub mod lock;
pub mod parse;
pub mod serve;
pub mod session;
