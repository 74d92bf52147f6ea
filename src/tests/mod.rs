pub mod common;

mod config_flow;
