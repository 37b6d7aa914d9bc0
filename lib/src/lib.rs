#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod attribute;
pub mod command;
pub mod config;
pub mod exec;
pub mod filter;
pub mod host;
pub mod jump;
pub mod pipeline;
pub mod probe;
pub mod resolve;
pub mod select;
pub mod util;
