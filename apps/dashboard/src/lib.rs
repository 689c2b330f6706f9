pub mod charts;
pub mod command;
pub mod config;
pub mod handler;
pub mod view;
