//! memview library
//!
//! Terminal viewer for the Memtime time-tracking API. The binary in
//! `main.rs` owns the terminal and the event loop; everything else lives
//! here so it can be tested without a terminal.

pub mod app;
pub mod banner;
pub mod cache;
pub mod cli;
pub mod data;
pub mod datetime;
pub mod form;
pub mod hierarchy;
pub mod logging;
pub mod pagination;
pub mod ui;
pub mod worker;
