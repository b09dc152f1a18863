//! Reusable widgets

pub mod page_strip;

pub use page_strip::PageStrip;
