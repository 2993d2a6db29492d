//! Command handlers

pub mod chart;
pub mod config;
pub mod day;
pub mod status;
pub mod water;
pub mod weight;
