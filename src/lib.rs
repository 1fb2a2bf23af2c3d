// src/lib.rs

//! Recall list watcher library

pub mod error;
pub mod logging;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
