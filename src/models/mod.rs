// src/models/mod.rs

pub mod question;
pub mod stats;
pub mod submission;
