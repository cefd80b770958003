// src/models/mod.rs

pub mod exam;
pub mod id;
pub mod lenient;
pub mod question;
pub mod results;
pub mod submission;
