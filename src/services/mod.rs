// src/services/mod.rs

pub mod answer_writer;
pub mod exam_service;
pub mod http;
pub mod session_store;
pub mod sweeper;
