// src/models/mod.rs

pub mod answer;
pub mod assignment;
pub mod grade;
pub mod monitoring;
pub mod report;
