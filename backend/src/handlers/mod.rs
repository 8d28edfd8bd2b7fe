// src/handlers/mod.rs

pub mod assignments;
pub mod grades;
pub mod health;
pub mod reports;
pub mod take;
