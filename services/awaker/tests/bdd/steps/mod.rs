//! BDD step definitions for the awaker client core

pub mod connectivity_steps;
