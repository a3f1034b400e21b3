//! Tests for the fiber engine
//!
//! Organized by feature area

mod helpers;
mod stack_tests;
