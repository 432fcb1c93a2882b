//! Guide Tour — onboarding walkthrough engine with durable progress.

pub mod config;
pub mod error;
pub mod progress;
pub mod tour;
