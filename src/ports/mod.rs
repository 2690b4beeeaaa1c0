//! Ports - Trait definitions for the pipeline's collaborators.

pub mod media;
pub mod queue;
pub mod repository;
