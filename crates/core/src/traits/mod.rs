//! Boundary traits

mod knowledge;

pub use knowledge::KnowledgeService;
