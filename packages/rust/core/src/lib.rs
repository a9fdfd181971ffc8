//! Core orchestration and domain logic for SiteSage.
//!
//! This crate ties crawling, corpus assembly, knowledge-base publishing,
//! and question-answering into end-to-end workflows (`process_site`, `ask`).

pub mod corpus;
pub mod locks;
pub mod pipeline;
pub mod publish;
pub mod qa;
