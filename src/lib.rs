//! Intake engine
//!
//! Drives a requester through an ordered questionnaire. Each chat turn, an
//! LLM oracle extracts newly settled answers from the conversation; the
//! resolver merges them and either stops on a terminal answer, asks the next
//! unanswered question, or declares the workflow satisfied.

pub mod advisor;
pub mod api;
pub mod audit;
pub mod config;
pub mod conversation;
pub mod extractor;
pub mod llm;
pub mod workflow;
