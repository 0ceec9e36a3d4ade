//! Core data model: messages, saved attachments, and run statistics.

pub mod address;
pub mod attachment;
pub mod message;
pub mod report;
