//! camintake - loan document intake and OCR orchestration.
//!
//! Accepts uploaded ZIP archives of scanned loan documents, extracts
//! them into per-request staging directories, drives an external OCR
//! engine as a subprocess, and reconciles the results into document
//! records for downstream review.

pub mod cli;
pub mod config;
pub mod intake;
pub mod registry;
pub mod server;
pub mod storage;
pub mod utils;
