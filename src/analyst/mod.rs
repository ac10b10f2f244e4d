//! External analysis collaborator.
//!
//! This module provides the client that hands the report text to the
//! text-completion service.

pub mod client;

pub use client::{AnalysisClient, AnalysisRequest, AnalysisResponse, AnalystConfig, HttpAnalyst};
