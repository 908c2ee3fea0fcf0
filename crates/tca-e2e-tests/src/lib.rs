//! End-to-end tests for the threshold crossing analytics pipeline.
//!
//! These tests exercise the full stack:
//! - Policy loading from a document
//! - The four-stage chain over real event envelopes
//! - Status records, row keys and sinks
//! - The worker pool sharing one policy across workers

#![cfg(test)]
