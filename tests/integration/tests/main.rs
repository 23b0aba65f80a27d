//! End-to-End Integration Tests
//!
//! These tests start a real spid-server on an ephemeral port and drive the
//! handshake endpoints over HTTP.

mod common;
mod handshake_endpoints;
