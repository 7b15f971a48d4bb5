//! # Mock Support Server Test Suite
//!
//! Unified test crate driving a real server through both transports.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── harness.rs        # Starts a server on ephemeral ports
//! └── integration/      # Cross-transport behavior
//!     └── dual_transport.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p mock-tests
//! cargo test -p mock-tests integration::
//! ```

pub mod harness;
pub mod integration;
