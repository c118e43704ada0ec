//! Test module organization.
//!
//! This module organizes all integration tests for the DRAM simulator.


/// Batch driver state machine and backpressure tests.
mod driver_tests;



/// Memory standard rule table and node state machine tests.
mod rules_tests;
