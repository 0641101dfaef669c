//! Property-based tests for matching and racing.
