//! CSDL layer tests
//!
//! - Reading documents into a parsed model
//! - Parse-fatal error reporting
//! - Writing and re-reading (round-trip)

mod tests_reader;
mod tests_round_trip;
