//! Validation tests over parsed documents.

mod tests_validate;
