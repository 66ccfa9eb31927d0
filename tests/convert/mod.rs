//! Converter tests: parsed to builder and back, and model comparison.

mod tests_convert;
