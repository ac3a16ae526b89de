//! Command-level tests

mod test_threads;
