mod common;
mod fixtures;
mod run_lifecycle_tests;
mod store_tests;
