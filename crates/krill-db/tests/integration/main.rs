mod common;
mod job_tests;
mod run_tests;
