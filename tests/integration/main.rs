//! Integration tests for News Harvester

mod pipeline_tests;
mod storage_tests;
mod support;
