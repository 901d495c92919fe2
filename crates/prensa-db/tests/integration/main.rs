mod article_tests;
mod common;
mod queue_tests;
