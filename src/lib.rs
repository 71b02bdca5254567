//! lambda-fetch - materialize Lambda deployment packages on local disk
//!
//! Discovers the Lambda functions referenced by a Step Functions state
//! machine (or the whole account inventory), downloads each function's
//! deployment archive from its presigned location, and unpacks it. Work a
//! previous run already completed is skipped.

pub mod aws;
pub mod cache;
pub mod config;
pub mod discover;
pub mod fetch;
