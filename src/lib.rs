//! Asynchronous download file writer.
//!
//! Consumes an ordered byte stream produced by a network transfer, persists
//! it to a temp file, folds the written bytes into a running SHA-256,
//! reports rate-limited progress, and supports cancel and offset-based
//! resume. Each download runs on its own dedicated task.

pub mod config;
pub mod logging;

pub mod control;
pub mod diag;
pub mod error;
pub mod hasher;
pub mod observer;
pub mod progress;
pub mod save_info;
pub mod storage;
pub mod stream;
pub mod writer;
