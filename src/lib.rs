// src/lib.rs

//! Atlas job board sync library.
//!
//! Scrapes the job board listing page and replaces a Firestore collection
//! with the postings found, recording each run in a metadata document.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
