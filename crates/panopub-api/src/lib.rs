//! Panopub control plane
//!
//! Request/response server for the ingestion pipeline: upload grants, the
//! upload-complete notice, progress polling, the processor webhook, and the
//! publish/archive lifecycle. No endpoint runs longer than an ordinary HTTP
//! request; the minutes-long work happens in the external processor.

pub mod api_doc;
pub mod auth;
pub mod constants;
pub mod error;
pub mod handlers;
pub mod services;
pub mod setup;
pub mod state;
pub mod webhook;
