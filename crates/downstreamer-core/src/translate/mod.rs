//! Pure conversions between logical queries, wire shapes and results.
//!
//! Both directions are free of I/O and usable without the dispatcher, e.g. to
//! run a single query without fan-out.

pub mod request;
pub mod response;

pub use request::{params_to_request, request_to_params};
pub use response::{response_to_result, sample_streams_to_matrix, sample_streams_to_vector};
