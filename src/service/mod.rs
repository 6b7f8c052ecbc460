pub mod client;
pub mod protocol;

pub use client::{HttpTransport, SubmissionClient, SubmissionOutcome, Transport};
pub use protocol::{LoginRequest, ServerResponse, SignupRequest};
