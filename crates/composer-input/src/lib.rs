//! Insertion Engine and Submission Trigger.
//!
//! Both talk to the page exclusively through [`PagePort`], so they run the
//! same against a live tab ([`CdpPagePort`]) and an in-memory page.

pub mod cdp;
pub mod errors;
#[cfg(any(test, feature = "fake"))]
pub mod fake;
pub mod insertion;
pub mod ports;
pub mod submission;

pub use cdp::CdpPagePort;
pub use errors::PageError;
pub use insertion::{insert, InsertTechnique, Insertion};
pub use ports::PagePort;
pub use submission::{submit, SubmitOutcome, SubmitPolicy};
