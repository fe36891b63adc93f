//! End-to-end enrollment and verification flows

pub mod enroll;
pub mod verify;

use lib_biometric::{FingerId, Minutia};

/// One finger's raw capture as delivered by the capture layer
#[derive(Debug, Clone)]
pub struct FingerCapture {
    pub finger: FingerId,
    pub minutiae: Vec<Minutia>,
}

pub use enroll::{enroll, Enrollment, EnrollmentRequest};
pub use verify::{verify, VerifiedIdentity};
