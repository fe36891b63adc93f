// Capture data model exports

pub mod finger;
pub mod minutia;
pub mod template;

pub use finger::FingerId;
pub use minutia::{Minutia, MinutiaKind};
pub use template::{FingerTemplate, N_BITS, N_BYTES};
