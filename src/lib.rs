// Re-export the core zap functionality
pub use zap_in_core::*;
