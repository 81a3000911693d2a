//! # Communications interface crate.
//!
//! Provides all common interface types shared between the navigation software and the equipment
//! it talks to (camera, drive controller).

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Command, frame and marker definitions for equipment (like the drive controller)
pub mod eqpt;
