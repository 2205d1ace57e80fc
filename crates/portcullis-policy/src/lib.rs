//! Portcullis Policy - what may run, and where
//!
//! The pure half of the gateway: the hazard deny-list, launcher detection
//! and workspace confinement. Nothing in here spawns a process.

pub mod confine;
pub mod detect;
pub mod hazard;

pub use confine::{ConfinementError, WorkspaceRoot};
pub use detect::{CommandType, CommandTypeTable};
pub use hazard::{
    HazardClass, HazardDenied, HazardMatch, HazardPolicy, HazardRule, PolicyError,
    ValidationVerdict,
};
