//! Process exit codes
//!
//! Follows sysexits.h for usage errors.

/// Success - every definition was processed or skipped
pub const SUCCESS: i32 = 0;

/// General error - unspecified failure
pub const ERROR: i32 = 1;

/// Validation error - inputs or configuration rejected before any work
pub const VALIDATION_ERROR: i32 = 2;

/// Template error - the template could not be read or merged into
pub const TEMPLATE_ERROR: i32 = 3;

/// Definition error - a CRD, XRD or Terraform module could not be processed
pub const DEFINITION_ERROR: i32 = 4;

/// IO error - file not found, permission denied, etc.
pub const IO_ERROR: i32 = 5;

/// Usage error - invalid arguments or options
pub const USAGE_ERROR: i32 = 64;
