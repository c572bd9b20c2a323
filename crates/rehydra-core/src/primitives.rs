//! # Engine Limits
//!
//! Fixed constants of the rehydration engine.

/// Default bound on nested definition rehydration.
///
/// - Each call into another definition adds one level.
/// - Cycles never deepen the stack (they resolve to placeholders), so this
///   only limits long acyclic chains.
/// - Each level costs several stack frames; 256 levels fit a 2 MiB thread
///   stack (the test-thread default) in unoptimized builds.
pub const MAX_CALL_DEPTH: usize = 256;

