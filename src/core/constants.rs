// ============================================================================
// spark-aggregate - Constants
// Flag constants for subscriber and leaf state, plus builder limits
// ============================================================================

// =============================================================================
// SUBSCRIBER FLAGS
// =============================================================================

/// Subscriber no longer forwards anything (unsubscribed or terminated)
pub const CLOSED: u32 = 1 << 0;

/// Subscriber delivered `complete`
pub const COMPLETED: u32 = 1 << 1;

/// Subscriber delivered `error`
pub const ERRORED: u32 = 1 << 2;

/// Subscriber is currently running its teardowns
pub const TEARING_DOWN: u32 = 1 << 3;

// =============================================================================
// LEAF STATE FLAGS
// =============================================================================

/// Leaf has produced at least one value
pub const LEAF_HAS_VALUE: u32 = 1 << 8;

/// Leaf reported completion
pub const LEAF_COMPLETED: u32 = 1 << 9;

/// Leaf reported an error
pub const LEAF_ERRORED: u32 = 1 << 10;

/// Leaf subscription was cancelled by the activation
pub const LEAF_CANCELLED: u32 = 1 << 11;

/// Any flag after which a leaf accepts no further events
pub const LEAF_TERMINAL_MASK: u32 = LEAF_COMPLETED | LEAF_ERRORED | LEAF_CANCELLED;

// =============================================================================
// BUILDER LIMITS
// =============================================================================

/// Default maximum nesting depth accepted by the tree builder
pub const DEFAULT_MAX_DEPTH: usize = 64;

// =============================================================================
// TESTS
// =============================================================================
