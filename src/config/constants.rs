//! # Configuration Constants
//!
//! This module centralizes the numeric configuration of the view protocol.
//! Constants that depend on each other are co-located and their relationships
//! are enforced through compile-time assertions.
//!
//! ## Dependency Graph
//!
//! ```text
//! OFFSET_WIDTH (4 bytes, u32 LE)
//!       │
//!       ├─> Map header:        required bytes + OFFSET_WIDTH * (optional + 1)
//!       ├─> Vector header:     OFFSET_WIDTH * (count + 2)
//!       └─> Collection header: OFFSET_WIDTH * arity
//!
//! BITAP_REGISTER_BITS (64)
//!       │
//!       └─> BITAP_MAX_NEEDLE_LEN (must be <=)
//!             The shift-or match state lives in one u64; a needle longer
//!             than the register cannot be represented.
//!
//! DEFAULT_SCRATCH_CAPACITY (8192)
//!       │
//!       └─> ScratchBuffer::default(); encodes whose exact length exceeds
//!           the capacity fail with CapacityExceeded.
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use structview::config::{DEFAULT_SCRATCH_CAPACITY, OFFSET_WIDTH};
//! ```

// ============================================================================
// WIRE FORMAT
// ============================================================================

/// Width of every offset-table entry, count and length marker (u32 LE).
pub const OFFSET_WIDTH: usize = 4;

/// Size of a vector's leading item count.
pub const VECTOR_COUNT_WIDTH: usize = OFFSET_WIDTH;

/// Size of a map's trailing used-length marker.
pub const MAP_LENGTH_MARKER_WIDTH: usize = OFFSET_WIDTH;

const _: () = assert!(
    OFFSET_WIDTH == std::mem::size_of::<u32>(),
    "offset tables are encoded as u32"
);

// ============================================================================
// STRING SEARCH
// Selects between the naive scan and the bitap (shift-or) scan
// ============================================================================

/// Number of bits in the bitap match register.
pub const BITAP_REGISTER_BITS: usize = 64;

/// Haystacks longer than this use bitap when the needle is short enough.
pub const BITAP_MIN_HAYSTACK_LEN: usize = 512;

/// Longest needle bitap accepts.
pub const BITAP_MAX_NEEDLE_LEN: usize = 64;

const _: () = assert!(
    BITAP_MAX_NEEDLE_LEN <= BITAP_REGISTER_BITS,
    "BITAP_MAX_NEEDLE_LEN must fit in the bitap register"
);

// ============================================================================
// SCRATCH ENCODING
// ============================================================================

/// Default maximum size of a scratch buffer used for variable-length encodes.
pub const DEFAULT_SCRATCH_CAPACITY: usize = 8192;

const _: () = assert!(
    DEFAULT_SCRATCH_CAPACITY >= 2 * OFFSET_WIDTH,
    "scratch must hold at least an empty vector header"
);
