//! Identifier generation for issues.
//!
//! Issue identifiers are BSON object IDs rendered as 24 lowercase hex
//! characters:
//!
//! - 4 bytes: seconds since the Unix epoch (big-endian)
//! - 5 bytes: process-unique random value
//! - 3 bytes: counter (big-endian)
//!
//! Listing order is identifier order, so every identifier a generator hands
//! out sorts after every identifier it has produced or been told about. When
//! a fresh object ID would not, because it was minted in the same second as a
//! loaded ID by a process with smaller random bytes, the generator issues the
//! successor of the largest known ID instead.
//!
//! # Example
//!
//! ```
//! use issuetrack::id_generation::{validate_id, IdGenerator};
//!
//! let mut generator = IdGenerator::new();
//! let first = generator.generate().unwrap();
//! let second = generator.generate().unwrap();
//!
//! assert!(validate_id(&first));
//! assert!(first < second);
//! ```

use bson::oid::ObjectId;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_ATTEMPTS: u32 = 100;

/// Length of a rendered identifier in characters.
pub const ID_LENGTH: usize = 24;

/// Errors that can occur during ID generation
#[derive(Debug, Error)]
pub enum IdGenerationError {
    /// Every attempt produced an identifier that is already registered
    #[error("Unable to generate unique ID after {attempts} attempts")]
    CollisionExhausted {
        /// Number of candidates tried
        attempts: u32,
    },
}

/// Generator for ordered, collision-checked issue identifiers.
///
/// The generator remembers every identifier it produced or was told about via
/// [`register_id`](Self::register_id), so identifiers are never handed out
/// twice, even after the issue they named has been deleted.
#[derive(Debug, Default)]
pub struct IdGenerator {
    existing_ids: HashSet<String>,

    /// Largest identifier produced or registered so far
    high_water: Option<ObjectId>,
}

impl IdGenerator {
    /// Create a generator that knows no identifiers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an existing ID to prevent collisions.
    ///
    /// Identifiers generated afterwards sort after `id`.
    pub fn register_id(&mut self, id: String) {
        if let Ok(oid) = ObjectId::parse_str(&id) {
            self.raise_high_water(oid);
        }
        self.existing_ids.insert(id);
    }

    /// Number of identifiers known to the generator.
    #[must_use]
    pub fn known_ids(&self) -> usize {
        self.existing_ids.len()
    }

    /// Generate a new unique ID
    ///
    /// # Errors
    ///
    /// Returns an error if every attempt collides with a registered ID.
    pub fn generate(&mut self) -> Result<String, IdGenerationError> {
        for attempt in 0..MAX_ATTEMPTS {
            let oid = self.next_candidate();
            let id = oid.to_hex();

            if !self.existing_ids.contains(&id) {
                if attempt > 0 {
                    debug!(attempt, "Generated unique ID after {} collision retries", attempt);
                }
                self.raise_high_water(oid);
                self.existing_ids.insert(id.clone());
                return Ok(id);
            }
        }

        warn!(
            max_attempts = MAX_ATTEMPTS,
            known_ids = self.existing_ids.len(),
            "ID generation exhausted all attempts"
        );
        Err(IdGenerationError::CollisionExhausted {
            attempts: MAX_ATTEMPTS,
        })
    }

    /// A fresh object ID, or the successor of the high-water mark when the
    /// fresh one would not sort after it.
    fn next_candidate(&self) -> ObjectId {
        let fresh = ObjectId::new();
        match self.high_water {
            Some(last) if fresh <= last => successor(last),
            _ => fresh,
        }
    }

    fn raise_high_water(&mut self, oid: ObjectId) {
        if self.high_water.is_none_or(|last| oid > last) {
            self.high_water = Some(oid);
        }
    }
}

/// The next object ID in byte order.
///
/// Keeps the timestamp prefix unless the lower eight bytes overflow.
fn successor(oid: ObjectId) -> ObjectId {
    let mut wide = [0u8; 16];
    wide[4..].copy_from_slice(&oid.bytes());
    let next = (u128::from_be_bytes(wide) + 1).to_be_bytes();

    let mut bytes = [0u8; 12];
    bytes.copy_from_slice(&next[4..]);
    ObjectId::from_bytes(bytes)
}

/// Validate ID format
///
/// A valid identifier is exactly 24 ASCII hex digits, in either case.
#[must_use]
pub fn validate_id(id: &str) -> bool {
    id.len() == ID_LENGTH && ObjectId::parse_str(id).is_ok()
}
