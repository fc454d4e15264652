//! Utility functions for the Coopnet federation substrate

use uuid::Uuid;

/// Generate a random UUID
pub fn generate_uuid() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a random record key for a repository write
pub fn generate_record_key() -> String {
    Uuid::new_v4().simple().to_string()
}
