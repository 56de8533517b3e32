//! Material database with elastic solid presets.
//!
//! Presets cover the stiffness range the solver is tuned for, from
//! gel-like tissue to firm rubber.

use std::collections::HashMap;

use crate::properties::ElasticMaterial;

/// A named collection of elastic material presets.
///
/// Materials are looked up by name (e.g., "rubber", "soft_tissue").
/// Custom materials can be registered at runtime.
#[derive(Debug, Clone)]
pub struct MaterialDatabase {
    materials: HashMap<String, ElasticMaterial>,
}

impl MaterialDatabase {
    /// Creates a new database with the 5 built-in presets.
    pub fn with_defaults() -> Self {
        let mut db = Self {
            materials: HashMap::new(),
        };

        db.register(rubber());
        db.register(silicone());
        db.register(foam());
        db.register(soft_tissue());
        db.register(gelatin());

        db
    }

    /// Creates an empty database.
    pub fn empty() -> Self {
        Self {
            materials: HashMap::new(),
        }
    }

    /// Registers a material, replacing any preset with the same name.
    pub fn register(&mut self, material: ElasticMaterial) {
        self.materials.insert(material.name.clone(), material);
    }

    /// Looks up a material by name. Returns `None` if not found.
    pub fn get(&self, name: &str) -> Option<&ElasticMaterial> {
        self.materials.get(name)
    }

    /// Returns all registered material names.
    pub fn names(&self) -> Vec<&str> {
        self.materials.keys().map(|s| s.as_str()).collect()
    }

    /// Returns the number of registered materials.
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    /// Returns true if the database is empty.
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

impl Default for MaterialDatabase {
    fn default() -> Self {
        Self::with_defaults()
    }
}

// ─── Built-in Presets ─────────────────────────────────────────────────

/// Natural rubber. Stiff and nearly incompressible.
fn rubber() -> ElasticMaterial {
    ElasticMaterial::new("rubber", 1.0e6, 0.45)
}

/// Platinum-cure silicone, a common soft-robotics elastomer.
fn silicone() -> ElasticMaterial {
    ElasticMaterial::new("silicone", 5.0e5, 0.48)
}

/// Open-cell foam. Compressible, so volume changes noticeably.
fn foam() -> ElasticMaterial {
    ElasticMaterial::new("foam", 1.0e5, 0.3)
}

/// Generic soft tissue.
fn soft_tissue() -> ElasticMaterial {
    ElasticMaterial::new("soft_tissue", 1.0e4, 0.45)
}

/// Gelatin, the softest preset.
fn gelatin() -> ElasticMaterial {
    ElasticMaterial::new("gelatin", 5.0e3, 0.49)
}
