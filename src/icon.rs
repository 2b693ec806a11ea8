//! Icon identities and the pool they are drawn from.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::GameError;

/// Number of slots on the grid, and therefore the length of every
/// selection and round sequence.
pub const GRID_SIZE: usize = 6;

/// Opaque identity of a visual symbol.
///
/// Icons are compared only by equality; the name is whatever the
/// presenter uses to look up the artwork.
#[derive(Debug, Clone, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Icon(String);

impl Icon {
    /// Creates an icon from its name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the icon name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Icon {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Icon {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Ordered, immutable collection of every icon available to the game.
///
/// Construction fails unless the pool can fill the grid with distinct
/// icons, which is what keeps the selection draw terminating.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconPool {
    icons: Vec<Icon>,
}

impl IconPool {
    /// Builds a pool, dropping repeated icons after their first
    /// occurrence and rejecting one with fewer than [`GRID_SIZE`] left.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PoolTooSmall`] when the pool cannot supply a
    /// full grid.
    pub fn new(icons: Vec<Icon>) -> Result<Self, GameError> {
        let mut seen = HashSet::new();
        let icons: Vec<Icon> = icons
            .into_iter()
            .filter(|icon| seen.insert(icon.clone()))
            .collect();
        let distinct = icons.len();
        if distinct < GRID_SIZE {
            return Err(GameError::PoolTooSmall {
                distinct,
                required: GRID_SIZE,
            });
        }
        Ok(Self { icons })
    }

    /// Builds a pool from icon names.
    ///
    /// # Errors
    ///
    /// See [`IconPool::new`].
    pub fn from_names<I, S>(names: I) -> Result<Self, GameError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(names.into_iter().map(Icon::new).collect())
    }

    /// Returns the icons in pool order.
    #[must_use]
    pub fn icons(&self) -> &[Icon] {
        &self.icons
    }

    /// Returns the number of distinct icons.
    #[must_use]
    pub fn len(&self) -> usize {
        self.icons.len()
    }

    /// Always `false`: a valid pool holds at least [`GRID_SIZE`] icons.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.icons.is_empty()
    }

    /// Looks up an icon by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Icon> {
        self.icons.iter().find(|icon| icon.name() == name)
    }
}
