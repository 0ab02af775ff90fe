// ── Dense positional index ──
//
// Flow filter entries are evaluated in position order, and positions
// must stay dense and duplicate-free across every mutation. This index
// owns that invariant: position IS the vector index, so a gap or a
// duplicate cannot be represented at all. Inserting shifts everything
// at or above the slot up by one; removing shifts back down.

/// Items stored in an [`OrderedIndex`] expose a stable key, independent
/// of their (renumberable) position.
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Rejections raised before any shift is applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    /// An item with this key is already present.
    DuplicateKey(String),
    /// Position would leave a gap: valid slots are `0..=len`.
    OutOfRange { position: usize, len: usize },
}

/// An ordered collection whose positions are always `0..len`.
#[derive(Debug, Clone, Default)]
pub struct OrderedIndex<T> {
    items: Vec<T>,
}

impl<T: Keyed> OrderedIndex<T> {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Insert `item` at `position`, shifting items at `position..` up.
    pub fn insert_at(&mut self, position: usize, item: T) -> Result<(), IndexError> {
        if self.position_of(item.key()).is_some() {
            return Err(IndexError::DuplicateKey(item.key().to_owned()));
        }
        if position > self.items.len() {
            return Err(IndexError::OutOfRange {
                position,
                len: self.items.len(),
            });
        }
        self.items.insert(position, item);
        Ok(())
    }

    /// Remove the item with `key`, shifting later items down. Returns
    /// the vacated position and the item, or `None` if absent.
    pub fn remove(&mut self, key: &str) -> Option<(usize, T)> {
        let position = self.position_of(key)?;
        Some((position, self.items.remove(position)))
    }

    /// Current position of the item with `key`.
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.items.iter().position(|item| item.key() == key)
    }

    pub fn get(&self, key: &str) -> Option<(usize, &T)> {
        let position = self.position_of(key)?;
        Some((position, &self.items[position]))
    }

    pub fn get_mut(&mut self, key: &str) -> Option<(usize, &mut T)> {
        let position = self.position_of(key)?;
        Some((position, &mut self.items[position]))
    }

    /// Iterate `(position, item)` in evaluation order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.items.iter().enumerate()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut T)> {
        self.items.iter_mut().enumerate()
    }
}
