use crate::consts::QOI_INDEX_SIZE;
use crate::pixel::Pixel;

/// Direct-mapped table of recently seen pixels, addressed by `Pixel::hash_index`.
///
/// Each slot holds one pixel; writing a slot evicts its previous occupant.
#[derive(Clone)]
pub struct ColorIndex {
    slots: [Pixel; QOI_INDEX_SIZE],
}

impl Default for ColorIndex {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl ColorIndex {
    #[inline]
    pub const fn new() -> Self {
        Self { slots: [Pixel::ZERO; QOI_INDEX_SIZE] }
    }

    /// Pixel stored at `slot` (the upper two bits are ignored).
    #[inline]
    pub const fn get(&self, slot: u8) -> Pixel {
        self.slots[(slot & 0x3f) as usize]
    }

    /// Stores `px` in its slot and returns the slot number.
    #[inline]
    pub fn insert(&mut self, px: Pixel) -> u8 {
        let slot = px.hash_index();
        self.slots[usize::from(slot)] = px;
        slot
    }

    /// Returns the slot if it already holds `px`; otherwise stores `px` there
    /// and returns `None`.
    #[inline]
    pub fn find_or_insert(&mut self, px: Pixel) -> Option<u8> {
        let slot = px.hash_index();
        let stored = &mut self.slots[usize::from(slot)];
        if stored.packed() == px.packed() {
            Some(slot)
        } else {
            *stored = px;
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_index() {
        let index = ColorIndex::new();
        for slot in 0..64 {
            assert_eq!(index.get(slot), Pixel::ZERO);
        }
        // the all-zero pixel hashes to slot 0 and is found in a fresh index
        assert_eq!(ColorIndex::new().find_or_insert(Pixel::ZERO), Some(0));
    }

    #[test]
    fn test_find_or_insert() {
        let mut index = ColorIndex::new();
        let px = Pixel::new(101, 102, 103, 104);
        assert_eq!(index.find_or_insert(px), None);
        assert_eq!(index.find_or_insert(px), Some(54));
        assert_eq!(index.get(54), px);
    }

    #[test]
    fn test_collision_evicts() {
        // 1 * 3 = 3 and 65 * 3 = 195 = 3 + 3 * 64 both land in slot 3
        let a = Pixel::new(1, 0, 0, 0);
        let b = Pixel::new(65, 0, 0, 0);
        assert_eq!(a.hash_index(), b.hash_index());
        assert_ne!(a, b);

        let mut index = ColorIndex::new();
        let slot = index.insert(a);
        assert_eq!(index.get(slot), a);
        assert_eq!(index.find_or_insert(b), None);
        assert_eq!(index.get(slot), b);
        assert_eq!(index.find_or_insert(a), None);
        assert_eq!(index.get(slot), a);
    }
}
