//! Bitmap → texture unit assignment.
//!
//! GPU handles persist across frames, keyed by [`BitmapId`]. Unit assignments
//! do not: the slot table is wiped at every [`TextureSlotCache::begin_frame`],
//! and a record's unit is trusted only while the slot table still says the
//! unit holds that bitmap.
//!
//! When every unit is taken, new requests share unit 0. The previous occupant
//! of unit 0 may then sample the wrong texture if it is drawn again in the same
//! frame; the frame still completes.

use std::collections::HashMap;

use crate::device::{GraphicsDevice, PixelData, SamplerParams};

use super::RenderError;
use super::node::{Bitmap, BitmapId};

struct TextureRecord<T> {
    texture: T,
    /// Last unit this texture was bound to.
    unit: usize,
}

/// Per-frame counters.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub struct CacheStats {
    /// Pixel uploads (first upload or dirty re-upload).
    pub uploads: usize,
    /// Existing textures rebound to a new unit without upload.
    pub rebinds: usize,
    /// Requests that found every unit taken and fell back to unit 0.
    pub unit_overflows: usize,
}

pub struct TextureSlotCache<T> {
    records: HashMap<BitmapId, TextureRecord<T>>,
    slots: Vec<Option<BitmapId>>,
    scratch: Vec<u8>,
    stats: CacheStats,
    overflow_logged: bool,
}

impl<T> TextureSlotCache<T> {
    /// `budget` is clamped to at least one unit.
    pub fn new(budget: usize) -> Self {
        Self {
            records: HashMap::new(),
            slots: vec![None; budget.max(1)],
            scratch: Vec::new(),
            stats: CacheStats::default(),
            overflow_logged: false,
        }
    }

    #[inline]
    pub fn budget(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    /// Number of bitmaps holding a GPU texture.
    #[inline]
    pub fn resident(&self) -> usize {
        self.records.len()
    }

    /// Bitmap occupying `unit` in the current frame.
    pub fn occupant(&self, unit: usize) -> Option<BitmapId> {
        self.slots.get(unit).copied().flatten()
    }

    /// Forgets every unit assignment and resets the counters.
    pub fn begin_frame(&mut self) {
        self.slots.fill(None);
        self.stats = CacheStats::default();
        self.overflow_logged = false;
    }

    /// Returns the unit `bitmap` is bound to for this frame, binding and
    /// uploading as needed. The result is always below [`Self::budget`].
    ///
    /// A rejected upload is returned as an error. The bitmap then stays dirty
    /// and claims no unit, so the next call tries again.
    pub fn assign<D>(&mut self, device: &mut D, bitmap: &mut Bitmap) -> Result<usize, RenderError>
    where
        D: GraphicsDevice<Texture = T>,
    {
        let id = bitmap.id();

        let (unit, fresh) = match self.records.get(&id).map(|r| r.unit) {
            Some(unit) if self.occupant(unit) == Some(id) => (unit, false),
            Some(_) => {
                let unit = self.claim_unit();
                if let Some(record) = self.records.get_mut(&id) {
                    device.bind_texture(unit, &record.texture);
                    record.unit = unit;
                }
                self.stats.rebinds += 1;
                (unit, false)
            }
            None => {
                let texture = device.create_texture()?;
                let unit = self.claim_unit();
                device.bind_texture(unit, &texture);
                self.records.insert(id, TextureRecord { texture, unit });
                (unit, true)
            }
        };

        if fresh || bitmap.needs_update() {
            if let Some(record) = self.records.get(&id) {
                let rgba = bitmap.premultiplied(&mut self.scratch);
                device.upload_pixels(
                    &record.texture,
                    PixelData { width: bitmap.width(), height: bitmap.height(), rgba },
                    SamplerParams::linear_clamp(),
                )?;
                self.stats.uploads += 1;
            }
            bitmap.mark_uploaded();
        }

        self.slots[unit] = Some(id);
        log::trace!("bitmap {id:?} -> unit {unit}");
        Ok(unit)
    }

    /// Deletes the texture held for `id`, if any, and frees its slot.
    pub fn release<D>(&mut self, device: &mut D, id: BitmapId)
    where
        D: GraphicsDevice<Texture = T>,
    {
        let Some(record) = self.records.remove(&id) else {
            return;
        };
        if let Some(slot) = self.slots.get_mut(record.unit) {
            if *slot == Some(id) {
                *slot = None;
            }
        }
        device.delete_texture(record.texture);
    }

    /// Deletes every texture.
    pub fn release_all<D>(&mut self, device: &mut D)
    where
        D: GraphicsDevice<Texture = T>,
    {
        self.slots.fill(None);
        for (_, record) in self.records.drain() {
            device.delete_texture(record.texture);
        }
    }

    fn claim_unit(&mut self) -> usize {
        if let Some(free) = self.slots.iter().position(Option::is_none) {
            return free;
        }

        self.stats.unit_overflows += 1;
        if !self.overflow_logged {
            self.overflow_logged = true;
            log::warn!(
                "all {} texture units in use this frame; sharing unit 0",
                self.slots.len()
            );
        }
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::DeviceError;
    use crate::device::fake::{Call, FakeDevice, FakeTexture};
    use crate::render::node::AlphaMode;

    fn bitmap() -> Bitmap {
        Bitmap::new(2, 1, vec![255; 8], AlphaMode::Premultiplied).unwrap()
    }

    fn setup(units: usize) -> (FakeDevice, TextureSlotCache<FakeTexture>) {
        (FakeDevice::with_units(units), TextureSlotCache::new(units))
    }

    // ── unit assignment ───────────────────────────────────────────────────

    #[test]
    fn distinct_bitmaps_get_distinct_units() {
        let (mut dev, mut cache) = setup(4);
        let mut bitmaps: Vec<Bitmap> = (0..4).map(|_| bitmap()).collect();

        let units: Vec<usize> = bitmaps
            .iter_mut()
            .map(|b| cache.assign(&mut dev, b).unwrap())
            .collect();

        assert_eq!(units, vec![0, 1, 2, 3]);
        assert_eq!(cache.stats().unit_overflows, 0);
        assert_eq!(dev.uploads(), 4);
    }

    #[test]
    fn exhausted_budget_falls_back_to_unit_zero() {
        let (mut dev, mut cache) = setup(2);
        let mut a = bitmap();
        let mut b = bitmap();
        let mut c = bitmap();

        cache.assign(&mut dev, &mut a).unwrap();
        cache.assign(&mut dev, &mut b).unwrap();
        let unit = cache.assign(&mut dev, &mut c).unwrap();

        assert_eq!(unit, 0);
        assert_eq!(cache.occupant(0), Some(c.id()));
        assert_eq!(cache.stats().unit_overflows, 1);
    }

    #[test]
    fn zero_budget_is_clamped() {
        let cache = TextureSlotCache::<FakeTexture>::new(0);
        assert_eq!(cache.budget(), 1);
    }

    // ── uploads ───────────────────────────────────────────────────────────

    #[test]
    fn clean_bitmap_is_not_uploaded_twice() {
        let (mut dev, mut cache) = setup(4);
        let mut a = bitmap();

        let first = cache.assign(&mut dev, &mut a).unwrap();
        let second = cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(first, second);
        assert_eq!(dev.uploads(), 1);
        assert_eq!(dev.binds(), 1);
        assert!(!a.needs_update());
    }

    #[test]
    fn dirty_bitmap_uploads_once_into_same_texture() {
        let (mut dev, mut cache) = setup(4);
        let mut a = bitmap();
        cache.assign(&mut dev, &mut a).unwrap();
        dev.forget_calls();

        a.pixels_mut()[0] = 7;
        cache.assign(&mut dev, &mut a).unwrap();
        cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(dev.uploads(), 1);
        assert_eq!(dev.textures_created(), 0);
        assert!(!a.needs_update());
        assert_eq!(dev.pixels[&1][0], 7);
    }

    #[test]
    fn first_upload_uses_linear_clamp() {
        let (mut dev, mut cache) = setup(1);
        cache.assign(&mut dev, &mut bitmap()).unwrap();
        assert_eq!(dev.sampler, Some(SamplerParams::linear_clamp()));
    }

    #[test]
    fn straight_alpha_is_premultiplied_on_upload() {
        let (mut dev, mut cache) = setup(1);
        let mut a = Bitmap::new(1, 1, vec![255, 128, 0, 128], AlphaMode::Straight).unwrap();

        cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(dev.pixels[&1], vec![128, 64, 0, 128]);
        // Source pixels stay straight.
        assert_eq!(a.pixels(), &[255, 128, 0, 128]);
    }

    // ── frames ────────────────────────────────────────────────────────────

    #[test]
    fn next_frame_rebinds_without_upload() {
        let (mut dev, mut cache) = setup(4);
        let mut a = bitmap();
        cache.assign(&mut dev, &mut a).unwrap();

        cache.begin_frame();
        dev.forget_calls();
        let unit = cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(unit, 0);
        assert_eq!(dev.uploads(), 0);
        assert_eq!(dev.calls, vec![Call::Bind { unit: 0, texture: 1 }]);
        assert_eq!(cache.stats().rebinds, 1);
    }

    #[test]
    fn displaced_bitmap_moves_to_a_free_unit() {
        let (mut dev, mut cache) = setup(2);
        let mut a = bitmap();
        let mut b = bitmap();
        cache.assign(&mut dev, &mut a).unwrap();

        // Next frame `b` takes unit 0, so `a` must move.
        cache.begin_frame();
        cache.assign(&mut dev, &mut b).unwrap();
        let unit = cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(unit, 1);
        assert_eq!(dev.bound, vec![Some(2), Some(1)]);
    }

    #[test]
    fn begin_frame_resets_counters() {
        let (mut dev, mut cache) = setup(1);
        cache.assign(&mut dev, &mut bitmap()).unwrap();
        cache.assign(&mut dev, &mut bitmap()).unwrap();
        assert_eq!(cache.stats().uploads, 2);
        assert_eq!(cache.stats().unit_overflows, 1);

        cache.begin_frame();
        assert_eq!(cache.stats(), CacheStats::default());
        assert_eq!(cache.occupant(0), None);
    }

    // ── unit pressure ─────────────────────────────────────────────────────

    #[test]
    fn known_bitmap_shares_unit_zero_when_units_run_out() {
        let (mut dev, mut cache) = setup(2);
        let mut a = bitmap();
        let mut b = bitmap();
        let mut c = bitmap();
        cache.assign(&mut dev, &mut a).unwrap();

        cache.begin_frame();
        cache.assign(&mut dev, &mut b).unwrap();
        cache.assign(&mut dev, &mut c).unwrap();
        dev.forget_calls();

        // `a` still owns a texture but every unit is taken.
        let unit = cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(unit, 0);
        assert_eq!(dev.uploads(), 0);
        assert_eq!(dev.binds(), 1);
        assert_eq!(cache.stats().unit_overflows, 1);
        assert_eq!(cache.occupant(0), Some(a.id()));
    }

    #[test]
    fn dirty_bitmap_moved_to_new_unit_uploads_once() {
        let (mut dev, mut cache) = setup(2);
        let mut a = bitmap();
        let mut b = bitmap();
        cache.assign(&mut dev, &mut a).unwrap();

        cache.begin_frame();
        cache.assign(&mut dev, &mut b).unwrap();
        a.pixels_mut()[0] = 9;
        dev.forget_calls();

        let unit = cache.assign(&mut dev, &mut a).unwrap();

        assert_eq!(unit, 1);
        assert_eq!(dev.uploads(), 1);
        assert_eq!(dev.uploads_of(1), 1);
        assert_eq!(dev.textures_created(), 0);
        assert_eq!(dev.bound, vec![Some(2), Some(1)]);
        assert!(!a.needs_update());
    }

    #[test]
    fn rejected_upload_keeps_bitmap_dirty() {
        let (mut dev, mut cache) = setup(2);
        dev.max_texture_size = 1;
        let mut a = bitmap();

        let err = cache.assign(&mut dev, &mut a).unwrap_err();

        assert!(matches!(err, RenderError::Device(DeviceError::TextureSize { width: 2, .. })));
        assert_eq!(cache.stats().uploads, 0);
        assert_eq!(cache.occupant(0), None);
        assert!(a.needs_update());

        // Retried once the device can take it.
        dev.max_texture_size = 8192;
        assert_eq!(cache.assign(&mut dev, &mut a).unwrap(), 0);
        assert_eq!(cache.stats().uploads, 1);
        assert_eq!(dev.textures_created(), 1);
        assert!(!a.needs_update());
    }

    // ── release ───────────────────────────────────────────────────────────

    #[test]
    fn release_deletes_texture_and_frees_slot() {
        let (mut dev, mut cache) = setup(2);
        let mut a = bitmap();
        cache.assign(&mut dev, &mut a).unwrap();

        cache.release(&mut dev, a.id());

        assert!(dev.calls.contains(&Call::Delete(1)));
        assert_eq!(cache.occupant(0), None);
        assert_eq!(cache.resident(), 0);

        // A later draw starts over with a new texture.
        a.mark_dirty();
        cache.assign(&mut dev, &mut a).unwrap();
        assert_eq!(dev.textures_created(), 2);
    }

    #[test]
    fn release_of_unknown_bitmap_is_ignored() {
        let (mut dev, mut cache) = setup(1);
        cache.release(&mut dev, bitmap().id());
        assert!(dev.calls.is_empty());
    }
}
