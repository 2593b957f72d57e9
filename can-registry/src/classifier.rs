//! Category classification by identifier range
//!
//! The band table below is authoritative: catalog entries are checked against
//! it when the descriptor table is built.

use crate::types::Category;
use std::ops::RangeInclusive;

/// A contiguous identifier band and the category it belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Band {
    pub first: u16,
    pub last: u16,
    pub category: Category,
}

impl Band {
    const fn new(first: u16, last: u16, category: Category) -> Self {
        Self { first, last, category }
    }

    pub fn range(&self) -> RangeInclusive<u16> {
        self.first..=self.last
    }

    pub fn contains(&self, id: u16) -> bool {
        self.first <= id && id <= self.last
    }

    pub fn len(&self) -> usize {
        (self.last - self.first) as usize + 1
    }
}

/// Protocol bands in ascending identifier order, bounds inclusive
pub const BANDS: [Band; 10] = [
    Band::new(0x100, 0x10F, Category::ErrorAlarm),
    Band::new(0x110, 0x13F, Category::SwitchControl),
    Band::new(0x200, 0x23F, Category::DisplayConfig),
    Band::new(0x400, 0x41F, Category::Introduction),
    Band::new(0x420, 0x43F, Category::Configuration),
    Band::new(0x500, 0x53F, Category::SensorData),
    Band::new(0x700, 0x73F, Category::DeviceDescriptor),
    Band::new(0x740, 0x74F, Category::OutputDescriptor),
    Band::new(0x750, 0x77F, Category::Reserved),
    Band::new(0x780, 0x79F, Category::InterfaceDescriptor),
];

/// Controller-assignable 64-bit sensor payload band
pub const DYNAMIC_BAND: RangeInclusive<u16> = 0x52A..=0x53F;

/// Derive the category of `id`, or `None` if it is outside every band
pub fn classify(id: u16) -> Option<Category> {
    band_of(id).map(|band| band.category)
}

/// The band containing `id`
pub fn band_of(id: u16) -> Option<&'static Band> {
    BANDS.iter().find(|band| band.contains(id))
}

/// True if `id` belongs to the closed protocol space
pub fn in_protocol_space(id: u16) -> bool {
    band_of(id).is_some()
}

/// True if `id` lies in the dynamically assignable sensor band
pub fn is_dynamic(id: u16) -> bool {
    DYNAMIC_BAND.contains(&id)
}

/// All bands of a category (every category currently maps to exactly one)
pub fn bands_for(category: Category) -> impl Iterator<Item = &'static Band> {
    BANDS.iter().filter(move |band| band.category == category)
}

/// Iterate over every identifier of the protocol space in ascending order
pub fn protocol_ids() -> impl Iterator<Item = u16> {
    BANDS.iter().flat_map(|band| band.range())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_boundaries() {
        assert_eq!(classify(0x100), Some(Category::ErrorAlarm));
        assert_eq!(classify(0x10F), Some(Category::ErrorAlarm));
        assert_eq!(classify(0x110), Some(Category::SwitchControl));
        assert_eq!(classify(0x41F), Some(Category::Introduction));
        assert_eq!(classify(0x420), Some(Category::Configuration));
        assert_eq!(classify(0x74F), Some(Category::OutputDescriptor));
        assert_eq!(classify(0x750), Some(Category::Reserved));
        assert_eq!(classify(0x79F), Some(Category::InterfaceDescriptor));
    }

    #[test]
    fn test_gaps_are_unclassified() {
        for id in [0x000, 0x0FF, 0x140, 0x300, 0x440, 0x540, 0x6FF, 0x7A0, 0x7FF] {
            assert_eq!(classify(id), None, "0x{:03X} should be outside the space", id);
        }
    }

    #[test]
    fn test_bands_are_ordered_and_disjoint() {
        for pair in BANDS.windows(2) {
            assert!(pair[0].last < pair[1].first);
        }
        for category in Category::ALL {
            assert_eq!(bands_for(category).count(), 1);
        }
    }

    #[test]
    fn test_dynamic_band_inside_sensor_band() {
        assert!(is_dynamic(0x52A));
        assert!(is_dynamic(0x53F));
        assert!(!is_dynamic(0x529));
        assert_eq!(classify(*DYNAMIC_BAND.start()), Some(Category::SensorData));
        assert_eq!(classify(*DYNAMIC_BAND.end()), Some(Category::SensorData));
    }

    #[test]
    fn test_protocol_space_size() {
        let total: usize = BANDS.iter().map(Band::len).sum();
        assert_eq!(protocol_ids().count(), total);
        assert_eq!(total, 416);
    }
}
