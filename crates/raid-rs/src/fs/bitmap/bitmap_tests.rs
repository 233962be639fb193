use super::*;

#[test]
fn fresh_bitmap_is_all_clear() {
    let bitmap = Bitmap::new(20);
    for i in 0..20 {
        assert!(!bitmap.is_set(i));
    }
}

#[test]
fn allocate_returns_lowest_free_bit_and_sets_it() {
    let mut bitmap = Bitmap::new(4);
    assert_eq!(bitmap.allocate(), Some(0));
    assert_eq!(bitmap.allocate(), Some(1));
    bitmap.clear(0);
    assert_eq!(bitmap.allocate(), Some(0));
}

#[test]
fn allocate_returns_none_when_full() {
    let mut bitmap = Bitmap::new(2);
    bitmap.allocate();
    bitmap.allocate();
    assert_eq!(bitmap.allocate(), None);
}

#[test]
fn round_trips_through_bytes() {
    let mut bitmap = Bitmap::new(17);
    bitmap.set(0);
    bitmap.set(16);
    let restored = Bitmap::from_bytes(bitmap.to_bytes(), 17);
    assert_eq!(restored, bitmap);
    assert!(restored.is_set(16));
}
