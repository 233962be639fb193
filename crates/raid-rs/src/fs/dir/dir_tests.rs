use super::*;

#[test]
fn entry_round_trips() {
    let entry = DirEntry {
        inode: 7,
        name: "notes.txt".to_string(),
    };
    let decoded = DirEntry::from_bytes(&entry.to_bytes()).unwrap();
    assert_eq!(decoded, entry);
}

#[test]
fn zero_inode_decodes_as_no_entry() {
    let buf = vec![0u8; DIR_ENTRY_SIZE];
    assert!(DirEntry::from_bytes(&buf).is_none());
}

#[test]
fn encode_then_decode_skips_deleted_slots() {
    let entries = vec![
        DirEntry { inode: 2, name: "a".to_string() },
        DirEntry { inode: 3, name: "b".to_string() },
    ];
    let mut encoded = encode_entries(&entries);
    // Simulate a deletion by zeroing the first slot's inode field.
    encoded[0..8].fill(0);

    let decoded = decode_entries(&encoded);
    assert_eq!(decoded, vec![entries[1].clone()]);
}

#[test]
fn is_valid_name_rejects_reserved_and_malformed_components() {
    assert!(is_valid_name("ok"));
    assert!(!is_valid_name(""));
    assert!(!is_valid_name("."));
    assert!(!is_valid_name(".."));
    assert!(!is_valid_name("a/b"));
    assert!(!is_valid_name(&"x".repeat(NAME_LEN + 1)));
}
