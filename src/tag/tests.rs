use super::*;
use std::sync::Arc;
use std::thread;

fn mac(last: u8) -> Mac {
    Mac([last, 0, 0, 0, 0, 0, 0, 0])
}

#[test]
fn test_mac_hex_round_trip() {
    let parsed: Mac = "0000021C7B3A5D11".parse().unwrap();
    assert_eq!(parsed.0[0], 0x11);
    assert_eq!(parsed.0[7], 0x00);
    assert_eq!(parsed.to_hex(), "0000021C7B3A5D11");
    assert_eq!(parsed.to_string(), "0000021C7B3A5D11");
}

#[test]
fn test_mac_parse_errors() {
    assert_eq!(
        "1234".parse::<Mac>(),
        Err(MacParseError::InvalidLength(4))
    );
    assert!(matches!(
        "000000000000ZZ11".parse::<Mac>(),
        Err(MacParseError::InvalidHex(_))
    ));
    // Sixteen bytes, but not sixteen hex digits
    assert!(matches!(
        "a\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}\u{e9}b".parse::<Mac>(),
        Err(MacParseError::InvalidHex(_))
    ));
}

#[test]
fn test_wake_reason_codes() {
    assert_eq!(WakeReason::from_code(0x02), WakeReason::Gpio);
    assert_eq!(WakeReason::from_code(0xFC), WakeReason::FirstBoot);
    assert_eq!(WakeReason::from_code(0x42), WakeReason::None);
    assert!(WakeReason::Nfc.forces_render());
    assert!(!WakeReason::FirstBoot.forces_render());
    assert!(WakeReason::WatchdogReset.is_boot());
}

#[test]
fn test_registration_order_is_kept() {
    let db = TagDb::new();
    assert!(db.register(TagRecord::new(mac(3), 0)));
    assert!(db.register(TagRecord::new(mac(1), 0)));
    assert!(db.register(TagRecord::new(mac(2), 0)));

    // Re-registering replaces the record without moving it
    let mut replaced = TagRecord::new(mac(1), 5);
    replaced.rssi = -60;
    assert!(!db.register(replaced));

    assert_eq!(db.macs(), vec![mac(3), mac(1), mac(2)]);
    assert_eq!(db.get(&mac(1)).unwrap().hw_type, 5);
    assert_eq!(db.len(), 3);
}

#[test]
fn test_report_checkin_clears_pending_idle() {
    let db = TagDb::new();
    let mut record = TagRecord::new(mac(1), 0);
    record.pending_idle = 30;
    db.register(record);

    assert!(db.report_checkin(&mac(1), -55, WakeReason::Gpio, 1_000));

    let tag = db.get(&mac(1)).unwrap();
    assert_eq!(tag.rssi, -55);
    assert_eq!(tag.wake_reason, WakeReason::Gpio);
    assert_eq!(tag.expected_next_checkin, 1_000);
    assert_eq!(tag.pending_idle, 0);

    assert!(!db.report_checkin(&mac(9), -55, WakeReason::None, 0));
}

#[test]
fn test_pending_idle_set_and_clear() {
    let db = TagDb::new();
    db.register(TagRecord::new(mac(1), 0));

    assert!(db.set_pending_idle(&mac(1), 12));
    assert_eq!(db.get(&mac(1)).unwrap().pending_idle, 12);
    assert!(db.clear_pending_idle(&mac(1)));
    assert_eq!(db.get(&mac(1)).unwrap().pending_idle, 0);
    assert!(!db.clear_pending_idle(&mac(2)));
}

#[test]
fn test_apply_dispatch_keeps_transport_fields() {
    let db = TagDb::new();
    let mut record = TagRecord::new(mac(1), 0);
    record.wake_reason = WakeReason::Gpio;
    db.register(record);

    let mut dispatched = db.get(&mac(1)).unwrap();
    dispatched.next_update = 5_000;
    dispatched.mode_config = r#"{"counter":1}"#.to_string();

    // A checkin lands while the dispatch is in flight
    db.report_checkin(&mac(1), -40, WakeReason::None, 777);
    db.apply_dispatch(&dispatched, WakeReason::Gpio);

    let tag = db.get(&mac(1)).unwrap();
    assert_eq!(tag.next_update, 5_000);
    assert_eq!(tag.mode_config, r#"{"counter":1}"#);
    assert_eq!(tag.wake_reason, WakeReason::None);
    assert_eq!(tag.rssi, -40);
    assert_eq!(tag.expected_next_checkin, 777);
}

#[test]
fn test_apply_dispatch_keeps_newer_wake() {
    let db = TagDb::new();
    let mut record = TagRecord::new(mac(1), 0);
    record.wake_reason = WakeReason::Gpio;
    db.register(record);

    let dispatched = db.get(&mac(1)).unwrap();

    // An NFC tap is reported while the button render is in flight
    db.report_checkin(&mac(1), -40, WakeReason::Nfc, 777);
    db.apply_dispatch(&dispatched, WakeReason::Gpio);
    assert_eq!(db.get(&mac(1)).unwrap().wake_reason, WakeReason::Nfc);

    // The next render consumes it
    let dispatched = db.get(&mac(1)).unwrap();
    db.apply_dispatch(&dispatched, WakeReason::Nfc);
    assert_eq!(db.get(&mac(1)).unwrap().wake_reason, WakeReason::None);
}

#[test]
fn test_save_and_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags.json");

    let db = TagDb::new();
    let mut record = TagRecord::new(mac(2), 1);
    record.content_mode = 3;
    record.next_update = NEVER;
    db.register(record);
    db.register(TagRecord::new(mac(1), 0));
    db.save_to_file(&path).unwrap();

    let loaded = TagDb::load_from_file(&path).unwrap();
    assert_eq!(loaded.macs(), vec![mac(2), mac(1)]);
    let tag = loaded.get(&mac(2)).unwrap();
    assert_eq!(tag.content_mode, 3);
    assert_eq!(tag.next_update, NEVER);
}

#[test]
fn test_concurrent_checkins() {
    let db = Arc::new(TagDb::new());
    for i in 0..10 {
        db.register(TagRecord::new(mac(i), 0));
    }

    let mut handles = vec![];
    for i in 0..10 {
        let db = Arc::clone(&db);
        handles.push(thread::spawn(move || {
            db.report_checkin(&mac(i), -(i as i8) - 1, WakeReason::None, i as i64);
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    for i in 0..10 {
        assert_eq!(db.get(&mac(i)).unwrap().expected_next_checkin, i as i64);
    }
}
