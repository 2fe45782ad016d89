use super::*;

#[test]
fn test_nfc_url_record() {
    let record = nfc_url_record("https://a.b");
    assert_eq!(record.len(), 11 + 8);
    assert_eq!(&record[..7], &[0x03, 16, 0xD1, 0x01, 12, 0x55, 0x00]);
    assert_eq!(&record[7..18], b"https://a.b");
    assert_eq!(record.last(), Some(&0xFE));
}

#[test]
fn test_nfc_url_record_truncates_long_urls() {
    let url = "x".repeat(400);
    let record = nfc_url_record(&url);
    assert_eq!(record[1], 255);
    assert_eq!(record.len(), 250 + 8);
}

#[test]
fn test_parse_lut() {
    let lut = parse_lut("0x10, 20 ff\tzz,1FF");
    assert_eq!(lut.len(), LUT_LEN);
    assert_eq!(&lut[..5], &[0x10, 0x20, 0xFF, 0x00, 0xFF]);
    assert!(lut[5..].iter().all(|b| *b == 0));
}

#[test]
fn test_parse_lut_ignores_extra_values() {
    let input = vec!["01"; 100].join(",");
    let lut = parse_lut(&input);
    assert_eq!(lut.len(), LUT_LEN);
    assert!(lut.iter().all(|b| *b == 1));
}

#[test]
fn test_tag_settings_layout() {
    let settings = TagSettings {
        fast_boot: 1,
        rf_wake: 0,
        tag_roaming: 1,
        scan_for_ap_after_timeout: 1,
        low_bat_symbol: 1,
        no_rf_symbol: 0,
        fixed_channel: 11,
        bat_low_voltage: 2600,
    };
    assert_eq!(
        settings.to_bytes(),
        vec![1, 1, 0, 1, 1, 1, 0, 0, 0, 0x28, 0x0A, 1, 11]
    );
}

#[test]
fn test_recording_transport() {
    let mac = crate::tag::Mac([1, 0, 0, 0, 0, 0, 0, 0]);
    let other = crate::tag::Mac([2, 0, 0, 0, 0, 0, 0, 0]);
    let transport = RecordingTransport::rejecting();

    assert!(!transport.send_image(&mac, data_type::IMG_RAW_1BPP, &[1, 2], 5));
    transport.send_idle(&other, 30);

    assert_eq!(transport.sent().len(), 2);
    assert_eq!(
        transport.sent_to(&other),
        vec![Sent::Idle {
            mac: other,
            minutes: 30
        }]
    );

    transport.clear();
    assert!(transport.sent().is_empty());
}
