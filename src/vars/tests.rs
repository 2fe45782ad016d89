use super::*;

#[test]
fn test_set_marks_changed() {
    let vars = VariableStore::new();
    vars.set("temp", "21.5");

    assert_eq!(vars.get("temp").as_deref(), Some("21.5"));
    assert!(vars.is_changed("temp"));
    assert_eq!(vars.changed_names(), vec!["temp".to_string()]);
}

#[test]
fn test_sweep_clears_all_flags() {
    let vars = VariableStore::new();
    vars.set("a", "1");
    vars.set("b", "2");

    let mut swept = vars.sweep_changed();
    swept.sort();
    assert_eq!(swept, vec!["a".to_string(), "b".to_string()]);
    assert!(vars.changed_names().is_empty());

    // Values survive the sweep
    assert_eq!(vars.get("b").as_deref(), Some("2"));
}

#[test]
fn test_same_value_does_not_mark_changed() {
    let vars = VariableStore::new();
    vars.set("a", "1");
    vars.sweep_changed();

    vars.set("a", "1");
    assert!(!vars.is_changed("a"));

    vars.set("a", "2");
    assert!(vars.is_changed("a"));
}

#[test]
fn test_empty_first_write_is_changed() {
    let vars = VariableStore::new();
    vars.set("blank", "");
    assert!(vars.is_changed("blank"));
    assert_eq!(vars.len(), 1);
}

#[test]
fn test_expand_inline() {
    let vars = VariableStore::new();
    vars.set("ap_ip", "192.168.1.4");
    vars.set("ap_ch", "11");

    assert_eq!(
        vars.expand_inline("IP {ap_ip} ch {ap_ch}"),
        "IP 192.168.1.4 ch 11"
    );
    assert_eq!(vars.expand_inline("{unknown} x"), "{unknown} x");
    assert_eq!(vars.expand_inline("open { brace"), "open { brace");
    assert_eq!(vars.expand_inline("plain"), "plain");
}
