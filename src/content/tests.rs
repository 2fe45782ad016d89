use super::*;
use crate::content::feed::MAX_HEADLINE;
use crate::clock::{next_midnight, Clock, FixedClock};
use crate::config::RuntimeConfig;
use crate::hwtype::{HwRegistry, SOLUM_SEG_UK};
use crate::render::{color, DisplayListRasterizer, DitherCodec, DrawOp};
use crate::storage::MemoryStore;
use crate::tag::Mac;
use crate::transport::{data_type, RecordingTransport, Sent};
use mockito::{Matcher, Server};
use serde_json::json;
use std::io::Cursor;
use std::sync::RwLock;
use std::time::Duration;

const HEX: &str = "00000000AABBCCDD";

fn mac() -> Mac {
    HEX.parse().unwrap()
}

struct Harness {
    store: Arc<MemoryStore>,
    transport: Arc<RecordingTransport>,
    services: ContentServices,
}

fn harness(store: MemoryStore, base_url: &str) -> Harness {
    let store = Arc::new(store);
    let transport = Arc::new(RecordingTransport::new());
    let config = ContentConfig {
        geocoding_url: format!("{}/geo", base_url),
        forecast_url: format!("{}/forecast", base_url),
        radar_url: format!("{}/radar", base_url),
        ..ContentConfig::default()
    };
    let services = ContentServices {
        store: store.clone(),
        vars: Arc::new(VariableStore::new()),
        fetcher: Fetcher::new(Duration::from_secs(5)).unwrap(),
        rasterizer: Arc::new(DisplayListRasterizer::new()),
        codec: Arc::new(DitherCodec),
        transport: transport.clone(),
        config,
        runtime: Arc::new(RwLock::new(RuntimeConfig::default())),
    };
    Harness {
        store,
        transport,
        services,
    }
}

fn offline(store: MemoryStore) -> Harness {
    harness(store, "http://127.0.0.1:1")
}

/// Context at 12:00 UTC on 2024-03-15 (a Friday)
fn context(mode: ContentMode, hw: HwType, config: Value) -> RenderContext {
    let mut tag = TagRecord::new(mac(), 0x01);
    tag.content_mode = mode.id();
    tag.rssi = -60;
    let config = config.as_object().cloned().unwrap_or_default();
    let now = FixedClock::at_local(0, 12, 0).now();
    RenderContext::new(tag, config, hw, now, false)
}

fn panel() -> HwType {
    HwType::raster(296, 128, 2)
}

fn segment() -> HwType {
    HwRegistry::new().get(SOLUM_SEG_UK).unwrap()
}

async fn render(mode: ContentMode, ctx: &mut RenderContext, h: &Harness) -> Result<()> {
    let registry = RendererRegistry::builtin();
    let renderer = registry.get(mode).unwrap();
    renderer.render(ctx, &h.services).await
}

/// Drawing operations of the image last stored for the test tag
fn drawn(h: &Harness) -> Vec<DrawOp> {
    let buffer = h.store.read(&format!("/current/{}.raw", HEX)).unwrap();
    DisplayListRasterizer::decode(&buffer).unwrap()
}

fn texts(ops: &[DrawOp]) -> Vec<String> {
    ops.iter()
        .filter_map(|op| match op {
            DrawOp::Text { text, .. } => Some(text.clone()),
            _ => None,
        })
        .collect()
}

fn png(width: u32, height: u32) -> Vec<u8> {
    let img = ::image::RgbImage::from_fn(width, height, |x, _| {
        if x < width / 2 {
            ::image::Rgb([0, 0, 0])
        } else {
            ::image::Rgb([255, 255, 255])
        }
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ::image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn test_registry_covers_every_mode() {
    let registry = RendererRegistry::builtin();
    assert_eq!(registry.len(), 21);
    for id in 0..=21u8 {
        match ContentMode::from_id(id) {
            Some(mode) => {
                assert_eq!(mode.id(), id);
                assert_eq!(registry.get(mode).unwrap().mode(), mode);
            }
            None => assert_eq!(id, 6),
        }
    }
    assert!(ContentMode::from_id(22).is_none());
}

#[test]
fn test_interval_minutes() {
    assert_eq!(interval_minutes(0, 15), 15);
    assert_eq!(interval_minutes(2, 60), 60);
    assert_eq!(interval_minutes(3, 15), 3);
    assert_eq!(interval_minutes(30, 15), 30);
    assert_eq!(checkin_minutes(-5), 0);
    assert_eq!(checkin_minutes(100_000), u16::MAX);
}

#[test]
fn test_settings_accept_strings_and_numbers() {
    use serde::Deserialize;

    #[derive(Deserialize, Default)]
    #[serde(default)]
    struct S {
        #[serde(deserialize_with = "lenient::int")]
        interval: i64,
        #[serde(deserialize_with = "lenient::string")]
        units: String,
        #[serde(deserialize_with = "lenient::boolean")]
        flag: bool,
    }

    let ctx = context(
        ContentMode::Weather,
        panel(),
        json!({"interval": "30", "units": 1, "flag": "true"}),
    );
    let s: S = ctx.settings().unwrap();
    assert_eq!(s.interval, 30);
    assert_eq!(s.units, "1");
    assert!(s.flag);

    let ctx = context(ContentMode::Weather, panel(), json!({"interval": null}));
    let s: S = ctx.settings().unwrap();
    assert_eq!(s.interval, 0);
    assert!(!s.flag);
}

#[test]
fn test_counter_segments() {
    assert_eq!(counter_segments(42, false), ("  42  days".to_string(), 0));
    assert_eq!(counter_segments(7, true), ("   7  hour".to_string(), 0));
    assert_eq!(counter_segments(12345, false), ("2345  days".to_string(), 0x02));
    assert_eq!(counter_segments(20000, true), ("over  flow".to_string(), 0));
    assert_eq!(counter_segments(-3, false), ("   3  days".to_string(), 0));
}

#[tokio::test]
async fn test_count_hours_button_resets() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(ContentMode::CountHours, panel(), json!({"counter": 41}));
    ctx.button_pressed = true;

    render(ContentMode::CountHours, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.config["counter"], 1);
    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 3600);
    match &h.transport.sent()[..] {
        [Sent::Image { next_checkin, .. }] => assert_eq!(*next_checkin, 0),
        other => panic!("unexpected sends: {:?}", other),
    }
    assert_eq!(texts(&drawn(&h)), vec!["0"]);
}

#[tokio::test]
async fn test_count_days_increments() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(
        ContentMode::CountDays,
        panel(),
        json!({"counter": "5", "thresholdred": 3}),
    );

    render(ContentMode::CountDays, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.config["counter"], 6);
    assert_eq!(ctx.tag.next_update, next_midnight(&ctx.now));
    match &h.transport.sent()[..] {
        [Sent::Image {
            next_checkin,
            data_type: kind,
            ..
        }] => {
            assert_eq!(*next_checkin, 15);
            assert_eq!(*kind, data_type::IMG_RAW_2BPP);
        }
        other => panic!("unexpected sends: {:?}", other),
    }
    let ops = drawn(&h);
    assert!(ops
        .iter()
        .any(|op| matches!(op, DrawOp::Text { text, color, .. } if text == "5" && *color == color::RED)));
}

#[tokio::test]
async fn test_date_on_segment_display() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(ContentMode::Today, segment(), json!({}));

    render(ContentMode::Today, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, next_midnight(&ctx.now));
    assert_eq!(
        h.transport.sent(),
        vec![Sent::Segments {
            mac: mac(),
            text: "15 3Fr2024".to_string(),
            symbols: 0x04,
            invert: false,
            direct: true,
        }]
    );
}

#[tokio::test]
async fn test_date_layout() {
    let store = MemoryStore::new(1 << 20).with_file(
        "/tagtypes/01.json",
        json!({"template": {"1": {
            "weekday": [148, 5, "fonts/calibrib30"],
            "date": [148, 60, "fonts/calibrib30"]
        }}})
        .to_string(),
    );
    let h = offline(store);
    let mut ctx = context(ContentMode::Today, panel(), json!({}));

    render(ContentMode::Today, &mut ctx, &h).await.unwrap();

    assert_eq!(texts(&drawn(&h)), vec!["Friday", "15 March"]);
    match &h.transport.sent()[..] {
        // twelve hours to midnight, minus ten minutes
        [Sent::Image { next_checkin, .. }] => assert_eq!(*next_checkin, 710),
        other => panic!("unexpected sends: {:?}", other),
    }
}

#[tokio::test]
async fn test_image_missing_without_current() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(ContentMode::Image, panel(), json!({"filename": "gone.jpg"}));

    let err = render(ContentMode::Image, &mut ctx, &h).await.unwrap_err();
    assert!(err.to_string().contains("/gone.jpg"));
    assert!(h.transport.sent().is_empty());
    assert_eq!(RendererRegistry::builtin().get(ContentMode::Image).unwrap().failure_backoff(), 600);
}

#[tokio::test]
async fn test_image_missing_resends_current() {
    let store = MemoryStore::new(1 << 20).with_file(&format!("/current/{}.raw", HEX), vec![1, 2, 3]);
    let h = offline(store);
    let mut ctx = context(
        ContentMode::Image,
        panel(),
        json!({"filename": "gone.jpg", "timetolive": 30}),
    );

    render(ContentMode::Image, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, NEVER);
    assert_eq!(
        h.transport.sent(),
        vec![Sent::Image {
            mac: mac(),
            data_type: data_type::IMG_RAW_1BPP,
            payload: vec![1, 2, 3],
            next_checkin: 30,
        }]
    );
}

#[tokio::test]
async fn test_image_decoded_and_deleted() {
    let store = MemoryStore::new(1 << 20).with_file("/upload.png", png(8, 2));
    let h = offline(store);
    let hw = HwType::raster(8, 2, 1);
    let mut ctx = context(
        ContentMode::Image,
        hw,
        json!({"filename": "upload.png", "delete": "1", "dither": "0"}),
    );

    render(ContentMode::Image, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, NEVER);
    assert!(!h.store.exists("/upload.png"));
    let stored = h.store.read(&format!("/current/{}.raw", HEX)).unwrap();
    assert_eq!(stored, vec![0xF0, 0xF0]);
    assert!(matches!(&h.transport.sent()[..], [Sent::Image { payload, .. }] if *payload == stored));
}

#[tokio::test]
async fn test_image_without_filename_is_idle() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(ContentMode::Image, panel(), json!({}));
    render(ContentMode::Image, &mut ctx, &h).await.unwrap();
    assert_eq!(ctx.tag.next_update, NEVER);
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_image_url_fetched() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/cat.png")
        .match_header("X-ESL-MAC", HEX)
        .with_status(200)
        .with_body(png(8, 2))
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let mut ctx = context(
        ContentMode::ImageUrl,
        HwType::raster(8, 2, 1),
        json!({"url": format!("{}/cat.png", server.url()), "interval": "20"}),
    );

    render(ContentMode::ImageUrl, &mut ctx, &h).await.unwrap();

    mock.assert_async().await;
    assert_eq!(ctx.config["#fetched"], ctx.timestamp());
    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 20 * 60);
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_image_url_not_modified_is_idempotent() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/cat.png")
        .with_status(304)
        .expect(2)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let config = json!({"url": format!("{}/cat.png", server.url()), "#fetched": 1_700_000_000});

    let mut first = context(ContentMode::ImageUrl, panel(), config.clone());
    render(ContentMode::ImageUrl, &mut first, &h).await.unwrap();
    let mut second = context(ContentMode::ImageUrl, panel(), Value::Object(first.config.clone()));
    render(ContentMode::ImageUrl, &mut second, &h).await.unwrap();

    for ctx in [&first, &second] {
        assert_eq!(ctx.config["#fetched"], 1_700_000_000);
        assert_eq!(ctx.tag.next_update, ctx.timestamp() + 15 * 60);
    }
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_image_url_error_keeps_marker() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/cat.png")
        .with_status(500)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let mut ctx = context(
        ContentMode::ImageUrl,
        panel(),
        json!({"url": format!("{}/cat.png", server.url()), "#fetched": 5}),
    );

    assert!(render(ContentMode::ImageUrl, &mut ctx, &h).await.is_err());
    assert_eq!(ctx.config["#fetched"], 5);
    assert!(h.transport.sent().is_empty());
}

#[test]
fn test_wind_speed_to_beaufort() {
    assert_eq!(wind_speed_to_beaufort(0.0), 0);
    assert_eq!(wind_speed_to_beaufort(0.3), 1);
    assert_eq!(wind_speed_to_beaufort(4.0), 3);
    assert_eq!(wind_speed_to_beaufort(40.0), 12);
}

#[tokio::test]
async fn test_weather_geocodes_once_and_renders_segments() {
    let mut server = Server::new_async().await;
    let geo = server
        .mock("GET", "/geo")
        .match_query(Matcher::UrlEncoded("name".into(), "Den Haag".into()))
        .with_status(200)
        .with_body(r#"{"results":[{"latitude":52.08,"longitude":4.31,"timezone":"Europe/Amsterdam"}]}"#)
        .expect(1)
        .create_async()
        .await;
    let forecast = server
        .mock("GET", "/forecast")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"{"current_weather":{"temperature":21.5,"windspeed":4.0,"winddirection":180,"weathercode":3,"is_day":1}}"#,
        )
        .expect(2)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());

    let mut ctx = context(ContentMode::Weather, segment(), json!({"location": "Den Haag"}));
    render(ContentMode::Weather, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.config["#lat"], "52.08");
    assert_eq!(ctx.config["#tz"], "Europe/Amsterdam");
    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 1800);
    assert!(matches!(
        &h.transport.sent()[..],
        [Sent::Segments { text, symbols: 0x04, .. }] if text == "215^ 3CLDY"
    ));

    // Cached coordinates skip the geocoder
    let mut again = context(ContentMode::Weather, segment(), Value::Object(ctx.config.clone()));
    render(ContentMode::Weather, &mut again, &h).await.unwrap();

    geo.assert_async().await;
    forecast.assert_async().await;
}

#[tokio::test]
async fn test_weather_failure_sends_nothing() {
    let mut server = Server::new_async().await;
    let _forecast = server
        .mock("GET", "/forecast")
        .match_query(Matcher::Any)
        .with_status(502)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let mut ctx = context(
        ContentMode::Weather,
        panel(),
        json!({"location": "Utrecht", "#lat": "52.1", "#lon": "5.1", "#tz": "UTC"}),
    );

    assert!(render(ContentMode::Weather, &mut ctx, &h).await.is_err());
    assert!(h.transport.sent().is_empty());
}

#[test]
fn test_radar_refresh() {
    let line = |v: u8, t: &str| format!("{:03}|{}\r\n", v, t);
    let dry: String = (0..24).map(|i| line(0, &format!("12:{:02}", i * 5 % 60))).collect();
    assert_eq!(rain_refresh(&parse_samples(&dry)), 60);

    let mut later = parse_samples(&dry);
    later[20].value = 100;
    assert_eq!(rain_refresh(&later), 15);

    let mut soon = later.clone();
    soon[3].value = 140;
    assert_eq!(rain_refresh(&soon), 5);

    let samples = parse_samples(&line(200, "13:45"));
    assert_eq!(samples[0].value, 180);
    assert_eq!(samples[0].time, "13:45");
    assert_eq!(samples[1].value, 70);
}

#[tokio::test]
async fn test_radar_render() {
    let mut server = Server::new_async().await;
    let body: String = (0..24)
        .map(|i| format!("{:03}|12:{:02}\r\n", if i == 2 { 150 } else { 0 }, i * 5 % 60))
        .collect();
    let _radar = server
        .mock("GET", "/radar")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let mut ctx = context(
        ContentMode::Buienradar,
        panel(),
        json!({"location": "Delft", "#lat": "52", "#lon": "4.3"}),
    );

    render(ContentMode::Buienradar, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 5 * 60);
    let ops = drawn(&h);
    let bars: Vec<_> = ops
        .iter()
        .filter(|op| matches!(op, DrawOp::Rect { .. }))
        .collect();
    assert_eq!(bars.len(), 24);
    assert!(ops
        .iter()
        .any(|op| matches!(op, DrawOp::Rect { h: 80, color, .. } if *color == color::RED)));
    assert_eq!(texts(&ops), vec!["Delft", "Buienradar", "12:00", "12:15", "12:30", "12:45", "12:00", "12:15", "12:30", "12:45"]);
}

#[tokio::test]
async fn test_radar_failure_waits_an_hour() {
    let mut server = Server::new_async().await;
    let _radar = server
        .mock("GET", "/radar")
        .match_query(Matcher::Any)
        .with_status(500)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let mut ctx = context(
        ContentMode::Buienradar,
        panel(),
        json!({"#lat": "52", "#lon": "4.3"}),
    );

    render(ContentMode::Buienradar, &mut ctx, &h).await.unwrap();
    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 3600);
    assert!(h.transport.sent().is_empty());
}

#[test]
fn test_extract_titles() {
    let rss = r#"<rss><channel><title>Site</title>
        <item><title>First &amp; best</title></item>
        <item><title><![CDATA[Second <b>bold</b>]]></title></item>
        <item><title>Third</title></item>
        </channel></rss>"#;
    assert_eq!(
        extract_titles(rss, 2),
        vec!["First & best".to_string(), "Second <b>bold</b>".to_string()]
    );

    let atom = r#"<feed><entry><title type="text">Atom one</title></entry></feed>"#;
    assert_eq!(extract_titles(atom, 5), vec!["Atom one".to_string()]);

    let long = format!("<item><title>{}</title></item>", "x".repeat(300));
    assert_eq!(extract_titles(&long, 1)[0].len(), MAX_HEADLINE);
}

#[tokio::test]
async fn test_rss_render() {
    let mut server = Server::new_async().await;
    let _feed = server
        .mock("GET", "/feed")
        .with_status(200)
        .with_body("<rss><item><title>One</title></item><item><title>Two</title></item></rss>")
        .create_async()
        .await;
    let store = MemoryStore::new(1 << 20).with_file(
        "/tagtypes/01.json",
        json!({"template": {"9": {"title": [5, 3, "fonts/bahnschrift20"], "font": "glasstown_nbp_tf", "items": 5, "line": [9, 40, 14]}}})
            .to_string(),
    );
    let h = harness(store, &server.url());
    let mut ctx = context(
        ContentMode::RssFeed,
        panel(),
        json!({"url": format!("{}/feed", server.url()), "interval": 0}),
    );

    render(ContentMode::RssFeed, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 3600);
    let ops = drawn(&h);
    assert_eq!(texts(&ops), vec!["RSS feed", "One", "Two"]);
    assert!(ops
        .iter()
        .any(|op| matches!(op, DrawOp::Text { text, y: 54, .. } if text == "Two")));
}

#[test]
fn test_event_label() {
    let now = FixedClock::at_local(2, 12, 0).now();
    let ts = now.timestamp();
    // later today
    assert_eq!(event_label(ts + 2 * 3600 + 15 * 60, &now), "14:15");
    // midnight start reads as a date
    assert_eq!(event_label(ts + 12 * 3600, &now), "16-03");
    // more than a day ahead
    assert_eq!(event_label(ts + 30 * 3600, &now), "16-03");
    // started yesterday
    assert_eq!(event_label(ts - 20 * 3600, &now), "14-03");
}

#[tokio::test]
async fn test_calendar_marks_current_event() {
    let mut server = Server::new_async().await;
    let now = FixedClock::at_local(0, 12, 0).now().timestamp();
    let events = json!([
        {"title": "Standup", "start": now - 600, "end": now + 600},
        {"title": "Lunch", "start": now + 3600, "end": now + 7200}
    ]);
    let _cal = server
        .mock("GET", "/cal")
        .with_status(200)
        .with_body(events.to_string())
        .create_async()
        .await;
    let store = MemoryStore::new(1 << 20).with_file(
        "/tagtypes/01.json",
        json!({"template": {"11": {
            "title": [5, 5, "fonts/bahnschrift20"],
            "date": [290, 5],
            "items": 5,
            "red": [0, 21, 296, 14],
            "line": [5, 32, 15, "t0_14b_tf", 50]
        }}})
        .to_string(),
    );
    let h = harness(store, &server.url());
    let mut ctx = context(
        ContentMode::Calendar,
        panel(),
        json!({"apps_script_url": format!("{}/cal", server.url()), "title": "Team"}),
    );

    render(ContentMode::Calendar, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 15 * 60);
    let ops = drawn(&h);
    assert_eq!(
        texts(&ops),
        vec!["Team", "15.03.2024", "11:50", "Standup", "13:00", "Lunch"]
    );
    assert!(ops.iter().any(|op| matches!(
        op,
        DrawOp::Rect { x: 0, y: 21, color, .. } if *color == color::RED
    )));
    assert!(ops.iter().any(|op| matches!(
        op,
        DrawOp::Text { text, color, bg, .. }
            if text == "Standup" && *color == color::WHITE && *bg == color::RED
    )));
}

#[tokio::test]
async fn test_qr_code() {
    let store = MemoryStore::new(1 << 20).with_file(
        "/tagtypes/01.json",
        json!({"template": {"10": {"title": [10, 5, "fonts/bahnschrift20"], "pos": [148, 30]}}})
            .to_string(),
    );
    let h = offline(store);
    let mut ctx = context(
        ContentMode::QrCode,
        panel(),
        json!({"qr-content": "https://example.com", "title": "Scan me"}),
    );

    render(ContentMode::QrCode, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 12 * 3600);
    let ops = drawn(&h);
    assert_eq!(texts(&ops), vec!["Scan me"]);
    assert!(ops.iter().filter(|op| matches!(op, DrawOp::Rect { .. })).count() > 50);
    assert!(matches!(&h.transport.sent()[..], [Sent::Image { next_checkin: 0, .. }]));
}

#[tokio::test]
async fn test_json_template_with_data() {
    let mut server = Server::new_async().await;
    let _data = server
        .mock("GET", "/data")
        .with_status(200)
        .with_body(r#"{"room": {"temp": 21.5, "target": 19.2}}"#)
        .create_async()
        .await;
    let template = r#"[
        {"text": [10, 10, "Temp {.room.temp}", "fonts/bahnschrift20", 1]},
        {"text": [10, 40, "Diff {.room.temp}-{.room.target}", "fonts/bahnschrift20", 2]},
        {"box": [0, 60, 296, 2, 1]}
    ]"#;
    let h = harness(
        MemoryStore::new(1 << 20).with_file("/layout.json", template),
        &server.url(),
    );
    let mut ctx = context(
        ContentMode::JsonTemplate,
        panel(),
        json!({"filename": "layout.json", "url": format!("{}/data", server.url()), "interval": 1}),
    );

    render(ContentMode::JsonTemplate, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 3 * 60);
    let ops = drawn(&h);
    assert_eq!(texts(&ops), vec!["Temp 21.50", "Diff 2"]);
    assert!(ops.iter().any(|op| matches!(op, DrawOp::Rect { y: 60, .. })));
}

#[tokio::test]
async fn test_json_template_file_only() {
    let template = r#"[{"text": [5, 5, "Hello {name}", "glasstown_nbp_tf"]}]"#;
    let h = offline(MemoryStore::new(1 << 20).with_file("/hello.json", template));
    h.services.vars.set("name", "world");
    let mut ctx = context(ContentMode::JsonTemplate, panel(), json!({"filename": "hello.json"}));

    render(ContentMode::JsonTemplate, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, NEVER);
    assert_eq!(texts(&drawn(&h)), vec!["Hello world"]);
}

#[tokio::test]
async fn test_json_template_missing_file() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(ContentMode::JsonTemplate, panel(), json!({"filename": "nope.json"}));

    assert!(render(ContentMode::JsonTemplate, &mut ctx, &h).await.is_err());
    assert!(h.transport.sent().is_empty());
    let registry = RendererRegistry::builtin();
    assert_eq!(registry.get(ContentMode::JsonTemplate).unwrap().failure_backoff(), 600);
}

#[tokio::test]
async fn test_json_template_url_not_modified() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/tpl.json")
        .with_status(304)
        .create_async()
        .await;
    let h = harness(MemoryStore::new(1 << 20), &server.url());
    let mut ctx = context(
        ContentMode::JsonTemplate,
        panel(),
        json!({"url": format!("{}/tpl.json", server.url()), "#fetched": 99, "interval": 10}),
    );

    render(ContentMode::JsonTemplate, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.config["#fetched"], 99);
    assert_eq!(ctx.tag.next_update, ctx.timestamp() + 600);
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_ap_info_panel() {
    let store = MemoryStore::new(1 << 20).with_file(
        "/tagtypes/01.json",
        json!({"template": {"21": [
            {"text": [5, 5, "IP {ap_ip}", "fonts/bahnschrift20"]},
            {"text": [5, 30, "Tags {ap_tagcount}", "fonts/bahnschrift20"]}
        ]}})
        .to_string(),
    );
    let h = offline(store);
    h.services.vars.set(crate::vars::AP_IP, "10.0.0.2");
    h.services.vars.set(crate::vars::AP_TAGCOUNT, "3");
    let mut ctx = context(ContentMode::ApInfo, panel(), json!({}));

    render(ContentMode::ApInfo, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, NEVER);
    assert_eq!(texts(&drawn(&h)), vec!["IP 10.0.0.2", "Tags 3"]);
}

#[tokio::test]
async fn test_firmware_push_once() {
    let h = offline(MemoryStore::new(1 << 20).with_file("/fw.bin", vec![0xAA; 16]));
    let mut ctx = context(
        ContentMode::Firmware,
        panel(),
        json!({"filename": "fw.bin", "timetolive": 5}),
    );

    render(ContentMode::Firmware, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.config["#fetched"], true);
    assert_eq!(ctx.config["filename"], "");
    assert_eq!(ctx.tag.content_mode, 0);
    assert_eq!(ctx.tag.next_update, NEVER);
    assert_eq!(
        h.transport.sent(),
        vec![Sent::Image {
            mac: mac(),
            data_type: data_type::FW_UPDATE,
            payload: vec![0xAA; 16],
            next_checkin: 5,
        }]
    );

    let mut again = context(ContentMode::Firmware, panel(), Value::Object(ctx.config.clone()));
    render(ContentMode::Firmware, &mut again, &h).await.unwrap();
    assert_eq!(again.tag.next_update, again.timestamp() + 300);
    assert_eq!(h.transport.sent().len(), 1);
}

#[tokio::test]
async fn test_one_shot_pushes() {
    let h = offline(MemoryStore::new(1 << 20));

    let mut ctx = context(ContentMode::TagCommand, panel(), json!({"cmd": "33", "filename": "x"}));
    ctx.tag.is_external = true;
    render(ContentMode::TagCommand, &mut ctx, &h).await.unwrap();
    assert_eq!(ctx.tag.content_mode, 0);
    assert_eq!(ctx.config["filename"], "");

    let mut ctx = context(
        ContentMode::TagConfig,
        panel(),
        json!({"fastboot": "1", "lowvoltage": "2600", "fixedchannel": 11}),
    );
    render(ContentMode::TagConfig, &mut ctx, &h).await.unwrap();
    assert_eq!(ctx.tag.content_mode, 0);
    assert_eq!(ctx.tag.next_update, NEVER);

    let mut ctx = context(ContentMode::GrayLut, panel(), json!({"bytes": "0x01 02"}));
    render(ContentMode::GrayLut, &mut ctx, &h).await.unwrap();
    assert!(ctx.tag.has_custom_lut);

    let mut ctx = context(ContentMode::NfcUrl, panel(), json!({"url": "https://a.b"}));
    render(ContentMode::NfcUrl, &mut ctx, &h).await.unwrap();

    let sent = h.transport.sent();
    assert_eq!(sent.len(), 4);
    assert_eq!(
        sent[0],
        Sent::Command {
            mac: mac(),
            opcode: 33,
            payload: vec![],
            direct: false,
        }
    );
    match &sent[1] {
        Sent::Image {
            data_type: kind,
            payload,
            ..
        } => {
            assert_eq!(*kind, data_type::TAG_CONFIG);
            assert_eq!(payload[1], 1);
            assert_eq!(&payload[9..11], &[0x28, 0x0A]);
            assert_eq!(payload[12], 11);
        }
        other => panic!("unexpected send: {:?}", other),
    }
    assert!(matches!(&sent[2], Sent::Image { data_type: kind, payload, .. }
        if *kind == data_type::CUSTOM_LUT_OTA && payload[..2] == [0x01, 0x02]));
    assert!(matches!(&sent[3], Sent::Image { data_type: kind, payload, .. }
        if *kind == data_type::NFC_RAW_CONTENT && payload.ends_with(b"https://a.b\xFE")));
}

#[tokio::test]
async fn test_segment_static_text() {
    let h = offline(MemoryStore::new(1 << 20));
    let mut ctx = context(
        ContentMode::SegStatic,
        segment(),
        json!({"line1": "HELLO", "line2": "a", "line3": 42}),
    );

    render(ContentMode::SegStatic, &mut ctx, &h).await.unwrap();

    assert_eq!(ctx.tag.next_update, NEVER);
    assert!(matches!(
        &h.transport.sent()[..],
        [Sent::Segments { text, symbols: 0, .. }] if text == "HELLa 42  "
    ));
}

#[tokio::test]
async fn test_parked_modes() {
    let h = offline(MemoryStore::new(1 << 20));
    for mode in [ContentMode::RemoteAp, ContentMode::DisplayCopy] {
        let mut ctx = context(mode, panel(), json!({}));
        render(mode, &mut ctx, &h).await.unwrap();
        assert_eq!(ctx.tag.next_update, NEVER);
    }
    assert!(h.transport.sent().is_empty());
}

#[tokio::test]
async fn test_surface_failure_aborts_render() {
    let mut h = offline(MemoryStore::new(1 << 20));
    h.services.rasterizer = Arc::new(DisplayListRasterizer::with_max_bpp(0));
    let mut ctx = context(ContentMode::CountDays, panel(), json!({"counter": 1}));

    assert!(render(ContentMode::CountDays, &mut ctx, &h).await.is_err());
    assert!(h.transport.sent().is_empty());
    assert_eq!(ctx.config["counter"], 1);
}
