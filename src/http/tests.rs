use super::*;
use mockito::Server;

fn mac() -> Mac {
    "00000000AABBCCDD".parse().unwrap()
}

fn fetcher() -> Fetcher {
    Fetcher::new(Duration::from_secs(5)).unwrap()
}

#[test]
fn test_http_date() {
    assert_eq!(http_date(0), "Thu, 01 Jan 1970 00:00:00 GMT");
    assert_eq!(http_date(1_710_460_800), "Fri, 15 Mar 2024 00:00:00 GMT");
}

#[tokio::test]
async fn test_conditional_get_fetched() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/image.jpg")
        .match_header("If-Modified-Since", "Fri, 15 Mar 2024 00:00:00 GMT")
        .match_header("X-ESL-MAC", "00000000AABBCCDD")
        .with_status(200)
        .with_body("jpeg bytes")
        .create_async()
        .await;

    let url = format!("{}/image.jpg", server.url());
    let result = fetcher()
        .get_conditional(&url, 1_710_460_800, &mac())
        .await
        .unwrap();

    assert_eq!(result, Conditional::Fetched(b"jpeg bytes".to_vec()));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_conditional_get_not_modified() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/image.jpg")
        .with_status(304)
        .create_async()
        .await;

    let url = format!("{}/image.jpg", server.url());
    let result = fetcher().get_conditional(&url, 0, &mac()).await.unwrap();
    assert_eq!(result, Conditional::NotModified);
}

#[tokio::test]
async fn test_conditional_get_error_status() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("GET", "/image.jpg")
        .with_status(503)
        .create_async()
        .await;

    let url = format!("{}/image.jpg", server.url());
    let result = fetcher().get_conditional(&url, 0, &mac()).await;
    assert_eq!(result, Err(FetchError::Status(503)));
}

#[tokio::test]
async fn test_get_json() {
    let mut server = Server::new_async().await;
    let _ok = server
        .mock("GET", "/data")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"temp": 21.5}"#)
        .create_async()
        .await;
    let _bad = server
        .mock("GET", "/broken")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let f = fetcher();
    let doc = f.get_json(&format!("{}/data", server.url())).await.unwrap();
    assert_eq!(doc["temp"], 21.5);

    let err = f
        .get_json(&format!("{}/broken", server.url()))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Parse(_)));
}

#[tokio::test]
async fn test_unreachable_host() {
    let result = fetcher().get_text("http://127.0.0.1:1/").await;
    assert!(matches!(result, Err(FetchError::Transport(_))));
}
