use axum::http::{self, Request, StatusCode};
use axum::routing::RouterIntoService;
use http_body_util::BodyExt;
use mock_server::{app, Order, ODATA_JSON, PASSWORD, TEXT_PLAIN};
use serde_json::Value;
use tower::{Service, ServiceExt};

type App = RouterIntoService<String>;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn request(method: &str, uri: &str, cookie: Option<&str>, body: Option<&str>) -> Request<String> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(http::header::COOKIE, cookie);
    }
    if body.is_some() {
        builder = builder.header(http::header::CONTENT_TYPE, "application/json");
    }
    builder.body(body.unwrap_or_default().to_string()).unwrap()
}

async fn call(app: &mut App, req: Request<String>) -> axum::response::Response {
    ServiceExt::ready(app).await.unwrap().call(req).await.unwrap()
}

/// Log in and return the `Cookie` header value for later requests.
async fn login(app: &mut App) -> String {
    let body = format!(r#"{{"UserName":"manager","Password":"{PASSWORD}","CompanyDB":"SBODEMO"}}"#);
    let resp = call(app, request("POST", "/b1s/v2/Login", None, Some(&body))).await;
    assert_eq!(resp.status(), StatusCode::OK);
    resp.headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| {
            let v = v.to_str().unwrap();
            format!("{};", v.split(';').next().unwrap())
        })
        .collect()
}

// --- login ---

#[tokio::test]
async fn login_sets_two_cookies() {
    let mut app = app().into_service();
    let body = format!(r#"{{"UserName":"manager","Password":"{PASSWORD}","CompanyDB":"SBODEMO"}}"#);
    let resp = call(&mut app, request("POST", "/b1s/v2/Login", None, Some(&body))).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], ODATA_JSON);
    let cookies: Vec<&str> = resp
        .headers()
        .get_all(http::header::SET_COOKIE)
        .iter()
        .map(|v| v.to_str().unwrap())
        .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("B1SESSION="));
    assert!(cookies[1].starts_with("ROUTEID=.node1"));
}

#[tokio::test]
async fn login_wrong_password_returns_vendor_error() {
    let app = app();
    let resp = app
        .oneshot(request(
            "POST",
            "/b1s/v2/Login",
            None,
            Some(r#"{"UserName":"manager","Password":"nope","CompanyDB":"SBODEMO"}"#),
        ))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["code"], -304);
}

#[tokio::test]
async fn requests_without_session_are_rejected() {
    let app = app();
    let resp = app
        .oneshot(request("GET", "/b1s/v2/Orders", None, None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["code"], 301);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let app = app();
    let resp = app
        .oneshot(request("GET", "/b1s/v2/Orders", Some("B1SESSION=forged;"), None))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- reads ---

#[tokio::test]
async fn metadata_is_xml() {
    let mut app = app().into_service();
    let cookie = login(&mut app).await;
    let resp = call(&mut app, request("GET", "/b1s/v2/$metadata", Some(&cookie), None)).await;

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], "application/xml");
    let body = body_bytes(resp).await;
    assert!(body.starts_with(b"<?xml"));
}

#[tokio::test]
async fn unknown_resource_returns_404() {
    let mut app = app().into_service();
    let cookie = login(&mut app).await;
    let resp = call(&mut app, request("GET", "/b1s/v2/Nope", Some(&cookie), None)).await;

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn invalid_filter_returns_400() {
    let mut app = app().into_service();
    let cookie = login(&mut app).await;
    let resp = call(
        &mut app,
        request(
            "GET",
            "/b1s/v2/Orders?$filter=CardCode%20like%20%27C%27",
            Some(&cookie),
            None,
        ),
    )
    .await;

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- full lifecycle ---

#[tokio::test]
async fn orders_lifecycle() {
    let mut app = app().into_service();
    let cookie = login(&mut app).await;

    // create two orders
    for (card, total) in [("C001", 10.0), ("C002", 250.0)] {
        let body = format!(r#"{{"CardCode":"{card}","DocTotal":{total}}}"#);
        let resp = call(&mut app, request("POST", "/b1s/v2/Orders", Some(&cookie), Some(&body))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Order = body_json(resp).await;
        assert_eq!(created.card_code, card);
        assert_eq!(created.document_status, "bost_Open");
    }

    // filtered list with inline count and paging
    let resp = call(
        &mut app,
        request(
            "GET",
            "/b1s/v2/Orders?$top=1&$skip=0&$inlinecount=allpages&$filter=DocTotal%20gt%205",
            Some(&cookie),
            None,
        ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let envelope: Value = body_json(resp).await;
    assert_eq!(envelope["odata.count"], "2");
    assert_eq!(envelope["value"].as_array().unwrap().len(), 1);

    // count
    let resp = call(
        &mut app,
        request(
            "GET",
            "/b1s/v2/Orders/$count?$filter=CardCode%20eq%20%27C002%27",
            Some(&cookie),
            None,
        ),
    )
    .await;
    assert_eq!(resp.headers()[http::header::CONTENT_TYPE], TEXT_PLAIN);
    assert_eq!(body_bytes(resp).await, "1");

    // keyed read
    let resp = call(&mut app, request("GET", "/b1s/v2/Orders(1)", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let fetched: Order = body_json(resp).await;
    assert_eq!(fetched.doc_entry, 1);

    // patch without and with a representation
    let resp = call(
        &mut app,
        request("PATCH", "/b1s/v2/Orders(1)", Some(&cookie), Some(r#"{"Comments":"rush"}"#)),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let mut req = request("PATCH", "/b1s/v2/Orders(1)", Some(&cookie), Some(r#"{"DocTotal":12.5}"#));
    req.headers_mut()
        .insert("prefer", "return=representation".parse().unwrap());
    let resp = call(&mut app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Order = body_json(resp).await;
    assert_eq!(updated.doc_total, 12.5);
    assert_eq!(updated.comments.as_deref(), Some("rush"));

    // bound action
    let resp = call(&mut app, request("POST", "/b1s/v2/Orders(1)/Close", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = call(&mut app, request("GET", "/b1s/v2/Orders(1)", Some(&cookie), None)).await;
    let closed: Order = body_json(resp).await;
    assert_eq!(closed.document_status, "bost_Close");

    // delete, then the key is gone
    let resp = call(&mut app, request("DELETE", "/b1s/v2/Orders(1)", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    assert!(body_bytes(resp).await.is_empty());

    let resp = call(&mut app, request("DELETE", "/b1s/v2/Orders(1)", Some(&cookie), None)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"]["code"], -2028);
}
