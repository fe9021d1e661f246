//! Check filter rendering, query URLs and raw response parsing against the
//! JSON vectors stored in `test-vectors/`.
//!
//! Each vector file lists named cases; a failing assertion names the case.
//! Expected headers and cookies are compared as JSON objects so the vectors
//! stay readable.

use b1sl_core::{
    Client, Config, Direction, Error, Filter, FilterValue, HttpRequest, RawResponse, Result,
    Session, Transport,
};
use serde_json::{json, Map, Value};

/// Never reached: these tests only build requests.
struct Offline;

impl Transport for Offline {
    fn send(&self, _request: &HttpRequest) -> Result<RawResponse> {
        Err(Error::Transport("offline".to_string()))
    }
}

fn value(v: &Value) -> FilterValue {
    match v {
        Value::String(s) => s.as_str().into(),
        Value::Bool(b) => (*b).into(),
        Value::Number(n) => match n.as_i64() {
            Some(i) => i.into(),
            None => n.as_f64().unwrap().into(),
        },
        other => panic!("unsupported filter value: {other}"),
    }
}

fn values(case: &Value) -> Vec<FilterValue> {
    case["values"].as_array().unwrap().iter().map(value).collect()
}

/// Build a `Filter` from its vector description.
fn filter(case: &Value) -> Filter {
    let field = case["field"].as_str().unwrap_or_default();
    match case["kind"].as_str().unwrap() {
        "equal" => Filter::equal(field, value(&case["value"])),
        "not_equal" => Filter::not_equal(field, value(&case["value"])),
        "more_than" => Filter::more_than(field, value(&case["value"])),
        "more_than_equal" => Filter::more_than_equal(field, value(&case["value"])),
        "less_than" => Filter::less_than(field, value(&case["value"])),
        "less_than_equal" => Filter::less_than_equal(field, value(&case["value"])),
        "between" => {
            let bounds = values(case);
            Filter::between(field, bounds[0].clone(), bounds[1].clone())
        }
        "contains" => Filter::contains(field, value(&case["value"])),
        "starts_with" => Filter::starts_with(field, value(&case["value"])),
        "ends_with" => Filter::ends_with(field, value(&case["value"])),
        "in_array" => Filter::in_array(field, values(case)),
        "not_in_array" => Filter::not_in_array(field, values(case)),
        "raw" => Filter::raw(case["expression"].as_str().unwrap()),
        other => panic!("unknown filter kind: {other}"),
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

#[test]
fn filter_test_vectors() {
    let raw = include_str!("../../test-vectors/filters.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let rendered = filter(case).execute();
        assert_eq!(rendered, case["expected"].as_str().unwrap(), "{name}");
    }
}

// ---------------------------------------------------------------------------
// Query URLs
// ---------------------------------------------------------------------------

fn arg_u32(step: &[Value], index: usize) -> u32 {
    step[index].as_u64().unwrap() as u32
}

#[test]
fn query_test_vectors() {
    let raw = include_str!("../../test-vectors/query.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    let mut session = Session::new();
    session.insert("B1SESSION".to_string(), "vectors".to_string());
    let client = Client::with_transport(Config::new("sl.local"), session, Offline);

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let mut query = client
            .service(case["service"].as_str().unwrap())
            .query_builder();

        for step in case["steps"].as_array().unwrap() {
            let step = step.as_array().unwrap();
            query = match step[0].as_str().unwrap() {
                "select" => query.select(step[1].as_str().unwrap()),
                "select_all" => query.select_all(),
                "limit" => query.limit(arg_u32(step, 1), arg_u32(step, 2)),
                "skip" => query.skip(arg_u32(step, 1)),
                "order_by" => {
                    let direction = match step[2].as_str().unwrap() {
                        "desc" => Direction::Desc,
                        _ => Direction::Asc,
                    };
                    query.order_by(step[1].as_str().unwrap(), direction)
                }
                "inline_count" => query.inline_count(),
                "expand" => query.expand(step[1].as_str().unwrap()),
                "and_where" => query.and_where(filter(&step[1])),
                "or_where" => query.or_where(filter(&step[1])),
                other => panic!("{name}: unknown step {other}"),
            };
        }

        let request = query.build_request("").unwrap();
        assert_eq!(request.url, case["expected_url"].as_str().unwrap(), "{name}: url");
        assert_eq!(request.header("Cookie"), Some("B1SESSION=vectors;"), "{name}: cookie");
        assert!(request.body.is_none(), "{name}: body");
    }
}

// ---------------------------------------------------------------------------
// Raw responses
// ---------------------------------------------------------------------------

#[test]
fn response_test_vectors() {
    let raw = include_str!("../../test-vectors/response.json");
    let vectors: Value = serde_json::from_str(raw).unwrap();

    for case in vectors["cases"].as_array().unwrap() {
        let name = case["name"].as_str().unwrap();
        let lines: Vec<String> = case["lines"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l.as_str().unwrap().to_string())
            .collect();
        let parsed = RawResponse::new(lines, "body").parse();

        if case["error"].as_bool().unwrap_or(false) {
            assert!(matches!(parsed, Err(Error::Transport(_))), "{name}: expected error");
            continue;
        }

        let response = parsed.unwrap();
        let expected = &case["expected"];
        assert_eq!(u64::from(response.status()), expected["status"].as_u64().unwrap(), "{name}: status");
        assert_eq!(
            response.content_type().map(|ct| json!(ct)).unwrap_or(Value::Null),
            expected["content_type"],
            "{name}: content type"
        );

        let headers: Map<String, Value> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), json!(v)))
            .collect();
        assert_eq!(Value::Object(headers), expected["headers"], "{name}: headers");

        let cookies: Map<String, Value> = response
            .cookies()
            .iter()
            .map(|(k, v)| (k.clone(), json!(v)))
            .collect();
        assert_eq!(Value::Object(cookies), expected["cookies"], "{name}: cookies");
        assert_eq!(response.body(), "body", "{name}: body");
    }
}
