//! Domain-specific assertion macros for logscope harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear which part of the request document diverged.

/// Assert the exact set of aggregation names installed on a search.
///
/// ```rust,ignore
/// assert_aggregation_names!(search, ["regions", "missing_regions"]);
/// ```
#[macro_export]
macro_rules! assert_aggregation_names {
    ($search:expr, [$($name:expr),* $(,)?]) => {{
        let search: &logscope_core::LogSearch = &$search;
        let actual: Vec<&str> = search.request().aggregations.keys().map(String::as_str).collect();
        let mut expected: Vec<&str> = vec![$($name),*];
        expected.sort_unstable();
        pretty_assertions::assert_eq!(actual, expected, "aggregation names differ");
    }};
}

/// Assert the wire rendering of one named aggregation.
///
/// ```rust,ignore
/// assert_aggregation_json!(search, "regions", json!({ "terms": { ... } }));
/// ```
#[macro_export]
macro_rules! assert_aggregation_json {
    ($search:expr, $name:expr, $expected:expr) => {{
        let search: &logscope_core::LogSearch = &$search;
        let name: &str = $name;
        match search.request().aggregations.get(name) {
            Some(spec) => pretty_assertions::assert_eq!(
                serde_json::to_value(spec).unwrap(),
                $expected,
                "aggregation {:?} rendered differently",
                name
            ),
            None => panic!(
                "assert_aggregation_json! failed: no aggregation {:?}.\n  Installed: {:?}",
                name,
                search.request().aggregations.keys().collect::<Vec<_>>()
            ),
        }
    }};
}

/// Assert the wire rendering of the `must` filter list.
#[macro_export]
macro_rules! assert_must_json {
    ($search:expr, $expected:expr) => {{
        let search: &logscope_core::LogSearch = &$search;
        let wire = search.request().to_json();
        pretty_assertions::assert_eq!(
            wire["query"]["filtered"]["filter"]["bool"]["must"],
            $expected,
            "must filters rendered differently"
        );
    }};
}
