use serde_json::{Map, Value};

/// Known layouts of the items endpoint's body, in the order they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// `catalog.items`: the layout the endpoint currently serves.
    CatalogItems,
    /// `result.results` (ordered ids) next to `result.items` (id -> listing).
    KeyedResults,
    /// First non-empty `results`/`items`/`list` array under `result`/`data`.
    NestedList,
    /// Bare top-level `items` array.
    TopLevelItems,
}

impl ResponseShape {
    pub const PRIORITY: [ResponseShape; 4] = [
        ResponseShape::CatalogItems,
        ResponseShape::KeyedResults,
        ResponseShape::NestedList,
        ResponseShape::TopLevelItems,
    ];

    pub fn extract(self, body: &Map<String, Value>) -> Option<Vec<Value>> {
        match self {
            ResponseShape::CatalogItems => body
                .get("catalog")
                .and_then(Value::as_object)
                .and_then(|catalog| catalog.get("items"))
                .and_then(Value::as_array)
                .cloned(),
            ResponseShape::KeyedResults => {
                let nested = nested_result(body)?;
                let ids = nested.get("results")?.as_array()?;
                let by_id = nested.get("items")?.as_object()?;
                Some(ids.iter().filter_map(|id| keyed_listing(by_id, id)).collect())
            }
            ResponseShape::NestedList => {
                let nested = nested_result(body)?;
                ["results", "items", "list"]
                    .iter()
                    .filter_map(|key| nested.get(*key).and_then(Value::as_array))
                    .find(|list| !list.is_empty())
                    .cloned()
            }
            ResponseShape::TopLevelItems => body.get("items").and_then(Value::as_array).cloned(),
        }
    }
}

/// Raw listings in `body`, or an empty list when no known layout matches.
pub fn extract_listings(body: &Value) -> Vec<Value> {
    match_shape(body).map(|(_, items)| items).unwrap_or_default()
}

/// First layout that matches, together with what it yielded.
pub fn match_shape(body: &Value) -> Option<(ResponseShape, Vec<Value>)> {
    let body = body.as_object()?;
    ResponseShape::PRIORITY
        .iter()
        .find_map(|shape| shape.extract(body).map(|items| (*shape, items)))
}

/// `result`, or `data` when `result` is missing or empty.
pub fn nested_result(body: &Map<String, Value>) -> Option<&Map<String, Value>> {
    let result = body.get("result").filter(|value| is_truthy(value));
    result.or_else(|| body.get("data"))?.as_object()
}

fn keyed_listing(by_id: &Map<String, Value>, id: &Value) -> Option<Value> {
    let key = match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let mut listing = by_id.get(&key)?.as_object()?.clone();
    if !listing.get("id").is_some_and(is_truthy) {
        listing.insert("id".to_string(), id.clone());
    }
    Some(Value::Object(listing))
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn catalog_items_are_returned_as_is() {
        let body = json!({"catalog": {"items": [{"id": 1}, {"id": 2}]}});
        assert_eq!(extract_listings(&body), vec![json!({"id": 1}), json!({"id": 2})]);
    }

    #[test]
    fn keyed_results_are_reordered_and_tagged_with_id() {
        let body = json!({
            "result": {
                "results": [1, 2],
                "items": {"1": {"x": 1}, "2": {"x": 2}}
            }
        });
        assert_eq!(
            extract_listings(&body),
            vec![json!({"x": 1, "id": 1}), json!({"x": 2, "id": 2})]
        );
    }

    #[test]
    fn keyed_results_skip_unknown_ids_and_keep_existing_id() {
        let body = json!({
            "data": {
                "results": ["b", "missing", "a"],
                "items": {"a": {"id": 10}, "b": {"title": "B"}}
            }
        });
        assert_eq!(
            extract_listings(&body),
            vec![json!({"title": "B", "id": "b"}), json!({"id": 10})]
        );
    }

    #[test]
    fn nested_list_takes_first_non_empty_array() {
        let body = json!({"result": {"results": [], "items": [], "list": [{"id": 5}]}});
        assert_eq!(match_shape(&body), Some((ResponseShape::NestedList, vec![json!({"id": 5})])));
    }

    #[test]
    fn empty_result_falls_through_to_data() {
        let body = json!({"result": {}, "data": {"items": [{"id": 3}]}});
        assert_eq!(extract_listings(&body), vec![json!({"id": 3})]);
    }

    #[test]
    fn top_level_items_are_the_last_resort() {
        let body = json!({"items": [{"id": 9}]});
        assert_eq!(match_shape(&body), Some((ResponseShape::TopLevelItems, vec![json!({"id": 9})])));
    }

    #[test]
    fn unknown_or_non_object_bodies_yield_nothing() {
        assert!(extract_listings(&json!({})).is_empty());
        assert!(extract_listings(&json!([1, 2, 3])).is_empty());
        assert!(extract_listings(&Value::Null).is_empty());
        assert!(extract_listings(&json!({"catalog": {"items": "nope"}})).is_empty());
    }
}
