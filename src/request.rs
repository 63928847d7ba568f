use crate::logger::Logger;
use crate::record::Fields;
use serde::Serialize;
use serde_json::{Map, Value};

/// Turn an inbound HTTP request into `http.*` custom fields.
///
/// The `Authorization` header never ends up in the fields. When a header
/// repeats, its last value is kept.
pub fn request_fields<'a, I>(
    method: &str,
    path: &str,
    query: &str,
    headers: I,
    body: &impl Serialize,
) -> Result<Fields, serde_json::Error>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut header_map = Map::new();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case("authorization") {
            continue;
        }
        header_map.insert(name.to_string(), Value::String(value.to_string()));
    }

    let mut fields = Fields::new();
    fields.insert("http.method".into(), Value::from(method));
    fields.insert("http.path_parameters".into(), Value::from(path));
    fields.insert("http.query_parameters".into(), Value::from(query));
    fields.insert("http.headers".into(), Value::Object(header_map));
    fields.insert("http.body".into(), Value::String(serde_json::to_string(body)?));
    Ok(fields)
}

impl Logger {
    /// Send an info record describing a received request.
    ///
    /// A body that cannot be serialized is reported with a warning and
    /// the request is still logged with an empty `http.body`.
    #[track_caller]
    pub fn request_received<'a, I>(&self, method: &str, path: &str, query: &str, headers: I, body: &impl Serialize)
    where
        I: IntoIterator<Item = (&'a str, &'a str)> + Clone,
    {
        let fields = match request_fields(method, path, query, headers.clone(), body) {
            Ok(fields) => fields,
            Err(e) => {
                self.warn(format!("Error during json marshalling in request_received: {}", e), None);
                let mut fields = request_fields(method, path, query, headers, &())
                    .unwrap_or_default();
                fields.insert("http.body".into(), Value::String(String::new()));
                fields
            }
        };
        self.info("New request received", Some(fields));
    }
}
