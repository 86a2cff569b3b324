// Substitutes values from one list item into the detail request template

use crate::capture::CapturedRequest;
use crate::error::{AnalysisError, Result};
use crate::locator::locate;
use crate::mapping::Mapping;
use fieldhound_scanner::OutboundRequest;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use url::Url;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailRequest {
    pub method: String,
    pub url: String,
    pub body: Option<String>,
    /// Mapped keys with no usable value in this item.
    pub omitted: Vec<String>,
}

impl DetailRequest {
    pub fn to_outbound(&self, template: &CapturedRequest) -> OutboundRequest {
        template.to_outbound(&self.url, self.body.clone())
    }
}

pub struct DetailRequestBuilder;

impl DetailRequestBuilder {
    pub fn build(item: &Value, mapping: &Mapping, template: &CapturedRequest) -> Result<DetailRequest> {
        let (resolved, omitted) = Self::resolve_values(item, mapping);
        if !omitted.is_empty() {
            debug!(omitted = ?omitted, "Mapped keys missing from item");
        }

        let mut url = Url::parse(&template.url())
            .map_err(|e| AnalysisError::InvalidUrl(format!("{}: {}", template.url(), e)))?;

        let body = if template.is_body_method() {
            Self::substitute_body(template, &resolved)
        } else {
            Self::substitute_query(&mut url, &resolved);
            None
        };

        Ok(DetailRequest {
            method: template.method(),
            url: url.to_string(),
            body,
            omitted,
        })
    }

    /// Re-resolve each key's best sample path against this item. The path
    /// found in the sample may not exist here, in which case the locator
    /// falls back to searching for the field by name.
    fn resolve_values(item: &Value, mapping: &Mapping) -> (Vec<(String, Value)>, Vec<String>) {
        let mut resolved = Vec::new();
        let mut omitted = Vec::new();

        for key in mapping.keys() {
            let found = mapping
                .best(key)
                .and_then(|best| locate(&item, &best.path.to_string()))
                .filter(|found| !found.value.is_null());

            match found {
                Some(found) => resolved.push((key.to_string(), found.value.clone())),
                None => omitted.push(key.to_string()),
            }
        }

        (resolved, omitted)
    }

    fn substitute_body(template: &CapturedRequest, resolved: &[(String, Value)]) -> Option<String> {
        match template.body_object() {
            Ok(mut body) => {
                for (key, value) in resolved {
                    body.insert(key.clone(), value.clone());
                }
                Some(Value::Object(body).to_string())
            }
            Err(_) => template.request_body.clone(),
        }
    }

    fn substitute_query(url: &mut Url, resolved: &[(String, Value)]) {
        let mut pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !resolved.iter().any(|(key, _)| key == k))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        pairs.extend(resolved.iter().map(|(k, v)| (k.clone(), query_value(v))));

        url.set_query(None);
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
