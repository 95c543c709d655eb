use axum::extract::Multipart;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::storage::Upload;
use crate::utils::error::AppError;
use crate::utils::validation::Validator;

/// A fully read multipart form: text fields by name plus at most one file
/// per field.
#[derive(Debug, Default)]
pub struct FormData {
    fields: HashMap<String, Vec<String>>,
    files: HashMap<String, Upload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> Result<Self, AppError> {
        let mut form = Self::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            let is_file = field.file_name().is_some();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();

            if is_file {
                let bytes = field.bytes().await?;
                // Browsers send an empty part for an untouched file input.
                if !bytes.is_empty() {
                    form.files.insert(
                        name.clone(),
                        Upload {
                            field: name,
                            content_type,
                            bytes,
                        },
                    );
                }
            } else {
                let text = field.text().await?;
                form.fields.entry(name).or_default().push(text);
            }
        }

        Ok(form)
    }

    /// First non-blank value of a text field, trimmed.
    pub fn text(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|values| values.iter().map(|v| v.trim()).find(|v| !v.is_empty()))
            .map(str::to_string)
    }

    /// Every value of a list field. Accepts repeated fields, `name[]`
    /// fields, comma-separated values and JSON-style `["a","b"]` strings.
    pub fn list(&self, name: &str) -> Vec<String> {
        let bracketed = format!("{name}[]");
        [name, bracketed.as_str()]
            .iter()
            .filter_map(|key| self.fields.get(*key))
            .flatten()
            .flat_map(|value| value.split(','))
            .map(|item| item.trim_matches(|c: char| c.is_whitespace() || matches!(c, '[' | ']' | '"')))
            .filter(|item| !item.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn take_file(&mut self, name: &str) -> Option<Upload> {
        self.files.remove(name)
    }

    /// Parses an optional field, recording a problem when it is present but
    /// malformed.
    pub fn parsed<T: FromStr>(&self, v: &mut Validator, name: &str) -> Option<T> {
        let raw = self.text(name)?;
        let parsed = raw.parse().ok();
        v.check(parsed.is_some(), format!("{name} has an invalid value '{raw}'"));
        parsed
    }

    pub fn uuids(&self, v: &mut Validator, name: &str) -> Vec<Uuid> {
        self.list(name)
            .into_iter()
            .filter_map(|raw| {
                let parsed = Uuid::parse_str(&raw).ok();
                v.check(parsed.is_some(), format!("{name} has an invalid id '{raw}'"));
                parsed
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> FormData {
        let mut form = FormData::default();
        for (name, value) in pairs {
            form.fields
                .entry(name.to_string())
                .or_default()
                .push(value.to_string());
        }
        form
    }

    #[test]
    fn test_list_accepts_every_encoding() {
        let a = Uuid::new_v4().to_string();
        let b = Uuid::new_v4().to_string();
        let c = Uuid::new_v4().to_string();

        let json_style = format!("[\"{a}\", \"{b}\"]");
        let f = form(&[("theaters", json_style.as_str()), ("theaters[]", c.as_str())]);
        assert_eq!(f.list("theaters"), vec![a.clone(), b.clone(), c]);

        let comma = format!("{a},{b}");
        let f = form(&[("theaters", comma.as_str())]);
        assert_eq!(f.list("theaters"), vec![a, b]);
    }

    #[test]
    fn test_parsed_reports_garbage() {
        let f = form(&[("price", "abc"), ("available", "true"), ("title", "  ")]);
        let mut v = Validator::new();

        assert_eq!(f.parsed::<i64>(&mut v, "price"), None);
        assert_eq!(f.parsed::<bool>(&mut v, "available"), Some(true));
        assert_eq!(f.text("title"), None);
        assert!(v.finish().is_err());
    }
}
