//! Rule-driven form validation
//!
//! A field maps to a pipe-delimited rule string, e.g.
//! `required|notempty|min:10|max:5000`. Rules run in the listed order and a
//! field accumulates one error message per failing rule; form rendering shows
//! only the first per field.
//!
//! Supported rules: `required`, `notempty`, `min:N`, `max:N`, `integer`,
//! `array`, `file`, `image`, `mimes:csv`, `max_file_size:bytes`.
//! `min`/`max` check string length, array element count, or numeric value for
//! fields that carried an earlier `integer` rule. File rules fail gracefully
//! (collect an error) when no file was submitted.

use crate::upload::FileUpload;
use std::collections::{BTreeMap, HashMap};

/// A submitted form value
#[derive(Debug, Clone)]
pub enum FieldValue {
    /// Field absent from the request
    Missing,
    /// Plain text input
    Text(String),
    /// Repeated input (checkbox groups, `name[]` style)
    Items(Vec<String>),
    /// Uploaded file descriptor
    File(FileUpload),
}

/// Validation outcome: field name to ordered error messages
#[derive(Debug, Default)]
pub struct Validator {
    errors: BTreeMap<String, Vec<String>>,
}

impl Validator {
    /// Validate `data` against `rules` (field name → rule string)
    pub fn validate(data: &HashMap<String, FieldValue>, rules: &[(&str, &str)]) -> Self {
        let mut validator = Validator::default();

        for (field, rule_string) in rules {
            let value = data.get(*field).unwrap_or(&FieldValue::Missing);
            let checks: Vec<&str> = rule_string.split('|').collect();
            // Numeric min/max apply once an `integer` rule has run for the field
            let mut numeric = false;

            for check in checks {
                let (name, arg) = match check.split_once(':') {
                    Some((name, arg)) => (name, Some(arg)),
                    None => (check, None),
                };

                if name == "integer" {
                    numeric = true;
                }

                if let Some(message) = apply_rule(field, value, name, arg, numeric) {
                    validator.errors.entry(field.to_string()).or_default().push(message);
                }
            }
        }

        validator
    }

    /// True if any field has at least one error
    pub fn fails(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Field-to-error-list mapping, in rule evaluation order per field
    pub fn errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.errors
    }

    /// First error per field, for form display
    pub fn first_errors(&self) -> HashMap<String, String> {
        self.errors
            .iter()
            .filter_map(|(field, errors)| {
                errors.first().map(|e| (field.clone(), e.clone()))
            })
            .collect()
    }
}

/// Evaluate one rule; `Some(message)` on failure
fn apply_rule(
    field: &str,
    value: &FieldValue,
    name: &str,
    arg: Option<&str>,
    numeric: bool,
) -> Option<String> {
    match name {
        "required" => match value {
            FieldValue::Missing => Some(format!("The {} field is required.", field)),
            _ => None,
        },
        "notempty" => match value {
            FieldValue::Text(s) if s.is_empty() => {
                Some(format!("The {} field must not be empty.", field))
            }
            _ => None,
        },
        "min" => {
            let limit: i64 = arg?.parse().ok()?;
            check_bound(field, value, limit, numeric, true)
        }
        "max" => {
            let limit: i64 = arg?.parse().ok()?;
            check_bound(field, value, limit, numeric, false)
        }
        "integer" => match value {
            FieldValue::Text(s) if s.parse::<i64>().is_err() => {
                Some(format!("The {} field must be an integer.", field))
            }
            FieldValue::Items(_) | FieldValue::File(_) => {
                Some(format!("The {} field must be an integer.", field))
            }
            _ => None,
        },
        "array" => match value {
            FieldValue::Items(_) | FieldValue::Missing => None,
            _ => Some(format!("The {} field must be an array.", field)),
        },
        "file" => match value {
            FieldValue::File(_) => None,
            _ => Some(format!("The {} field must be an uploaded file.", field)),
        },
        "image" => match value {
            FieldValue::File(upload) if !upload.content_type.starts_with("image/") => {
                Some(format!("The {} field must be an image.", field))
            }
            _ => None,
        },
        "mimes" => match value {
            FieldValue::File(upload) => {
                let allowed: Vec<&str> = arg?.split(',').collect();
                let ext = upload.extension();
                if allowed.iter().any(|a| a.eq_ignore_ascii_case(&ext)) {
                    None
                } else {
                    Some(format!(
                        "The {} field must be a file of type: {}.",
                        field,
                        arg.unwrap_or_default()
                    ))
                }
            }
            _ => None,
        },
        "max_file_size" => match value {
            FieldValue::File(upload) => {
                let limit: usize = arg?.parse().ok()?;
                if upload.bytes.len() > limit {
                    Some(format!(
                        "The {} field must not exceed {} bytes.",
                        field, limit
                    ))
                } else {
                    None
                }
            }
            _ => None,
        },
        _ => None,
    }
}

/// min/max bound check; absent values are skipped (required handles those)
fn check_bound(
    field: &str,
    value: &FieldValue,
    limit: i64,
    numeric: bool,
    is_min: bool,
) -> Option<String> {
    let measured: i64 = match value {
        FieldValue::Missing | FieldValue::File(_) => return None,
        FieldValue::Items(items) => items.len() as i64,
        FieldValue::Text(s) => {
            if numeric {
                s.parse::<i64>().ok()?
            } else {
                s.chars().count() as i64
            }
        }
    };

    let failed = if is_min { measured < limit } else { measured > limit };
    if !failed {
        return None;
    }

    let noun = match value {
        FieldValue::Items(_) => "items",
        FieldValue::Text(_) if numeric => "in value",
        _ => "characters",
    };
    if is_min {
        Some(format!("The {} field must be at least {} {}.", field, limit, noun))
    } else {
        Some(format!("The {} field must be at most {} {}.", field, limit, noun))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> FieldValue {
        FieldValue::Text(s.to_string())
    }

    fn jpeg(len: usize) -> FieldValue {
        FieldValue::File(FileUpload {
            original_name: "cover.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            bytes: vec![0u8; len],
        })
    }

    #[test]
    fn empty_string_passes_required_fails_notempty() {
        let mut data = HashMap::new();
        data.insert("title".to_string(), text(""));

        let v = Validator::validate(&data, &[("title", "required|notempty")]);

        assert!(v.fails());
        let errors = &v.errors()["title"];
        assert_eq!(errors.len(), 1, "required must pass for a present value");
        assert!(errors[0].contains("must not be empty"));
    }

    #[test]
    fn missing_field_fails_required_only_once() {
        let data = HashMap::new();

        let v = Validator::validate(&data, &[("title", "required|notempty|min:1|max:255")]);

        let errors = &v.errors()["title"];
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("is required"));
    }

    #[test]
    fn length_bounds_check_string_length() {
        let mut data = HashMap::new();
        data.insert("description".to_string(), text("too short"));

        let v = Validator::validate(&data, &[("description", "required|notempty|min:10|max:5000")]);
        assert!(v.fails());

        data.insert("description".to_string(), text("long enough now"));
        let v = Validator::validate(&data, &[("description", "required|notempty|min:10|max:5000")]);
        assert!(!v.fails());
    }

    #[test]
    fn integer_rule_switches_bounds_to_numeric() {
        let mut data = HashMap::new();
        // Three digits: length 3 but value 500
        data.insert("count".to_string(), text("500"));

        let v = Validator::validate(&data, &[("count", "required|integer|max:255")]);
        assert!(v.fails(), "numeric comparison must apply after integer rule");

        let v = Validator::validate(&data, &[("count", "required|max:255")]);
        assert!(!v.fails(), "length comparison applies without integer rule");
    }

    #[test]
    fn non_integer_text_fails_integer_rule() {
        let mut data = HashMap::new();
        data.insert("genre_id".to_string(), text("fantasy"));

        let v = Validator::validate(&data, &[("genre_id", "required|integer")]);
        assert!(v.fails());
    }

    #[test]
    fn array_bounds_check_element_count() {
        let mut data = HashMap::new();
        data.insert(
            "platform_ids".to_string(),
            FieldValue::Items(vec!["1".to_string(), "2".to_string()]),
        );

        let v = Validator::validate(&data, &[("platform_ids", "required|array|min:1|max:10")]);
        assert!(!v.fails());

        data.insert("platform_ids".to_string(), FieldValue::Items(vec![]));
        let v = Validator::validate(&data, &[("platform_ids", "required|array|min:1|max:10")]);
        assert!(v.fails());
    }

    #[test]
    fn oversized_file_fails_size_rule() {
        let mut data = HashMap::new();
        data.insert("image".to_string(), jpeg(10 * 1024 * 1024));

        let v = Validator::validate(
            &data,
            &[("image", "required|file|image|mimes:jpg,jpeg,png|max_file_size:5242880")],
        );

        assert!(v.fails());
        let first = v.first_errors();
        assert!(first["image"].contains("must not exceed"));
    }

    #[test]
    fn valid_jpeg_passes_all_file_rules() {
        let mut data = HashMap::new();
        data.insert("image".to_string(), jpeg(1024));

        let v = Validator::validate(
            &data,
            &[("image", "required|file|image|mimes:jpg,jpeg,png|max_file_size:5242880")],
        );

        assert!(!v.fails(), "errors: {:?}", v.errors());
    }

    #[test]
    fn missing_file_fails_gracefully() {
        let data = HashMap::new();

        let v = Validator::validate(
            &data,
            &[("image", "required|file|image|mimes:jpg,jpeg,png|max_file_size:5242880")],
        );

        assert!(v.fails());
        // required and file both fail; image/mimes/size skip absent values
        assert_eq!(v.errors()["image"].len(), 2);
    }

    #[test]
    fn disallowed_extension_fails_mimes() {
        let mut data = HashMap::new();
        data.insert(
            "image".to_string(),
            FieldValue::File(FileUpload {
                original_name: "cover.gif".to_string(),
                content_type: "image/gif".to_string(),
                bytes: vec![0u8; 64],
            }),
        );

        let v = Validator::validate(&data, &[("image", "file|image|mimes:jpg,jpeg,png")]);
        assert!(v.fails());
        assert!(v.first_errors()["image"].contains("file of type"));
    }
}
