// Validation utilities for string fields

/// Trim a field and reject it when required but empty
pub fn trim_and_validate_field(field: &str, required: bool) -> Result<String, String> {
    let trimmed = field.trim().to_string();
    if trimmed.is_empty() {
        if required {
            Err("Field cannot be empty".to_string())
        } else {
            Ok(trimmed)
        }
    } else {
        Ok(trimmed)
    }
}

/// Trim an optional field, collapsing whitespace-only values to None
pub fn trim_optional_field(field: Option<&String>) -> Option<String> {
    field.and_then(|s| {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_field() {
        assert_eq!(trim_and_validate_field("  jalan mawar 5 ", true).unwrap(), "jalan mawar 5");
        assert!(trim_and_validate_field("   ", true).is_err());
        assert_eq!(trim_and_validate_field("   ", false).unwrap(), "");
    }

    #[test]
    fn test_optional_field() {
        let some = "  hello ".to_string();
        let blank = "   ".to_string();
        assert_eq!(trim_optional_field(Some(&some)), Some("hello".to_string()));
        assert_eq!(trim_optional_field(Some(&blank)), None);
        assert_eq!(trim_optional_field(None), None);
    }
}
