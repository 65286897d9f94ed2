//! Text limits matching the column widths in the `migration` crate.

use crate::error::{AppError, AppResult};

pub const MAX_EMAIL_LEN: usize = 255;
pub const MAX_NAME_LEN: usize = 100;
pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_ADDRESS_LEN: usize = 500;

/// Postgres `varchar(n)` counts characters, not bytes
pub fn check_length(field: &str, value: &str, max: usize) -> AppResult<()> {
    if value.chars().count() > max {
        return Err(AppError::BadRequest(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_at_limit_is_accepted() {
        assert!(check_length("name", &"a".repeat(MAX_NAME_LEN), MAX_NAME_LEN).is_ok());
    }

    #[test]
    fn test_over_limit_is_bad_request() {
        let err = check_length("name", &"a".repeat(MAX_NAME_LEN + 1), MAX_NAME_LEN).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(msg) if msg == "name cannot exceed 100 characters"));
    }

    #[test]
    fn test_counts_characters() {
        // 50 two-byte characters fit a 50 character column
        assert!(check_length("category", &"é".repeat(50), MAX_CATEGORY_LEN).is_ok());
    }
}
