use serde::{Deserialize, Serialize};
use url::Url;

use crate::config::{MAX_URL_LEN, MAX_WEBSITE_NAME_LEN};
use crate::error::DashboardError;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Website {
    pub id: i64,
    pub user_id: i64,
    pub url: String,
    pub name: String,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewWebsite {
    pub user_id: i64,
    pub url: String,
    pub name: String,
}

impl NewWebsite {
    /// Boundary validation. Nothing is persisted for a payload that fails
    /// here.
    pub fn validate(&self) -> Result<(), DashboardError> {
        let parsed = Url::parse(&self.url)
            .map_err(|e| DashboardError::validation(format!("invalid url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DashboardError::validation(
                "url must use http or https".to_string(),
            ));
        }
        if self.url.len() > MAX_URL_LEN {
            return Err(DashboardError::validation(format!(
                "url exceeds {MAX_URL_LEN} characters"
            )));
        }
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DashboardError::validation("name must not be empty"));
        }
        if name.len() > MAX_WEBSITE_NAME_LEN {
            return Err(DashboardError::validation(format!(
                "name exceeds {MAX_WEBSITE_NAME_LEN} characters"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_site(url: &str, name: &str) -> NewWebsite {
        NewWebsite {
            user_id: 1,
            url: url.to_string(),
            name: name.to_string(),
        }
    }

    #[test]
    fn test_valid_website_passes() {
        assert!(new_site("https://example.com", "Example").validate().is_ok());
    }

    #[test]
    fn test_malformed_url_rejected() {
        assert!(new_site("not a url", "Example").validate().is_err());
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        assert!(new_site("ftp://example.com", "Example").validate().is_err());
    }

    #[test]
    fn test_empty_name_rejected() {
        assert!(new_site("https://example.com", "   ").validate().is_err());
    }

    #[test]
    fn test_overlong_name_rejected() {
        let long = "x".repeat(MAX_WEBSITE_NAME_LEN + 1);
        assert!(new_site("https://example.com", &long).validate().is_err());
    }
}
