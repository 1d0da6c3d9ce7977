//! Site-wide settings, including the admin passcode.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Collection, Record};
use crate::error::{Error, Result};

/// Identifier of the single settings document.
pub const SETTINGS_ID: &str = "site";

/// Contact details and the admin passcode.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    /// Public contact email.
    pub contact_email: String,
    /// Public phone number.
    pub phone: String,
    /// City or region shown in the footer.
    pub location: String,
    /// Social profile links keyed by network name.
    pub social_links: BTreeMap<String, String>,
    /// Shared secret for the admin API. Empty disables admin login.
    pub admin_passcode: String,
}

impl SiteSettings {
    /// The settings safe to show on the public site.
    #[must_use]
    pub fn public(&self) -> PublicSettings {
        PublicSettings {
            contact_email: self.contact_email.clone(),
            phone: self.phone.clone(),
            location: self.location.clone(),
            social_links: self.social_links.clone(),
        }
    }
}

impl fmt::Debug for SiteSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SiteSettings")
            .field("contact_email", &self.contact_email)
            .field("phone", &self.phone)
            .field("location", &self.location)
            .field("social_links", &self.social_links)
            .field("admin_passcode", &"<redacted>")
            .finish()
    }
}

impl Record for SiteSettings {
    const COLLECTION: Collection = Collection::Settings;

    fn id(&self) -> String {
        SETTINGS_ID.to_string()
    }

    fn validate(&self) -> Result<()> {
        if !self.contact_email.is_empty() && !self.contact_email.contains('@') {
            return Err(Error::invalid(format!(
                "contactEmail is not an email address: {:?}",
                self.contact_email
            )));
        }
        Ok(())
    }
}

/// Settings with the passcode removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicSettings {
    /// Public contact email.
    pub contact_email: String,
    /// Public phone number.
    pub phone: String,
    /// City or region shown in the footer.
    pub location: String,
    /// Social profile links keyed by network name.
    pub social_links: BTreeMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SiteSettings {
        SiteSettings {
            contact_email: "hello@example.com".to_string(),
            phone: "+1 555 0100".to_string(),
            location: "Denver, CO".to_string(),
            social_links: BTreeMap::from([(
                "linkedin".to_string(),
                "https://linkedin.com/in/example".to_string(),
            )]),
            admin_passcode: "open-sesame".to_string(),
        }
    }

    #[test]
    fn test_public_view_omits_passcode() {
        let public = settings().public();
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("hello@example.com"));
        assert!(!json.contains("open-sesame"));
    }

    #[test]
    fn test_debug_redacts_passcode() {
        let debug_str = format!("{:?}", settings());
        assert!(debug_str.contains("<redacted>"));
        assert!(!debug_str.contains("open-sesame"));
    }

    #[test]
    fn test_fixed_id() {
        assert_eq!(settings().id(), SETTINGS_ID);
        let mut s = settings();
        s.assign_id("other");
        assert_eq!(s.id(), SETTINGS_ID);
    }

    #[test]
    fn test_validate_email() {
        assert!(settings().validate().is_ok());
        assert!(SiteSettings::default().validate().is_ok());

        let mut s = settings();
        s.contact_email = "not-an-email".to_string();
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let s: SiteSettings = serde_json::from_str(r#"{"phone":"555"}"#).unwrap();
        assert_eq!(s.phone, "555");
        assert!(s.admin_passcode.is_empty());
    }
}
