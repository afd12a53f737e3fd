use crate::models::ids::Uid;
use serde::{Deserialize, Serialize};

/// Catalog definition of an analysis type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisService {
    pub uid: Uid,
    pub keyword: String,
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
}

impl AnalysisService {
    pub fn new(keyword: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            uid: Uid::generate(),
            keyword: keyword.into(),
            title: title.into(),
            price: 0.0,
            category: None,
        }
    }

    pub fn with_price(mut self, price: f64) -> Self {
        self.price = price;
        self
    }
}

/// Per-service settings declared by a template or a profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSetting {
    pub uid: Uid,
    #[serde(default)]
    pub hidden: bool,
}

/// Anything that declares per-service settings
pub trait ServiceSettingsSource {
    fn service_settings(&self) -> &[ServiceSetting];
}

/// Named bundle of services requested together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub uid: Uid,
    pub title: String,
    /// Raw service uids as declared on the profile
    #[serde(default)]
    pub services: Vec<Uid>,
    #[serde(default)]
    pub settings: Vec<ServiceSetting>,
}

impl Profile {
    pub fn new(title: impl Into<String>, services: Vec<Uid>) -> Self {
        Self {
            uid: Uid::generate(),
            title: title.into(),
            services,
            settings: Vec::new(),
        }
    }
}

impl ServiceSettingsSource for Profile {
    fn service_settings(&self) -> &[ServiceSetting] {
        &self.settings
    }
}

/// Sample template with pre-selected services
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleTemplate {
    pub uid: Uid,
    pub title: String,
    #[serde(default)]
    pub settings: Vec<ServiceSetting>,
}

impl ServiceSettingsSource for SampleTemplate {
    fn service_settings(&self) -> &[ServiceSetting] {
        &self.settings
    }
}

/// Valid result interval for one analysis keyword
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultsRange {
    pub keyword: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_min: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn_max: Option<String>,
}

impl ResultsRange {
    pub fn new(keyword: impl Into<String>, min: impl Into<String>, max: impl Into<String>) -> Self {
        Self {
            keyword: keyword.into(),
            min: Some(min.into()),
            max: Some(max.into()),
            warn_min: None,
            warn_max: None,
        }
    }
}

/// Uids of the services flagged hidden, in declaration order
pub fn get_hidden_service_uids(source: Option<&dyn ServiceSettingsSource>) -> Vec<Uid> {
    source
        .map(|source| {
            source
                .service_settings()
                .iter()
                .filter(|setting| setting.hidden)
                .map(|setting| setting.uid.clone())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_service_uids() {
        let visible = Uid::generate();
        let hidden = Uid::generate();
        let template = SampleTemplate {
            uid: Uid::generate(),
            title: "Water".to_string(),
            settings: vec![
                ServiceSetting {
                    uid: visible,
                    hidden: false,
                },
                ServiceSetting {
                    uid: hidden.clone(),
                    hidden: true,
                },
            ],
        };

        assert_eq!(get_hidden_service_uids(Some(&template)), vec![hidden]);
        assert!(get_hidden_service_uids(None).is_empty());
    }

    #[test]
    fn test_results_range_serialization_omits_unset_bounds() {
        let range = ResultsRange::new("Ca", "5", "10");
        let json = serde_json::to_value(&range).unwrap();
        assert_eq!(json, serde_json::json!({"keyword": "Ca", "min": "5", "max": "10"}));
    }
}
