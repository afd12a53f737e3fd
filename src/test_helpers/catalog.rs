use crate::error::LimsResult;
use crate::models::{AnalysisService, Profile, SampleTemplate, Uid};
use crate::portal::{ServiceQuery, SetupCatalog};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Setup catalog over in-memory services, profiles and templates. Searches
/// return matches in insertion order.
#[derive(Debug, Default)]
pub struct InMemorySetupCatalog {
    services: RwLock<Vec<AnalysisService>>,
    profiles: RwLock<Vec<Profile>>,
    templates: RwLock<Vec<SampleTemplate>>,
}

impl InMemorySetupCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_service(&self, service: AnalysisService) {
        self.services.write().push(service);
    }

    pub fn add_profile(&self, profile: Profile) {
        self.profiles.write().push(profile);
    }

    pub fn add_template(&self, template: SampleTemplate) {
        self.templates.write().push(template);
    }
}

#[async_trait]
impl SetupCatalog for InMemorySetupCatalog {
    async fn get_service(&self, uid: &Uid) -> LimsResult<Option<AnalysisService>> {
        Ok(self.services.read().iter().find(|s| &s.uid == uid).cloned())
    }

    async fn search_services(&self, query: &ServiceQuery) -> LimsResult<Vec<AnalysisService>> {
        let services = self.services.read();
        let matches = services
            .iter()
            .filter(|service| match query {
                ServiceQuery::Keyword(keyword) => &service.keyword == keyword,
                ServiceQuery::Title(title) => &service.title == title,
            })
            .cloned()
            .collect();
        Ok(matches)
    }

    async fn get_profile(&self, uid: &Uid) -> LimsResult<Option<Profile>> {
        Ok(self.profiles.read().iter().find(|p| &p.uid == uid).cloned())
    }

    async fn get_template(&self, uid: &Uid) -> LimsResult<Option<SampleTemplate>> {
        Ok(self.templates.read().iter().find(|t| &t.uid == uid).cloned())
    }
}
