//! # Service Resolver
//!
//! Normalises the many ways a caller can name an analysis service (uid,
//! keyword, title, the service itself or an analysis of it) into service
//! uids. References that cannot be resolved to exactly one service are
//! dropped with a warning; they never abort the resolution of the others.

use crate::constants::{fields, UNSET_UID};
use crate::error::LimsResult;
use crate::models::fields::{value_to_list, value_to_uids};
use crate::models::{Analysis, AnalysisService, Content, FieldValues, Uid};
use crate::portal::{ServiceQuery, SetupCatalog};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Anything a caller may pass to name an analysis service
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceRef {
    /// A uid, keyword or title
    Text(String),
    Service(AnalysisService),
    /// Resolves to the service the analysis was created from
    Analysis(Analysis),
}

impl From<&str> for ServiceRef {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ServiceRef {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&Uid> for ServiceRef {
    fn from(uid: &Uid) -> Self {
        Self::Text(uid.to_string())
    }
}

impl From<AnalysisService> for ServiceRef {
    fn from(service: AnalysisService) -> Self {
        Self::Service(service)
    }
}

impl From<Analysis> for ServiceRef {
    fn from(analysis: Analysis) -> Self {
        Self::Analysis(analysis)
    }
}

#[derive(Clone)]
pub struct ServiceResolver {
    catalog: Arc<dyn SetupCatalog>,
}

impl std::fmt::Debug for ServiceResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceResolver").finish_non_exhaustive()
    }
}

impl ServiceResolver {
    pub fn new(catalog: Arc<dyn SetupCatalog>) -> Self {
        Self { catalog }
    }

    /// Resolve `services` plus whatever `values` carries under `Analyses`
    /// and `Profiles` into service uids. Duplicates are removed keeping the
    /// first occurrence.
    pub async fn resolve_service_uids(
        &self,
        services: &[ServiceRef],
        values: &FieldValues,
    ) -> LimsResult<Vec<Uid>> {
        let mut refs: Vec<ServiceRef> = services.to_vec();
        for item in value_to_list(values.get(fields::ANALYSES)) {
            match item {
                Value::String(text) => refs.push(ServiceRef::Text(text)),
                other => warn!(value = %other, "Unsupported service reference"),
            }
        }

        let mut uids = Vec::with_capacity(refs.len());
        for service_ref in &refs {
            if let Some(uid) = self.to_service_uid(service_ref).await? {
                uids.push(uid);
            }
        }

        for profile_uid in value_to_uids(values.get(fields::PROFILES)) {
            match self.catalog.get_profile(&profile_uid).await? {
                Some(profile) => uids.extend(profile.services.iter().cloned()),
                None => warn!(profile = %profile_uid, "Profile not found"),
            }
        }

        let mut seen = HashSet::with_capacity(uids.len());
        uids.retain(|uid| seen.insert(uid.clone()));
        debug!(count = uids.len(), "Resolved service uids");
        Ok(uids)
    }

    /// Resolve a single reference. Keyword and title lookups only accept a
    /// unique match.
    pub async fn to_service_uid(&self, service_ref: &ServiceRef) -> LimsResult<Option<Uid>> {
        match service_ref {
            ServiceRef::Service(service) => Ok(Some(service.uid.clone())),
            ServiceRef::Analysis(analysis) => {
                let uid = analysis.service_uid();
                if uid.is_none() {
                    warn!(analysis = %analysis.uid(), "Analysis has no service");
                }
                Ok(uid)
            }
            ServiceRef::Text(text) => self.resolve_text(text).await,
        }
    }

    async fn resolve_text(&self, text: &str) -> LimsResult<Option<Uid>> {
        if text != UNSET_UID {
            if let Some(uid) = Uid::parse(text) {
                return Ok(Some(uid));
            }
        }

        let queries = [
            ServiceQuery::Keyword(text.to_string()),
            ServiceQuery::Title(text.to_string()),
        ];
        for query in &queries {
            let mut matches = self.catalog.search_services(query).await?;
            if matches.len() == 1 {
                return Ok(matches.pop().map(|service| service.uid));
            }
        }

        warn!(reference = text, "Cannot resolve service reference");
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Profile;
    use crate::test_helpers::InMemorySetupCatalog;
    use serde_json::json;

    fn resolver_with(services: &[&AnalysisService]) -> (ServiceResolver, Arc<InMemorySetupCatalog>) {
        let catalog = Arc::new(InMemorySetupCatalog::new());
        for service in services {
            catalog.add_service((*service).clone());
        }
        (ServiceResolver::new(catalog.clone()), catalog)
    }

    #[tokio::test]
    async fn test_first_occurrence_order_is_kept() {
        let a = AnalysisService::new("Ca", "Calcium");
        let b = AnalysisService::new("Mg", "Magnesium");
        let c = AnalysisService::new("Fe", "Iron");
        let (resolver, _) = resolver_with(&[&a, &b, &c]);

        let refs: Vec<ServiceRef> = vec![
            (&a.uid).into(),
            "Mg".into(),
            a.clone().into(),
            "Iron".into(),
        ];
        let uids = resolver
            .resolve_service_uids(&refs, &FieldValues::new())
            .await
            .unwrap();

        assert_eq!(uids, vec![a.uid, b.uid, c.uid]);
    }

    #[tokio::test]
    async fn test_ambiguous_and_unknown_references_are_dropped() {
        let a = AnalysisService::new("Ca", "Metal");
        let b = AnalysisService::new("Mg", "Metal");
        let (resolver, _) = resolver_with(&[&a, &b]);

        let refs: Vec<ServiceRef> = vec!["Metal".into(), "Unobtainium".into(), "0".into(), "Mg".into()];
        let uids = resolver
            .resolve_service_uids(&refs, &FieldValues::new())
            .await
            .unwrap();

        assert_eq!(uids, vec![b.uid]);
    }

    #[tokio::test]
    async fn test_merges_values_and_expands_profiles() {
        let a = AnalysisService::new("Ca", "Calcium");
        let b = AnalysisService::new("Mg", "Magnesium");
        let c = AnalysisService::new("Fe", "Iron");
        let (resolver, catalog) = resolver_with(&[&a, &b, &c]);
        let profile = Profile::new("Metals", vec![c.uid.clone(), a.uid.clone()]);
        catalog.add_profile(profile.clone());

        let mut values = FieldValues::new();
        values.insert("Analyses".to_string(), json!(["Mg"]));
        values.insert("Profiles".to_string(), json!([profile.uid.as_str()]));

        let uids = resolver
            .resolve_service_uids(&["Calcium".into()], &values)
            .await
            .unwrap();

        assert_eq!(uids, vec![a.uid, b.uid, c.uid]);
    }

    #[tokio::test]
    async fn test_analysis_resolves_to_its_service() {
        let a = AnalysisService::new("Ca", "Calcium");
        let (resolver, _) = resolver_with(&[&a]);
        let mut analysis = Analysis::new(Uid::generate(), "Ca");
        analysis.apply_service(&a, 10.0, None);

        let uid = resolver
            .to_service_uid(&ServiceRef::Analysis(analysis))
            .await
            .unwrap();

        assert_eq!(uid, Some(a.uid));
    }
}
