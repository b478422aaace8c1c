//! Deployment profile catalog
//!
//! Profiles are loaded from the `profiles` section of the configuration and
//! looked up by name when a router is created.

use std::collections::HashMap;

use async_trait::async_trait;
use log::debug;

use crate::core::{error::CatalogError, model::Profile, Catalog, RouterError, RouterResult};

/// Profile `type` a router must be created from.
pub const PAAS_TYPE: &str = "router";
/// Profile `sub_type` a router must be created from.
pub const PAAS_SUB_TYPE: &str = "jk";

/// [`Catalog`] backed by a fixed set of profiles.
#[derive(Default)]
pub struct StaticCatalog {
    profiles: HashMap<String, Profile>,
}

impl StaticCatalog {
    pub fn new(profiles: impl IntoIterator<Item = Profile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|profile| (profile.name.clone(), profile))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl Catalog for StaticCatalog {
    async fn get_paas_configuration(&self, name: &str) -> Result<Profile, CatalogError> {
        debug!("Looking up PaaS configuration '{name}'");
        self.profiles
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::UnknownProfile(name.to_string()))
    }
}

/// Check that `profile` describes a JK router.
pub fn validate_router_profile(profile: &Profile) -> RouterResult<()> {
    if profile.kind != PAAS_TYPE {
        return Err(RouterError::InvalidProfile {
            name: profile.name.clone(),
            field: "type",
            expected: PAAS_TYPE,
            actual: profile.kind.clone(),
        });
    }
    if profile.sub_type != PAAS_SUB_TYPE {
        return Err(RouterError::InvalidProfile {
            name: profile.name.clone(),
            field: "subtype",
            expected: PAAS_SUB_TYPE,
            actual: profile.sub_type.clone(),
        });
    }
    Ok(())
}
