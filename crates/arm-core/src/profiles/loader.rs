//! Cached profile loader.

use super::{PatientLookup, PatientSource, ProfileError, ProfileResult, SourceResult};
use crate::models::{PatientProfile, ProfileOption, Sns};

type BoxedSource = Box<dyn PatientSource + Send>;
type BoxedLookup = Box<dyn PatientLookup + Send>;

/// Resolves SNS identifiers to patient profiles.
///
/// The cache is filled lazily from the bulk source on first use and
/// backfilled by every successful single lookup.
pub struct ProfileLoader {
    bulk: BoxedSource,
    lookup: BoxedLookup,
    cache: Vec<PatientProfile>,
    initialized: bool,
}

impl std::fmt::Debug for ProfileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileLoader")
            .field("cached", &self.cache.len())
            .field("initialized", &self.initialized)
            .finish()
    }
}

impl ProfileLoader {
    pub fn new<B, L>(bulk: B, lookup: L) -> Self
    where
        B: PatientSource + Send + 'static,
        L: PatientLookup + Send + 'static,
    {
        Self {
            bulk: Box::new(bulk),
            lookup: Box::new(lookup),
            cache: Vec::new(),
            initialized: false,
        }
    }

    /// Load the bulk source into the cache.
    ///
    /// Runs once; a failure leaves the cache empty and is retried on the next
    /// call. Returns the number of cached profiles.
    pub fn initialize(&mut self) -> SourceResult<usize> {
        if self.initialized {
            return Ok(self.cache.len());
        }

        let profiles = self.bulk.load_all()?;
        for profile in profiles {
            self.insert(profile);
        }
        self.initialized = true;
        tracing::info!("Patient profiles loaded: {} profiles available", self.cache.len());
        Ok(self.cache.len())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Validate `raw` and resolve it to a profile.
    pub fn resolve(&mut self, raw: &str) -> ProfileResult<PatientProfile> {
        let sns = Sns::parse(raw)?;
        self.resolve_sns(&sns)
    }

    /// Resolve an already validated identifier.
    pub fn resolve_sns(&mut self, sns: &Sns) -> ProfileResult<PatientProfile> {
        self.ensure_initialized();

        if let Some(profile) = self.cached(sns) {
            tracing::debug!(sns = %sns, "profile cache hit");
            return Ok(profile.clone());
        }

        match self.lookup.lookup(sns)? {
            Some(profile) => {
                tracing::info!(sns = %sns, "profile resolved by lookup");
                self.insert(profile.clone());
                Ok(profile)
            }
            None => Err(ProfileError::NotFound(sns.clone())),
        }
    }

    /// Identifier/name pairs for every cached profile, in cache order.
    pub fn list_available(&mut self) -> Vec<ProfileOption> {
        self.ensure_initialized();
        self.cache.iter().map(PatientProfile::option).collect()
    }

    /// Every cached profile.
    pub fn profiles(&self) -> &[PatientProfile] {
        &self.cache
    }

    pub fn cached(&self, sns: &Sns) -> Option<&PatientProfile> {
        self.cache.iter().find(|p| &p.sns == sns)
    }

    fn ensure_initialized(&mut self) {
        if let Err(e) = self.initialize() {
            tracing::warn!("Failed to initialize patient profiles: {}", e);
        }
    }

    /// Insert or replace by identifier.
    fn insert(&mut self, profile: PatientProfile) {
        match self.cache.iter_mut().find(|p| p.sns == profile.sns) {
            Some(existing) => *existing = profile,
            None => self.cache.push(profile),
        }
    }
}
