//! Accumulates walker output into a [`RuleSet`]

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::rules::{AccessRule, AppletSelector, ApplicationSelector, FileId, RefreshTag, RuleSet};

/// Collects the pieces of an access rule set while the file chain is read
#[derive(Debug, Default)]
pub struct RuleBuilder {
    acmf: Option<FileId>,
    refresh_tag: Option<RefreshTag>,
    entries: Vec<(AppletSelector, FileId)>,
    conditions: HashMap<FileId, ApplicationSelector>,
}

impl RuleBuilder {
    /// Create an empty builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the access-control main file
    ///
    /// Only one ACMF is supported per card.
    pub fn register_acmf(&mut self, file: FileId) -> Result<()> {
        if self.acmf.is_some() {
            return Err(Error::MultipleAcmfFiles);
        }
        self.acmf = Some(file);
        Ok(())
    }

    /// Registered access-control main file
    pub const fn acmf(&self) -> Option<FileId> {
        self.acmf
    }

    /// Record the ACMF refresh tag
    pub const fn set_refresh_tag(&mut self, tag: RefreshTag) {
        self.refresh_tag = Some(tag);
    }

    /// Recorded refresh tag
    pub const fn refresh_tag(&self) -> Option<RefreshTag> {
        self.refresh_tag
    }

    /// Append an ACRules entry
    pub fn add_rule_entry(&mut self, applet: AppletSelector, condition: FileId) {
        self.entries.push((applet, condition));
    }

    /// Condition files referenced by the rules, each once, in order of first reference
    pub fn condition_files(&self) -> Vec<FileId> {
        let mut files = Vec::new();
        for (_, file) in &self.entries {
            if !files.contains(file) {
                files.push(*file);
            }
        }
        files
    }

    /// Record what a condition file grants
    pub fn add_condition(&mut self, file: FileId, application: ApplicationSelector) {
        self.conditions.insert(file, application);
    }

    /// Produce the rules in ACRules order
    pub fn build(self) -> Result<RuleSet> {
        let Self {
            entries,
            conditions,
            ..
        } = self;

        entries
            .into_iter()
            .map(|(applet, file)| {
                conditions
                    .get(&file)
                    .cloned()
                    .map(|application| AccessRule::new(applet, application))
                    .ok_or(Error::MissingCondition(file))
            })
            .collect::<Result<Vec<_>>>()
            .map(RuleSet::from)
    }
}
