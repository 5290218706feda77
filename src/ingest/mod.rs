//! Ingest orchestration: one package in, one committed object (plus children) out.
//!
//! Each package moves through
//! `Parsed → Validated → TypeResolved → MetadataCrosswalked →
//! (ContentStaged → LicenseReconciled, content objects only) → Finalized →
//! Committed`. Every stage before `Committed` works on a [`TargetObject`]
//! draft, so a failure anywhere earlier leaves repository objects untouched.
//! Containers recurse into their child packages after their own commit.
use crate::config::{build_registry, IngestConfig};
use crate::crosswalk::{CrosswalkInvoker, CrosswalkRegistry};
use crate::error::{IngestError, IngestFailure};
use crate::finalize::finish_object;
use crate::license::{self, LicenseAction};
use crate::manifest::{ChildRef, Manifest, MetadataSection, ParsedManifest};
use crate::package::PackageSource;
use crate::params::PackageParameters;
use crate::repository::Repository;
use crate::schema::{MetadataField, ObjectFamily, ObjectId, ObjectType};
use crate::select::{select_sections, PrimaryRule, SectionDescriptor, Selection};
use crate::target::TargetObject;
use crate::validate::{check_handle, check_profile, resolve_family};
use serde::Serialize;
use std::fmt;

mod commit;
mod files;


/// Pipeline stages, in order. A failure records the stage being attempted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStage {
    Parsed,
    Validated,
    /// Object type, target identity and parent resolved.
    TypeResolved,
    MetadataCrosswalked,
    ContentStaged,
    LicenseReconciled,
    Finalized,
    Committed,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Parsed => "parsed",
            IngestStage::Validated => "validated",
            IngestStage::TypeResolved => "type_resolved",
            IngestStage::MetadataCrosswalked => "metadata_crosswalked",
            IngestStage::ContentStaged => "content_staged",
            IngestStage::LicenseReconciled => "license_reconciled",
            IngestStage::Finalized => "finalized",
            IngestStage::Committed => "committed",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a successful ingest.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub id: ObjectId,
    pub handle: String,
    pub object_type: ObjectType,
    pub location: String,
    /// True when an existing object was replaced in place.
    pub replaced: bool,
    pub stages: Vec<IngestStage>,
    pub selection_rule: PrimaryRule,
    /// Section ids passed to a crosswalk, in invocation order.
    pub crosswalked_sections: Vec<String>,
    pub excluded_sections: Vec<String>,
    /// `None` for containers.
    pub license: Option<LicenseAction>,
    pub attached_files: Vec<String>,
    pub created_fields: Vec<MetadataField>,
    pub warnings: Vec<String>,
    pub children: Vec<IngestOutcome>,
}

/// What an ingest would do, without touching a repository.
#[derive(Debug, Clone, Serialize)]
pub struct PackagePreview {
    pub location: String,
    pub object_type: ObjectType,
    pub family: ObjectFamily,
    pub handle: Option<String>,
    pub parent_handle: Option<String>,
    pub selection_rule: PrimaryRule,
    pub primary_section: String,
    pub supplementary_sections: Vec<String>,
    pub excluded_sections: Vec<String>,
    pub administrative_sections: Vec<String>,
    pub files: usize,
    pub children: Vec<ChildRef>,
    pub warnings: Vec<String>,
}

/// Stage bookkeeping for one package.
struct Progress {
    location: String,
    stage: IngestStage,
    handle: Option<String>,
    reached: Vec<IngestStage>,
}

impl Progress {
    fn new(location: String) -> Self {
        Self {
            location,
            stage: IngestStage::Parsed,
            handle: None,
            reached: Vec::new(),
        }
    }

    fn attempt(&mut self, stage: IngestStage) {
        self.stage = stage;
    }

    fn reach(&mut self) {
        tracing::debug!(location = %self.location, stage = %self.stage, "stage reached");
        self.reached.push(self.stage);
    }

    fn failure(&self, error: IngestError) -> IngestFailure {
        IngestFailure {
            stage: self.stage,
            location: self.location.clone(),
            handle: self.handle.clone(),
            error,
        }
    }
}

/// Descriptive section choice for a manifest.
struct DescriptiveChoice<'m> {
    selection: Selection,
    sections: Vec<&'m MetadataSection>,
    warning: Option<String>,
}

impl DescriptiveChoice<'_> {
    fn ids(&self, indices: &[usize]) -> Vec<String> {
        indices
            .iter()
            .map(|index| self.sections[*index].id.clone())
            .collect()
    }
}

/// Runs packages through the pipeline with one configuration and registry.
///
/// Holds no per-package state; one ingester can serve any number of ingests.
pub struct Ingester {
    config: IngestConfig,
    registry: CrosswalkRegistry,
}

impl Ingester {
    pub fn new(config: IngestConfig, registry: CrosswalkRegistry) -> Self {
        Self { config, registry }
    }

    /// Ingester whose registry is built from `config.crosswalks`.
    pub fn from_config(config: IngestConfig) -> anyhow::Result<Self> {
        let registry = build_registry(&config)?;
        Ok(Self::new(config, registry))
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Ingest `source` (and, for containers, its children) into `repo`.
    ///
    /// `parent` overrides the parent named by the package. The first child
    /// failure is returned as-is; children ingested before it stay committed.
    pub fn ingest(
        &self,
        repo: &mut dyn Repository,
        source: &PackageSource,
        parent: Option<ObjectId>,
        params: &PackageParameters,
    ) -> Result<IngestOutcome, IngestFailure> {
        let mut progress = Progress::new(source.location());
        let (mut outcome, children) = self
            .ingest_object(repo, source, parent, params, &mut progress)
            .map_err(|error| progress.failure(error))?;

        for child in &children {
            let child_source = source
                .child(child)
                .map_err(|error| progress.failure(error))?;
            tracing::info!(
                parent = %outcome.handle,
                child = %child_source.location(),
                "ingesting child package"
            );
            let child_outcome = self.ingest(repo, &child_source, Some(outcome.id), params)?;
            outcome.children.push(child_outcome);
        }
        Ok(outcome)
    }

    fn ingest_object(
        &self,
        repo: &mut dyn Repository,
        source: &PackageSource,
        explicit_parent: Option<ObjectId>,
        params: &PackageParameters,
        progress: &mut Progress,
    ) -> Result<(IngestOutcome, Vec<ChildRef>), IngestError> {
        let restore = params.restore_mode_enabled;
        let mut warnings = Vec::new();

        progress.attempt(IngestStage::Parsed);
        check_source_flavour(source, params)?;
        let manifest_bytes = source.read_manifest()?;
        let parsed = ParsedManifest::parse(&manifest_bytes)?;
        progress.handle = parsed.header.handle().map(str::to_string);
        progress.reach();

        progress.attempt(IngestStage::Validated);
        check_profile(&parsed.header)?;
        let manifest = parsed.into_manifest()?;
        progress.reach();

        progress.attempt(IngestStage::TypeResolved);
        let (object_type, family) = resolve_family(&manifest.header)?;
        let mut target = prepare_target(repo, &manifest, object_type, explicit_parent, restore)?;
        tracing::info!(
            location = %progress.location,
            object_type = %object_type,
            handle = progress.handle.as_deref().unwrap_or("-"),
            sections = manifest.sections.len(),
            files = manifest.files.len(),
            restore,
            "package validated"
        );
        progress.reach();

        progress.attempt(IngestStage::MetadataCrosswalked);
        let choice = choose_descriptive(&manifest, params, &progress.location)?;
        warnings.extend(choice.warning.clone());
        let invoker = CrosswalkInvoker::new(&self.registry);
        let mut crosswalked = Vec::new();
        for index in choice.selection.crosswalk_order() {
            let section = choice.sections[index];
            invoker.apply(&mut target, section, source)?;
            crosswalked.push(section.id.clone());
        }
        for section in manifest.object_wide_administrative() {
            invoker.apply(&mut target, section, source)?;
            crosswalked.push(section.id.clone());
        }
        tracing::debug!(
            crosswalked = crosswalked.len(),
            excluded = choice.selection.excluded.len(),
            values = target.metadata().len(),
            "metadata crosswalked"
        );
        progress.reach();

        let mut license_action = None;
        if family == ObjectFamily::Content {
            progress.attempt(IngestStage::ContentStaged);
            files::stage_files(&mut target, &manifest, source, restore)?;
            if self.config.preserve_manifest {
                files::preserve_manifest(&mut target, &manifest_bytes);
            }
            progress.reach();

            progress.attempt(IngestStage::LicenseReconciled);
            let action = license::reconcile(
                &mut target,
                &*repo,
                restore,
                params.manifest_only,
                self.config.default_license.as_deref(),
            )?;
            license_action = Some(action);
            progress.reach();
        }

        progress.attempt(IngestStage::Finalized);
        let created_fields = finish_object(&target, repo, params.create_metadata_fields)?;
        progress.reach();

        progress.attempt(IngestStage::Committed);
        let (id, handle) = commit::commit(&target, repo)?;
        progress.handle = Some(handle.clone());
        progress.reach();
        tracing::info!(
            location = %progress.location,
            object_type = %object_type,
            handle = %handle,
            replaced = target.existing.is_some(),
            "object committed"
        );

        let outcome = IngestOutcome {
            id,
            handle,
            object_type,
            location: progress.location.clone(),
            replaced: target.existing.is_some(),
            stages: progress.reached.clone(),
            selection_rule: choice.selection.rule,
            crosswalked_sections: crosswalked,
            excluded_sections: choice.ids(&choice.selection.excluded),
            license: license_action,
            attached_files: target
                .bitstreams()
                .iter()
                .map(|bitstream| format!("{}/{}", bitstream.bundle, bitstream.name))
                .collect(),
            created_fields,
            warnings,
            children: Vec::new(),
        };
        let children = match family {
            ObjectFamily::Container => manifest.division.children,
            ObjectFamily::Content => Vec::new(),
        };
        Ok((outcome, children))
    }

    /// Parse, validate and select sections without touching a repository.
    pub fn preview(
        &self,
        source: &PackageSource,
        params: &PackageParameters,
    ) -> Result<PackagePreview, IngestFailure> {
        let mut progress = Progress::new(source.location());
        self.preview_object(source, params, &mut progress)
            .map_err(|error| progress.failure(error))
    }

    fn preview_object(
        &self,
        source: &PackageSource,
        params: &PackageParameters,
        progress: &mut Progress,
    ) -> Result<PackagePreview, IngestError> {
        progress.attempt(IngestStage::Parsed);
        check_source_flavour(source, params)?;
        let parsed = ParsedManifest::parse(&source.read_manifest()?)?;
        progress.handle = parsed.header.handle().map(str::to_string);

        progress.attempt(IngestStage::Validated);
        check_profile(&parsed.header)?;
        let manifest = parsed.into_manifest()?;

        progress.attempt(IngestStage::TypeResolved);
        let (object_type, family) = resolve_family(&manifest.header)?;
        if let Some(handle) = manifest.handle() {
            check_handle(handle)?;
        }

        progress.attempt(IngestStage::MetadataCrosswalked);
        let choice = choose_descriptive(&manifest, params, &progress.location)?;
        let administrative = manifest.object_wide_administrative();
        let mut warnings: Vec<String> = choice.warning.clone().into_iter().collect();
        let selected = choice
            .selection
            .crosswalk_order()
            .into_iter()
            .map(|index| choice.sections[index]);
        for section in selected.chain(administrative.iter().copied()) {
            if self.registry.lookup(&section.type_label).is_none() {
                warnings.push(format!(
                    "no crosswalk configured for section {} of type {}",
                    section.id, section.type_label
                ));
            }
        }

        Ok(PackagePreview {
            location: progress.location.clone(),
            object_type,
            family,
            handle: manifest.handle().map(str::to_string),
            parent_handle: manifest.parent_handle.clone(),
            selection_rule: choice.selection.rule,
            primary_section: choice.sections[choice.selection.primary].id.clone(),
            supplementary_sections: choice.ids(&choice.selection.supplementary),
            excluded_sections: choice.ids(&choice.selection.excluded),
            administrative_sections: administrative
                .iter()
                .map(|section| section.id.clone())
                .collect(),
            files: match family {
                ObjectFamily::Content => manifest.object_files().len(),
                ObjectFamily::Container => 0,
            },
            children: match family {
                ObjectFamily::Container => manifest.division.children.clone(),
                ObjectFamily::Content => Vec::new(),
            },
            warnings,
        })
    }
}

/// `manifestOnly` must match how the source was opened.
fn check_source_flavour(
    source: &PackageSource,
    params: &PackageParameters,
) -> Result<(), IngestError> {
    let flavour = |manifest_only: bool| if manifest_only { "manifest-only" } else { "external" };
    if params.manifest_only != source.is_manifest_only() {
        return Err(IngestError::MalformedPackage(format!(
            "{}: package is {}, manifestOnly parameter is {}",
            source.location(),
            flavour(source.is_manifest_only()),
            params.manifest_only
        )));
    }
    Ok(())
}

fn choose_descriptive<'m>(
    manifest: &'m Manifest,
    params: &PackageParameters,
    location: &str,
) -> Result<DescriptiveChoice<'m>, IngestError> {
    let sections = manifest.object_wide_descriptive();
    let descriptors: Vec<SectionDescriptor<'_>> = sections
        .iter()
        .map(|section| SectionDescriptor {
            type_label: &section.type_label,
            group_id: section.group_id.as_deref(),
        })
        .collect();
    let selection = select_sections(&descriptors, params.forced_dmd()).ok_or_else(|| {
        IngestError::MissingDescriptiveMetadata(format!(
            "{location} has no object-wide dmdSec"
        ))
    })?;

    let warning = (selection.rule == PrimaryRule::FirstFallback).then(|| {
        let primary = sections[selection.primary];
        tracing::warn!(
            location,
            section = %primary.id,
            section_type = %primary.type_label,
            ignored = selection.excluded.len(),
            "no preferred descriptive section; using the first one only"
        );
        format!(
            "no DIM or MODS descriptive section; crosswalked only {} ({}) and ignored {} other section(s)",
            primary.id,
            primary.type_label,
            selection.excluded.len()
        )
    });
    Ok(DescriptiveChoice {
        selection,
        sections,
        warning,
    })
}

/// Resolve which object the package reconstitutes and where it attaches.
fn prepare_target(
    repo: &dyn Repository,
    manifest: &Manifest,
    object_type: ObjectType,
    explicit_parent: Option<ObjectId>,
    restore: bool,
) -> Result<TargetObject, IngestError> {
    let mut target = TargetObject::new(object_type);
    let mut existing_parent = None;

    if restore {
        let handle = manifest.handle().ok_or_else(|| {
            IngestError::malformed("restore mode needs a package with an OBJID handle")
        })?;
        check_handle(handle)?;
        if let Some(existing) = repo.find_by_handle(handle) {
            if existing.object_type != object_type {
                return Err(crate::error::RepositoryError::TypeMismatch {
                    handle: handle.to_string(),
                    existing: existing.object_type,
                    declared: object_type,
                }
                .into());
            }
            tracing::info!(handle, id = %existing.id, "replacing existing object");
            target.existing = Some(existing.id);
            target.existing_license = existing.license().cloned();
            existing_parent = existing.parent;
        }
        target.handle = Some(handle.to_string());
    }

    let parent = match (explicit_parent, manifest.parent_handle.as_deref()) {
        (Some(parent), _) => Some(parent),
        (None, Some(handle)) => Some(
            repo.find_by_handle(handle)
                .map(|parent| parent.id)
                .ok_or_else(|| {
                    IngestError::InvalidParent(format!("parent {handle} does not exist"))
                })?,
        ),
        (None, None) => existing_parent,
    };
    check_parent(repo, object_type, parent)?;
    target.parent = parent;
    Ok(target)
}

fn check_parent(
    repo: &dyn Repository,
    object_type: ObjectType,
    parent: Option<ObjectId>,
) -> Result<(), IngestError> {
    let allowed = object_type.allowed_parents();
    let Some(parent) = parent else {
        return match allowed.first() {
            Some(required) if object_type.requires_parent() => Err(IngestError::InvalidParent(
                format!("a {object_type} needs a {required} parent"),
            )),
            _ => Ok(()),
        };
    };
    let parent_object = repo
        .object(parent)
        .ok_or_else(|| IngestError::InvalidParent(format!("parent object {parent} does not exist")))?;
    if !allowed.contains(&parent_object.object_type) {
        return Err(IngestError::InvalidParent(format!(
            "a {object_type} cannot be placed under {} {}",
            parent_object.object_type, parent_object.handle
        )));
    }
    Ok(())
}
