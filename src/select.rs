//! Choice of the descriptive metadata section(s) to crosswalk onto an object.
//!
//! Selection is a pure function over the ordered `(type, group)` descriptors
//! of the object-wide sections:
//! 1. the forced type from the `dmd` parameter,
//! 2. else the preferred format ([`PREFERRED_FORMAT`]),
//! 3. else the secondary format ([`SECONDARY_FORMAT`]),
//! 4. else the first section alone.
//!
//! For rules 1-3, sections sharing the primary's group id are alternate
//! encodings of the same statement and are excluded; every other section is
//! crosswalked after the primary, in document order.
use serde::Serialize;

pub const PREFERRED_FORMAT: &str = "DIM";
pub const SECONDARY_FORMAT: &str = "MODS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionDescriptor<'a> {
    pub type_label: &'a str,
    pub group_id: Option<&'a str>,
}

/// Which precedence rule picked the primary section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryRule {
    Forced,
    Preferred,
    Secondary,
    FirstFallback,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub primary: usize,
    pub rule: PrimaryRule,
    pub supplementary: Vec<usize>,
    pub excluded: Vec<usize>,
}

impl Selection {
    /// Indices to crosswalk: the primary first, then supplementary sections.
    pub fn crosswalk_order(&self) -> Vec<usize> {
        std::iter::once(self.primary)
            .chain(self.supplementary.iter().copied())
            .collect()
    }
}

/// `None` when there is nothing to select from.
pub fn select_sections(
    sections: &[SectionDescriptor<'_>],
    forced: Option<&str>,
) -> Option<Selection> {
    if sections.is_empty() {
        return None;
    }

    let forced = forced.map(str::trim).filter(|value| !value.is_empty());
    let matched = forced
        .and_then(|label| first_of_type(sections, label).map(|index| (index, PrimaryRule::Forced)))
        .or_else(|| {
            first_of_type(sections, PREFERRED_FORMAT).map(|index| (index, PrimaryRule::Preferred))
        })
        .or_else(|| {
            first_of_type(sections, SECONDARY_FORMAT).map(|index| (index, PrimaryRule::Secondary))
        });

    let Some((primary, rule)) = matched else {
        // Every crosswalk appends fields, so the fallback never adds a second section.
        return Some(Selection {
            primary: 0,
            rule: PrimaryRule::FirstFallback,
            supplementary: Vec::new(),
            excluded: (1..sections.len()).collect(),
        });
    };

    let primary_group = sections[primary].group_id;
    let mut supplementary = Vec::new();
    let mut excluded = Vec::new();
    for (index, section) in sections.iter().enumerate() {
        if index == primary {
            continue;
        }
        if primary_group.is_some() && section.group_id == primary_group {
            excluded.push(index);
        } else {
            supplementary.push(index);
        }
    }
    Some(Selection {
        primary,
        rule,
        supplementary,
        excluded,
    })
}

fn first_of_type(sections: &[SectionDescriptor<'_>], label: &str) -> Option<usize> {
    sections
        .iter()
        .position(|section| section.type_label.eq_ignore_ascii_case(label))
}
