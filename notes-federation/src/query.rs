use crate::types::{FederatedNote, SourceSummary};
use std::collections::{BTreeSet, HashMap};

/// Notes published by the source named `source_name`; `None` keeps everything.
pub fn filter_by_source(notes: &[FederatedNote], source_name: Option<&str>) -> Vec<FederatedNote> {
    match source_name {
        Some(name) => notes.iter().filter(|n| n.source.name == name).cloned().collect(),
        None => notes.to_vec(),
    }
}

/// Notes carrying `tag`; `None` keeps everything.
pub fn filter_by_tag(notes: &[FederatedNote], tag: Option<&str>) -> Vec<FederatedNote> {
    match tag {
        Some(tag) => notes
            .iter()
            .filter(|n| n.note.tags.iter().any(|t| t == tag))
            .cloned()
            .collect(),
        None => notes.to_vec(),
    }
}

/// One summary per distinct `metadata_url`, in order of first appearance.
pub fn unique_sources(notes: &[FederatedNote]) -> Vec<SourceSummary> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut summaries: Vec<SourceSummary> = Vec::new();

    for note in notes {
        match index.get(note.source.metadata_url.as_str()) {
            Some(&i) => summaries[i].count += 1,
            None => {
                index.insert(&note.source.metadata_url, summaries.len());
                summaries.push(SourceSummary {
                    name: note.source.name.clone(),
                    avatar: note.source.avatar.clone(),
                    metadata_url: note.source.metadata_url.clone(),
                    count: 1,
                });
            }
        }
    }

    summaries
}

/// Every distinct tag across `notes`, sorted.
pub fn unique_tags(notes: &[FederatedNote]) -> Vec<String> {
    notes
        .iter()
        .flat_map(|n| n.note.tags.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}
