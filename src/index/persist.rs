use std::collections::BTreeMap;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};
use crate::index::postings::{Posting, Postings};
use crate::index::{Bm25Params, InvertedFile};
use crate::text::ConfigFingerprint;
use crate::vectorizer::vocabulary::{TokenStats, Vocabulary};
use crate::vectorizer::weighting::{GlobalWeighting, LocalWeighting};
use crate::vectorizer::VectorModel;

const FORMAT: &str = "text-search/inverted-file";
const VERSION: u32 = 1;

/// File layout: every saved index lives under a group name
#[derive(Debug, Serialize, Deserialize)]
struct Container {
    format: String,
    version: u32,
    groups: BTreeMap<String, IndexRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexRecord {
    params: Bm25Params,
    doc_lens: Vec<f32>,
    /// non-empty postings lists, ascending token ids
    postings: Vec<PostingsRecord>,
    model: Option<ModelRecord>,
}

#[derive(Debug, Serialize, Deserialize)]
struct PostingsRecord {
    token: u32,
    doc_ids: Vec<u32>,
    weights: Vec<f32>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelRecord {
    global: GlobalWeighting,
    local: LocalWeighting,
    mindocs: u64,
    fingerprint: ConfigFingerprint,
    corpus_size: u64,
    /// token and statistics of id `i`
    tokens: Vec<(Box<str>, TokenStats)>,
    weights: Vec<f32>,
}

/// "/", "", "//" -> "/" ; "a/b/" -> "/a/b"
fn normalize_group(group: &str) -> String {
    let trimmed = group.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn cbor_error(e: serde_cbor::Error) -> Error {
    if e.is_io() {
        Error::IoFailure(io::Error::other(e))
    } else {
        Error::corrupt(e.to_string())
    }
}

fn read_container(path: &Path) -> Result<Container> {
    let bytes = fs::read(path)?;
    let container: Container = serde_cbor::from_slice(&bytes).map_err(cbor_error)?;
    if container.format != FORMAT {
        return Err(Error::corrupt(format!("unknown format {:?}", container.format)));
    }
    if container.version != VERSION {
        return Err(Error::corrupt(format!(
            "unsupported version {}, expected {VERSION}",
            container.version
        )));
    }
    Ok(container)
}

impl InvertedFile {
    /// Save the index under `group` in the file at `path`
    ///
    /// Other groups of an existing file are kept; a previous index stored
    /// under the same group is replaced. The file is written to a temporary
    /// file in the same directory and renamed over `path`, so readers never
    /// see a half written file.
    ///
    /// # Arguments
    /// * `path` - container file
    /// * `group` - group name, `"/"` for the root
    pub fn save<P: AsRef<Path>>(&self, path: P, group: &str) -> Result<()> {
        let path = path.as_ref();
        let group = normalize_group(group);
        let mut container = if path.exists() {
            read_container(path)?
        } else {
            Container {
                format: FORMAT.to_string(),
                version: VERSION,
                groups: BTreeMap::new(),
            }
        };
        container.groups.insert(group.clone(), self.to_record());

        let dir = match path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let tmp = NamedTempFile::new_in(dir)?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_cbor::to_writer(&mut writer, &container).map_err(cbor_error)?;
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;
        tmp.persist(path).map_err(|e| Error::IoFailure(e.error))?;

        log::info!(
            "saved inverted file {:?} group {}: {} documents, {} postings",
            path,
            group,
            self.len(),
            self.n_postings()
        );
        Ok(())
    }

    /// Load the index stored under `group`
    ///
    /// With `static_graph` the index is returned frozen (read only), else it
    /// accepts appends.
    pub fn load<P: AsRef<Path>>(path: P, group: &str, static_graph: bool) -> Result<InvertedFile> {
        let path = path.as_ref();
        let group = normalize_group(group);
        let mut container = read_container(path)?;
        let record = container
            .groups
            .remove(&group)
            .ok_or_else(|| Error::invalid(format!("no group {group} in {}", path.display())))?;

        let mut index = InvertedFile::from_record(record)?;
        if static_graph {
            index.freeze();
        }
        log::info!(
            "loaded inverted file {:?} group {}: {} documents{}",
            path,
            group,
            index.len(),
            if static_graph { " (static)" } else { "" }
        );
        Ok(index)
    }

    fn to_record(&self) -> IndexRecord {
        let postings = self
            .tokens()
            .into_iter()
            .map(|t| {
                let list = self.postings(t);
                let mut rec = PostingsRecord {
                    token: t,
                    doc_ids: Vec::with_capacity(list.len()),
                    weights: Vec::with_capacity(list.len()),
                };
                for p in list.iter() {
                    rec.doc_ids.push(p.doc_id);
                    rec.weights.push(p.weight);
                }
                rec
            })
            .collect();
        let model = self.model().map(|m| {
            let (fingerprint, corpus_size, tokens) = m.vocabulary().clone().into_parts();
            ModelRecord {
                global: m.global(),
                local: m.local(),
                mindocs: m.mindocs(),
                fingerprint,
                corpus_size,
                tokens,
                weights: m.weights().to_vec(),
            }
        });
        IndexRecord {
            params: self.params(),
            doc_lens: self.doc_lens().to_vec(),
            postings,
            model,
        }
    }

    fn from_record(record: IndexRecord) -> Result<InvertedFile> {
        record.params.validate().map_err(|e| Error::corrupt(e.to_string()))?;

        let n_docs = record.doc_lens.len();
        if let Some(i) = record.doc_lens.iter().position(|l| !l.is_finite() || *l < 0.0) {
            return Err(Error::corrupt(format!("invalid length for document {i}")));
        }

        let model = match record.model {
            Some(m) => {
                let voc = Vocabulary::from_parts(m.fingerprint, m.corpus_size, m.tokens)?;
                Some(VectorModel::from_parts(m.global, m.local, voc, m.weights, m.mindocs)?)
            }
            None => None,
        };
        let token_limit = model.as_ref().map(|m| m.len() as u64).unwrap_or(u32::MAX as u64 + 1);
        if record.postings.windows(2).any(|w| w[0].token >= w[1].token) {
            return Err(Error::corrupt("postings lists are not sorted by token id"));
        }

        let mut lists: Vec<(u32, Vec<Posting>)> = Vec::with_capacity(record.postings.len());
        for rec in record.postings {
            let t = rec.token;
            if t as u64 >= token_limit {
                return Err(Error::corrupt(format!("token {t} is outside the model vocabulary")));
            }
            if rec.doc_ids.len() != rec.weights.len() {
                return Err(Error::corrupt(format!("token {t}: doc ids and weights differ in length")));
            }
            if rec.doc_ids.windows(2).any(|w| w[0] >= w[1]) {
                return Err(Error::corrupt(format!("token {t}: doc ids are not strictly increasing")));
            }
            if rec.doc_ids.last().is_some_and(|&d| d as usize >= n_docs) {
                return Err(Error::corrupt(format!("token {t}: doc id out of range")));
            }
            if rec.weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(Error::corrupt(format!("token {t}: invalid weight")));
            }
            lists.push((
                t,
                rec.doc_ids
                    .into_iter()
                    .zip(rec.weights)
                    .map(|(doc_id, weight)| Posting { doc_id, weight })
                    .collect(),
            ));
        }

        Ok(InvertedFile::from_parts(
            Postings::from_lists(lists),
            record.doc_lens,
            record.params,
            model,
        ))
    }
}
