//! CSV dataset files: reading, writing, appending, and merging
//!
//! A dataset is an ordered sequence of rows under a header; insertion order
//! is meaningful (it derives the `id` column). Rows are kept as raw
//! `StringRecord`s so that columns this crate does not know about survive
//! every pipeline stage verbatim.

use crate::error::{Result, TracksetError};
use crate::record::{Candidate, IMAGE_COLUMN, LABEL_COLUMN};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::Path;
use tracing::{debug, info, warn};

/// An in-memory CSV dataset: a header row plus ordered data rows
#[derive(Debug, Clone)]
pub struct Dataset {
    headers: StringRecord,
    rows: Vec<StringRecord>,
}

impl Dataset {
    /// Create an empty dataset with the given header
    pub fn with_headers<I, S>(headers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            headers: StringRecord::from_iter(headers),
            rows: Vec::new(),
        }
    }

    /// Read an entire CSV file into memory
    ///
    /// Rows with a field count different from the header are accepted; the
    /// missing fields read back as `None` through [`StringRecord::get`].
    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = ReaderBuilder::new()
            .flexible(true)
            .from_path(path)
            .map_err(|e| {
                TracksetError::invalid_record(format!("cannot open '{}': {}", path.display(), e))
            })?;

        let headers = reader.headers()?.clone();
        let mut rows = Vec::new();
        for record in reader.records() {
            rows.push(record?);
        }

        debug!(
            path = %path.display(),
            rows = rows.len(),
            "Loaded dataset"
        );
        Ok(Self { headers, rows })
    }

    /// Write the dataset to a new CSV file, header first
    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    TracksetError::file_io_error("create output directory", parent, e)
                })?;
            }
        }

        let mut writer = WriterBuilder::new().flexible(true).from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush()?;

        debug!(path = %path.display(), rows = self.rows.len(), "Wrote dataset");
        Ok(())
    }

    /// Header row
    pub fn headers(&self) -> &StringRecord {
        &self.headers
    }

    /// Data rows, in file order
    pub fn rows(&self) -> &[StringRecord] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a raw row
    pub fn push_row(&mut self, row: StringRecord) {
        self.rows.push(row);
    }

    /// Position of a named column, if present
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Position of a named column, or an error naming the missing column
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name).ok_or_else(|| {
            TracksetError::invalid_record(format!("dataset is missing the '{}' column", name))
        })
    }

    /// Return a copy of this dataset with an `id` column holding each row's
    /// zero-based position
    ///
    /// When the column already exists its values are rewritten in place;
    /// otherwise it is prepended, matching the acquisition-stage header
    /// ordering `id,animal,image_url`.
    pub fn with_assigned_ids(&self) -> Dataset {
        use crate::record::ID_COLUMN;

        if let Some(idx) = self.column_index(ID_COLUMN) {
            let mut out = Dataset::with_headers(self.headers.iter());
            for (position, row) in self.rows.iter().enumerate() {
                let fields: Vec<String> = row
                    .iter()
                    .enumerate()
                    .map(|(i, field)| {
                        if i == idx {
                            position.to_string()
                        } else {
                            field.to_string()
                        }
                    })
                    .collect();
                out.push_row(StringRecord::from_iter(fields));
            }
            return out;
        }

        let mut headers = vec![ID_COLUMN.to_string()];
        headers.extend(self.headers.iter().map(String::from));
        let mut out = Dataset::with_headers(headers);
        for (position, row) in self.rows.iter().enumerate() {
            let mut fields = vec![position.to_string()];
            fields.extend(row.iter().map(String::from));
            out.push_row(StringRecord::from_iter(fields));
        }
        out
    }
}

/// Load the set of image URLs already recorded in a destination CSV
///
/// A missing file yields an empty set; a file without the `image_url` column
/// is a configuration error.
pub fn load_seen_urls<P: AsRef<Path>>(path: P) -> Result<HashSet<String>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashSet::new());
    }

    let dataset = Dataset::read_from_path(path)?;
    let url_idx = dataset.require_column(IMAGE_COLUMN)?;

    let mut seen = HashSet::new();
    for row in dataset.rows() {
        if let Some(url) = row.get(url_idx) {
            if !url.is_empty() {
                seen.insert(url.to_string());
            }
        }
    }

    debug!(path = %path.display(), urls = seen.len(), "Loaded seen-set");
    Ok(seen)
}

/// Append `(label, url)` candidates to a destination CSV
///
/// The file is created with the `animal,image_url` header when absent and
/// otherwise appended to; existing rows are never rewritten.
pub fn append_candidates<P: AsRef<Path>>(path: P, candidates: &[Candidate]) -> Result<usize> {
    let path = path.as_ref();
    if candidates.is_empty() {
        return Ok(0);
    }

    let file_exists = path.exists();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| TracksetError::file_io_error("open destination file", path, e))?;

    let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
    if !file_exists {
        writer.write_record([LABEL_COLUMN, IMAGE_COLUMN])?;
    }
    for candidate in candidates {
        writer.write_record([candidate.label.as_str(), candidate.url.as_str()])?;
    }
    writer.flush()?;

    info!(
        path = %path.display(),
        rows = candidates.len(),
        "Appended candidate rows"
    );
    Ok(candidates.len())
}

/// Parse a flat-directory filename of the shape `<page>_<n>_<label>.jpg`
///
/// Returns the label portion, or `None` when the name does not match.
pub fn parse_flat_filename(name: &str) -> Option<String> {
    let stem = name.strip_suffix(".jpg")?;
    let mut parts = stem.splitn(3, '_');
    let page = parts.next()?;
    let index = parts.next()?;
    let label = parts.next()?;

    if page.is_empty() || index.is_empty() || label.is_empty() {
        return None;
    }
    if !page.bytes().all(|b| b.is_ascii_digit()) || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(label.to_string())
}

/// Inputs for [`merge_sources`]
#[derive(Debug, Default)]
pub struct MergeInputs<'a> {
    /// A label-partitioned directory tree: `<root>/<label>/<image>`
    pub label_tree: Option<&'a Path>,
    /// A flat directory of `<page>_<n>_<label>.jpg` files
    pub flat_dir: Option<&'a Path>,
    /// An existing CSV with `animal` and `image_url` columns
    pub csv: Option<&'a Path>,
}

/// Combine records from up to three source shapes into one `animal,image_url`
/// dataset, dropping exact duplicate pairs while preserving first-seen order
pub fn merge_sources(inputs: &MergeInputs<'_>) -> Result<Dataset> {
    let mut out = Dataset::with_headers([LABEL_COLUMN, IMAGE_COLUMN]);
    let mut seen: HashSet<(String, String)> = HashSet::new();

    let mut add = |label: String, reference: String, out: &mut Dataset| {
        let key = (label.clone(), reference.clone());
        if seen.insert(key) {
            out.push_row(StringRecord::from_iter([label, reference]));
        }
    };

    if let Some(root) = inputs.label_tree {
        let mut label_dirs: Vec<_> = std::fs::read_dir(root)
            .map_err(|e| TracksetError::file_io_error("read label tree", root, e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .collect();
        label_dirs.sort_by_key(std::fs::DirEntry::file_name);

        for dir in label_dirs {
            let label = dir.file_name().to_string_lossy().to_string();
            let mut images: Vec<_> = std::fs::read_dir(dir.path())
                .map_err(|e| TracksetError::file_io_error("read label directory", dir.path(), e))?
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| path.is_file())
                .collect();
            images.sort();

            for image in images {
                add(label.clone(), image.to_string_lossy().to_string(), &mut out);
            }
        }
    }

    if let Some(dir) = inputs.flat_dir {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .map_err(|e| TracksetError::file_io_error("read flat directory", dir, e))?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for file in files {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            match parse_flat_filename(&name) {
                Some(label) => add(label, file.to_string_lossy().to_string(), &mut out),
                None => warn!(file = %file.display(), "Skipping unrecognized filename"),
            }
        }
    }

    if let Some(path) = inputs.csv {
        let dataset = Dataset::read_from_path(path)?;
        let label_idx = dataset.require_column(LABEL_COLUMN)?;
        let url_idx = dataset.require_column(IMAGE_COLUMN)?;

        for row in dataset.rows() {
            match (row.get(label_idx), row.get(url_idx)) {
                (Some(label), Some(url)) if !url.is_empty() => {
                    add(label.to_string(), url.to_string(), &mut out);
                },
                _ => warn!("Skipping CSV row with missing fields"),
            }
        }
    }

    info!(rows = out.len(), "Merged dataset sources");
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assign_ids_prepends_column() {
        let mut dataset = Dataset::with_headers(["animal", "image_url"]);
        dataset.push_row(StringRecord::from_iter(["lynx", "u1"]));
        dataset.push_row(StringRecord::from_iter(["fox", "u2"]));

        let with_ids = dataset.with_assigned_ids();
        assert_eq!(with_ids.headers(), &StringRecord::from_iter(["id", "animal", "image_url"]));
        assert_eq!(with_ids.rows()[0].get(0), Some("0"));
        assert_eq!(with_ids.rows()[1].get(0), Some("1"));
        assert_eq!(with_ids.rows()[1].get(1), Some("fox"));
    }

    #[test]
    fn test_assign_ids_rewrites_existing_column() {
        let mut dataset = Dataset::with_headers(["id", "animal"]);
        dataset.push_row(StringRecord::from_iter(["99", "lynx"]));
        dataset.push_row(StringRecord::from_iter(["3", "fox"]));

        let with_ids = dataset.with_assigned_ids();
        assert_eq!(with_ids.headers().len(), 2);
        assert_eq!(with_ids.rows()[0].get(0), Some("0"));
        assert_eq!(with_ids.rows()[1].get(0), Some("1"));
    }

    #[test]
    fn test_parse_flat_filename() {
        assert_eq!(parse_flat_filename("2_14_red_fox.jpg"), Some("red_fox".to_string()));
        assert_eq!(parse_flat_filename("1_1_lynx.jpg"), Some("lynx".to_string()));
        assert_eq!(parse_flat_filename("notes.txt"), None);
        assert_eq!(parse_flat_filename("a_b_lynx.jpg"), None);
        assert_eq!(parse_flat_filename("1_lynx.jpg"), None);
    }

    #[test]
    fn test_round_trip_preserves_unknown_columns() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracks.csv");

        let mut dataset = Dataset::with_headers(["animal", "image_url", "preview_url"]);
        dataset.push_row(StringRecord::from_iter(["lynx", "u1", "p1"]));
        dataset.push_row(StringRecord::from_iter(["fox", "u2", "p2"]));
        dataset.write_to_path(&path).expect("write");

        let read_back = Dataset::read_from_path(&path).expect("read");
        assert_eq!(read_back.headers(), dataset.headers());
        assert_eq!(read_back.rows(), dataset.rows());
    }

    #[test]
    fn test_seen_urls_missing_file_is_empty() {
        let dir = tempfile::tempdir().expect("tempdir");
        let seen = load_seen_urls(dir.path().join("absent.csv")).expect("seen");
        assert!(seen.is_empty());
    }

    #[test]
    fn test_merge_sources_combines_three_shapes() {
        let dir = tempfile::tempdir().expect("tempdir");

        // Label tree: <root>/<label>/<image>
        let tree = dir.path().join("tree");
        std::fs::create_dir_all(tree.join("fox")).expect("mkdir");
        std::fs::create_dir_all(tree.join("lynx")).expect("mkdir");
        std::fs::write(tree.join("fox").join("b.jpg"), b"x").expect("write");
        std::fs::write(tree.join("lynx").join("a.jpg"), b"x").expect("write");
        let lynx_path = tree.join("lynx").join("a.jpg");

        // Flat dir of <page>_<n>_<label>.jpg files, plus one stray.
        let flat = dir.path().join("flat");
        std::fs::create_dir_all(&flat).expect("mkdir");
        std::fs::write(flat.join("1_1_moose.jpg"), b"x").expect("write");
        std::fs::write(flat.join("notes.txt"), b"x").expect("write");

        // CSV whose first row duplicates a label-tree entry exactly.
        let csv_path = dir.path().join("extra.csv");
        let mut extra = Dataset::with_headers([LABEL_COLUMN, IMAGE_COLUMN]);
        extra.push_row(StringRecord::from_iter([
            "lynx".to_string(),
            lynx_path.to_string_lossy().to_string(),
        ]));
        extra.push_row(StringRecord::from_iter(["wolf", "https://x.test/w.jpg"]));
        extra.write_to_path(&csv_path).expect("write csv");

        let merged = merge_sources(&MergeInputs {
            label_tree: Some(&tree),
            flat_dir: Some(&flat),
            csv: Some(&csv_path),
        })
        .expect("merge");

        // The duplicate (lynx, path) pair appears once, at its first-seen
        // position; shape order is tree, then flat, then CSV.
        assert_eq!(merged.len(), 4);
        assert_eq!(merged.headers(), &StringRecord::from_iter(["animal", "image_url"]));
        assert_eq!(merged.rows()[0].get(0), Some("fox"));
        assert_eq!(merged.rows()[1].get(0), Some("lynx"));
        assert_eq!(
            merged.rows()[1].get(1),
            Some(lynx_path.to_string_lossy().as_ref())
        );
        assert_eq!(merged.rows()[2].get(0), Some("moose"));
        assert_eq!(merged.rows()[3].get(0), Some("wolf"));
        assert_eq!(merged.rows()[3].get(1), Some("https://x.test/w.jpg"));
    }

    #[test]
    fn test_append_creates_header_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tracks.csv");

        append_candidates(&path, &[Candidate::new("lynx", "u1")]).expect("first append");
        append_candidates(&path, &[Candidate::new("fox", "u2")]).expect("second append");

        let dataset = Dataset::read_from_path(&path).expect("read");
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.rows()[0].get(0), Some("lynx"));
        assert_eq!(dataset.rows()[1].get(1), Some("u2"));
    }
}
