//! Integrity check of a written bundle (directory or ZIP container).

use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, Read};
use std::path::Path;

#[cfg(feature = "colorized_output")]
use console::style;
use zip::ZipArchive;

use super::manifest::{sha256_hex, ExportManifest};
use super::{ExportError, BUNDLE_MIMETYPE, MANIFEST_FILE, MIMETYPE_FILE};

/// Outcome of one bundle check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Nothing to report
    Pass,
    /// Readable but not what an untouched bundle holds
    Warn(String),
    /// Integrity is broken
    Fail(String),
}

impl Verdict {
    fn tag(&self) -> &'static str {
        match self {
            Verdict::Pass => "pass",
            Verdict::Warn(_) => "warn",
            Verdict::Fail(_) => "FAIL",
        }
    }

    fn detail(&self) -> Option<&str> {
        match self {
            Verdict::Pass => None,
            Verdict::Warn(detail) | Verdict::Fail(detail) => Some(detail),
        }
    }
}

/// A single check against a bundle entry or property
#[derive(Debug, Clone)]
pub struct BundleCheck {
    /// What was checked
    pub subject: String,
    /// Result of the check
    pub verdict: Verdict,
}

/// Every check run against one bundle, in execution order
#[derive(Debug)]
pub struct BundleVerification {
    /// Bundle path as given
    pub bundle_path: String,
    /// Check results
    pub checks: Vec<BundleCheck>,
    /// Parsed manifest, when readable
    pub manifest: Option<ExportManifest>,
}

impl BundleVerification {
    fn new(bundle_path: impl Into<String>) -> Self {
        Self {
            bundle_path: bundle_path.into(),
            checks: Vec::new(),
            manifest: None,
        }
    }

    fn pass(&mut self, subject: impl Into<String>) {
        self.record(subject, Verdict::Pass);
    }

    fn warn(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(subject, Verdict::Warn(detail.into()));
    }

    fn fail(&mut self, subject: impl Into<String>, detail: impl Into<String>) {
        self.record(subject, Verdict::Fail(detail.into()));
    }

    fn record(&mut self, subject: impl Into<String>, verdict: Verdict) {
        self.checks.push(BundleCheck {
            subject: subject.into(),
            verdict,
        });
    }

    /// Failed checks
    pub fn failures(&self) -> impl Iterator<Item = &BundleCheck> {
        self.checks.iter().filter(|c| matches!(c.verdict, Verdict::Fail(_)))
    }

    /// Checks that passed with a warning
    pub fn warnings(&self) -> impl Iterator<Item = &BundleCheck> {
        self.checks.iter().filter(|c| matches!(c.verdict, Verdict::Warn(_)))
    }

    /// Whether any check failed
    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }

    /// Whether any check warned
    pub fn has_warnings(&self) -> bool {
        self.warnings().next().is_some()
    }

    fn conclusion(&self) -> &'static str {
        if self.has_failures() {
            "Bundle integrity BROKEN"
        } else if self.has_warnings() {
            "Bundle intact, with extra entries"
        } else {
            "Bundle intact"
        }
    }

    /// One line per check, then a tally and the conclusion. `paint` styles
    /// the tag column and the conclusion by verdict.
    fn render(&self, paint: impl Fn(&str, &Verdict) -> String) -> String {
        let mut out = format!("Verifying {}\n", self.bundle_path);
        for check in &self.checks {
            let tag = paint(&format!("{:>4}", check.verdict.tag()), &check.verdict);
            match check.verdict.detail() {
                Some(detail) => out.push_str(&format!("  {}  {}: {}\n", tag, check.subject, detail)),
                None => out.push_str(&format!("  {}  {}\n", tag, check.subject)),
            }
        }
        out.push_str(&format!(
            "{} check(s), {} failed, {} with warnings\n",
            self.checks.len(),
            self.failures().count(),
            self.warnings().count()
        ));
        let overall = if self.has_failures() {
            Verdict::Fail(String::new())
        } else if self.has_warnings() {
            Verdict::Warn(String::new())
        } else {
            Verdict::Pass
        };
        out.push_str(&paint(self.conclusion(), &overall));
        out.push('\n');
        out
    }

    /// Render with terminal colors when the `colorized_output` feature is on
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            self.render(|text, verdict| match verdict {
                Verdict::Pass => style(text).green().to_string(),
                Verdict::Warn(_) => style(text).yellow().to_string(),
                Verdict::Fail(_) => style(text).red().bold().to_string(),
            })
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            self.to_string()
        }
    }
}

impl fmt::Display for BundleVerification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(|text, _| text.to_string()))
    }
}

/// Read access to the entries of a bundle
trait BundleSource {
    /// Entry names, excluding directories
    fn names(&self) -> Vec<String>;

    /// Entry contents; `None` when absent
    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExportError>;
}

struct DirectorySource<'a> {
    root: &'a Path,
}

impl BundleSource for DirectorySource<'_> {
    fn names(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(self.root) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExportError> {
        let path = self.root.join(name);
        if !path.is_file() {
            return Ok(None);
        }
        Ok(Some(fs::read(path)?))
    }
}

struct ZipSource {
    archive: ZipArchive<BufReader<File>>,
}

impl BundleSource for ZipSource {
    fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .archive
            .file_names()
            .filter(|n| !n.ends_with('/'))
            .map(String::from)
            .collect();
        names.sort();
        names
    }

    fn read(&mut self, name: &str) -> Result<Option<Vec<u8>>, ExportError> {
        let mut entry = match self.archive.by_name(name) {
            Ok(entry) => entry,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut bytes = Vec::new();
        entry.read_to_end(&mut bytes)?;
        Ok(Some(bytes))
    }
}

fn is_zip_file(path: &Path) -> bool {
    File::open(path).is_ok_and(|file| ZipArchive::new(file).is_ok())
}

/// Whether a manifest artifact name stays inside the bundle root.
///
/// Artifacts are written flat; a name with a separator or drive prefix did
/// not come from this exporter.
fn is_bundle_local(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', ':'])
        && Path::new(name).is_relative()
}

/// `mimetype` must be the first entry, stored, holding the bundle type
fn check_container(
    archive: &mut ZipArchive<BufReader<File>>,
    report: &mut BundleVerification,
) -> Result<(), ExportError> {
    if archive.len() == 0 {
        report.fail("container", "archive has no entries");
        return Ok(());
    }

    {
        let first = archive.by_index(0)?;
        if first.name() == MIMETYPE_FILE {
            report.pass("mimetype leads the archive");
        } else {
            report.fail(
                "mimetype position",
                format!("first entry is '{}'", first.name()),
            );
        }
        if first.compression() == zip::CompressionMethod::Stored {
            report.pass("first entry is stored");
        } else {
            report.fail("first entry compression", "expected Stored");
        }
    }

    let content = match archive.by_name(MIMETYPE_FILE) {
        Ok(mut entry) => {
            let mut content = String::new();
            entry.read_to_string(&mut content)?;
            content
        }
        Err(_) => {
            report.fail("mimetype", "entry is absent");
            return Ok(());
        }
    };
    if content == BUNDLE_MIMETYPE {
        report.pass(format!("mimetype is {}", BUNDLE_MIMETYPE));
    } else {
        report.fail(
            "mimetype",
            format!("expected '{}', read '{}'", BUNDLE_MIMETYPE, content),
        );
    }
    Ok(())
}

/// Parse the manifest, re-hash what it lists and flag anything it does not
fn check_contents(
    source: &mut dyn BundleSource,
    report: &mut BundleVerification,
) -> Result<(), ExportError> {
    let Some(raw) = source.read(MANIFEST_FILE)? else {
        report.fail(MANIFEST_FILE, "not present in bundle");
        return Ok(());
    };
    let manifest: ExportManifest = match serde_json::from_slice(&raw) {
        Ok(manifest) => manifest,
        Err(e) => {
            report.fail(MANIFEST_FILE, format!("unreadable: {}", e));
            return Ok(());
        }
    };
    report.pass(format!(
        "{} parsed (model {}, ruleset {})",
        MANIFEST_FILE, manifest.schema_version, manifest.ruleset_version
    ));

    match manifest.blockers {
        0 => report.pass("export recorded no blockers"),
        n => report.fail("blockers", format!("manifest records {}", n)),
    }

    for (name, expected) in &manifest.artifact_hashes {
        if !is_bundle_local(name) {
            report.fail(
                name.as_str(),
                "artifact name points outside the bundle; not read",
            );
            continue;
        }
        match source.read(name)? {
            Some(bytes) => {
                let actual = sha256_hex(&bytes);
                if &actual == expected {
                    report.pass(format!("{} hash", name));
                } else {
                    report.fail(
                        format!("{} hash", name),
                        format!("manifest {}, content {}", expected, actual),
                    );
                }
            }
            None => report.fail(name.as_str(), "listed in manifest but absent"),
        }
    }

    let listed: BTreeSet<&str> = manifest.artifact_hashes.keys().map(String::as_str).collect();
    for name in source.names() {
        if name != MANIFEST_FILE && name != MIMETYPE_FILE && !listed.contains(name.as_str()) {
            report.warn(name, "present but not in manifest");
        }
    }

    if manifest.digest_matches() {
        report.pass("bundle digest");
    } else {
        report.fail(
            "bundle digest",
            format!("{} does not cover the listed hashes", manifest.bundle_digest),
        );
    }

    report.manifest = Some(manifest);
    Ok(())
}

/// Re-hash every artifact of a directory or ZIP bundle.
///
/// Integrity problems are reported as failed checks; only I/O problems that
/// prevent reading the bundle at all are returned as errors.
pub fn verify_bundle<P: AsRef<Path>>(path: P) -> Result<BundleVerification, ExportError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ExportError::NotFound(path.display().to_string()));
    }
    let mut report = BundleVerification::new(path.display().to_string());

    if path.is_dir() {
        report.pass("directory bundle");
        check_contents(&mut DirectorySource { root: path }, &mut report)?;
    } else if is_zip_file(path) {
        report.pass("ZIP bundle");
        let mut archive = ZipArchive::new(BufReader::new(File::open(path)?))?;
        check_container(&mut archive, &mut report)?;
        check_contents(&mut ZipSource { archive }, &mut report)?;
    } else {
        report.fail("bundle type", "neither a directory nor a ZIP archive");
    }

    Ok(report)
}
