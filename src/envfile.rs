//! Tag edits on environment documents (`areas/<env>.yaml`).
//!
//! The document is parsed only to validate its shape and read the current
//! tag. The edit itself replaces the tag token in the original text so that
//! comments, indentation, key order and other services stay byte-identical.
//! If the token cannot be located textually the edit fails; the parsed
//! document is never serialized back.
use crate::error::{DeployError, DeployResult, ShapeError};
use regex::Regex;
use serde_yaml::Value;
use std::fs;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const AREAS_DIR: &str = "areas";
pub const TARGET_MODULE: &str = "hot";
pub const TARGET_SERVICE: &str = "hot-api-mono";
const MISSING_TAG: &str = "unknown";

/// `- name: hot-api-mono` followed, past blank lines, by an indented
/// `tag: <token>` line.
const SERVICE_TAG_PATTERN: &str = r#"(?m)^[ \t]*-[ \t]+name:[ \t]*["']?hot-api-mono["']?[ \t]*(?:#[^\n]*)?\r?\n(?:[ \t]*\r?\n)*[ \t]+tag:[ \t]+(?P<token>[^\s]+)"#;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagUpdate {
    pub changed: bool,
    pub old_tag: String,
}

/// Edits environment documents inside one working copy.
#[derive(Debug, Clone)]
pub struct EnvironmentEditor {
    root: PathBuf,
}

impl EnvironmentEditor {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path of the document for `env_name`.
    pub fn env_file(&self, env_name: &str) -> DeployResult<PathBuf> {
        validate_env_name(env_name)?;
        Ok(self.root.join(AREAS_DIR).join(format!("{env_name}.yaml")))
    }

    /// Current tag of the target service.
    pub fn current_tag(&self, env_name: &str) -> DeployResult<String> {
        let path = self.existing_env_file(env_name)?;
        let text = read_text(&path)?;
        let document = parse_document(&text, &path)?;
        Ok(current_tag(&document, &path)?)
    }

    /// Point the target service at `new_tag`.
    ///
    /// Returns `changed == false` without touching the file when the tag is
    /// already current.
    pub fn update_tag(&self, env_name: &str, new_tag: &str) -> DeployResult<TagUpdate> {
        let path = self.existing_env_file(env_name)?;
        let text = read_text(&path)?;
        let document = parse_document(&text, &path)?;
        let old_tag = current_tag(&document, &path)?;

        if old_tag == new_tag {
            tracing::info!(env = env_name, tag = new_tag, "tag is already up to date");
            return Ok(TagUpdate {
                changed: false,
                old_tag,
            });
        }

        let patched = patch_document(&text, &document, new_tag)
            .ok_or_else(|| DeployError::TagNotLocated(path.clone()))?;
        write_replacing(&path, &patched)?;
        tracing::info!(
            env = env_name,
            old_tag = %old_tag,
            new_tag,
            path = %path.display(),
            "updated environment tag"
        );
        Ok(TagUpdate {
            changed: true,
            old_tag,
        })
    }

    fn existing_env_file(&self, env_name: &str) -> DeployResult<PathBuf> {
        let path = self.env_file(env_name)?;
        if !path.is_file() {
            return Err(DeployError::EnvFileNotFound(path));
        }
        Ok(path)
    }
}

fn validate_env_name(env_name: &str) -> DeployResult<()> {
    let invalid = env_name.trim().is_empty()
        || env_name == "."
        || env_name == ".."
        || env_name.contains(['/', '\\', '\0']);
    if invalid {
        return Err(DeployError::InvalidEnvironment(env_name.to_string()));
    }
    Ok(())
}

fn read_text(path: &Path) -> DeployResult<String> {
    fs::read_to_string(path).map_err(|source| DeployError::Io {
        action: "read",
        path: path.to_path_buf(),
        source,
    })
}

fn parse_document(text: &str, path: &Path) -> DeployResult<Value> {
    serde_yaml::from_str(text).map_err(|source| DeployError::Yaml {
        path: path.to_path_buf(),
        source,
    })
}

fn has_name(entry: &Value, name: &str) -> bool {
    entry.get("name").and_then(Value::as_str) == Some(name)
}

/// Walk modules -> hot -> services -> hot-api-mono, reporting the first
/// missing step.
fn target_service<'a>(document: &'a Value, path: &Path) -> Result<&'a Value, ShapeError> {
    let modules = document
        .get("modules")
        .and_then(Value::as_sequence)
        .ok_or_else(|| ShapeError::MissingModules(path.to_path_buf()))?;
    let module = modules
        .iter()
        .find(|module| has_name(module, TARGET_MODULE))
        .ok_or_else(|| ShapeError::MissingHotModule(path.to_path_buf()))?;
    let services = module
        .get("services")
        .and_then(Value::as_sequence)
        .ok_or_else(|| ShapeError::MissingServices(path.to_path_buf()))?;
    services
        .iter()
        .find(|service| has_name(service, TARGET_SERVICE))
        .ok_or_else(|| ShapeError::MissingService(path.to_path_buf()))
}

fn target_service_mut(document: &mut Value) -> Option<&mut Value> {
    document
        .get_mut("modules")?
        .as_sequence_mut()?
        .iter_mut()
        .find(|module| has_name(module, TARGET_MODULE))?
        .get_mut("services")?
        .as_sequence_mut()?
        .iter_mut()
        .find(|service| has_name(service, TARGET_SERVICE))
}

fn current_tag(document: &Value, path: &Path) -> Result<String, ShapeError> {
    let service = target_service(document, path)?;
    Ok(match service.get("tag") {
        None | Some(Value::Null) => MISSING_TAG.to_string(),
        Some(Value::String(tag)) => tag.clone(),
        Some(Value::Number(number)) => number.to_string(),
        Some(Value::Bool(flag)) => flag.to_string(),
        Some(other) => serde_yaml::to_string(other)
            .map(|text| text.trim().to_string())
            .unwrap_or_else(|_| MISSING_TAG.to_string()),
    })
}

/// Span of the target service's tag token inside the raw document text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagPatch {
    token: Range<usize>,
}

impl TagPatch {
    /// Every `hot-api-mono` tag token in `text`, in document order.
    ///
    /// Quotes around a token are left out of the span so they survive the
    /// replacement.
    pub fn locate_all(text: &str) -> Vec<TagPatch> {
        service_tag_regex()
            .captures_iter(text)
            .filter_map(|caps| caps.name("token"))
            .map(|token| TagPatch {
                token: unquoted(token.as_str(), token.range()),
            })
            .collect()
    }

    pub fn current<'a>(&self, text: &'a str) -> &'a str {
        &text[self.token.clone()]
    }

    pub fn apply(&self, text: &str, new_tag: &str) -> String {
        let mut patched = String::with_capacity(text.len() + new_tag.len());
        patched.push_str(&text[..self.token.start]);
        patched.push_str(new_tag);
        patched.push_str(&text[self.token.end..]);
        patched
    }
}

fn unquoted(token: &str, range: Range<usize>) -> Range<usize> {
    let bytes = token.as_bytes();
    let quoted = bytes.len() >= 2
        && matches!(bytes[0], b'"' | b'\'')
        && bytes[bytes.len() - 1] == bytes[0];
    if quoted {
        range.start + 1..range.end - 1
    } else {
        range
    }
}

fn service_tag_regex() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(SERVICE_TAG_PATTERN).expect("regex for service tag line"))
}

/// Replace the tag token and keep the first candidate whose re-parse differs
/// from the original only in the target service's tag.
fn patch_document(text: &str, document: &Value, new_tag: &str) -> Option<String> {
    let mut expected = document.clone();
    target_service_mut(&mut expected)?
        .as_mapping_mut()?
        .insert(Value::from("tag"), Value::from(new_tag));

    TagPatch::locate_all(text)
        .iter()
        .map(|patch| patch.apply(text, new_tag))
        .find(|candidate| {
            serde_yaml::from_str::<Value>(candidate)
                .map(|reparsed| reparsed == expected)
                .unwrap_or(false)
        })
}

fn io_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> DeployError {
    let path = path.to_path_buf();
    move |source| DeployError::Io {
        action,
        path,
        source,
    }
}

/// Whole-file overwrite through a sibling temp file.
///
/// Symlinks are followed so the link itself survives, and the temp file takes
/// the original's permissions before it is renamed over it.
fn write_replacing(path: &Path, text: &str) -> DeployResult<()> {
    let target = fs::canonicalize(path).map_err(io_error("resolve", path))?;
    let permissions = fs::metadata(&target)
        .map_err(io_error("stat", &target))?
        .permissions();
    let file_name = target
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("environment.yaml");
    let tmp_path = target
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(format!(".{file_name}.tmp"));

    let staged = fs::write(&tmp_path, text)
        .map_err(io_error("write", &tmp_path))
        .and_then(|()| {
            fs::set_permissions(&tmp_path, permissions)
                .map_err(io_error("set permissions on", &tmp_path))
        })
        .and_then(|()| {
            fs::rename(&tmp_path, &target).map_err(io_error("replace", &target))
        });
    if staged.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    staged
}
