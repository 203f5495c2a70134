use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use hebao_common::utils::keccak;
use serde::{Deserialize, de::DeserializeOwned};
use tracing::{debug, trace};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("Failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse artifact {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Artifact for contract {name} not found under {dir}")]
    NotFound { name: String, dir: PathBuf },
    #[error("Artifact {0} has no creation bytecode")]
    EmptyBytecode(String),
}

/// A 20-byte slot inside creation bytecode reserved for a library address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct LinkOffset {
    pub start: usize,
    pub length: usize,
}

/// Every slot of one library referenced by a contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkReference {
    pub source: String,
    pub library: String,
    pub offsets: Vec<LinkOffset>,
}

impl LinkReference {
    /// `source:Library`, the name solc hashes into modern placeholders.
    pub fn fully_qualified_name(&self) -> String {
        format!("{}:{}", self.source, self.library)
    }
}

/// The compilation an artifact came from, as recorded in Hardhat's
/// build-info files. Shared by every artifact of the same compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerInput {
    /// Long solc version, e.g. `0.7.6+commit.7338295f`.
    pub solc_version: String,
    /// Solidity standard JSON input, serialized.
    pub standard_json: String,
}

/// Compiled contract as emitted by Hardhat: creation bytecode in hex, with
/// zeroed or placeholder slots for every linked library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractArtifact {
    pub name: String,
    pub source_name: Option<String>,
    /// Lowercase hex without `0x`. May still contain placeholder text.
    pub bytecode: String,
    pub link_references: Vec<LinkReference>,
    pub compiler_input: Option<Arc<CompilerInput>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatArtifact {
    contract_name: String,
    #[serde(default)]
    source_name: Option<String>,
    bytecode: String,
    #[serde(default)]
    link_references: BTreeMap<String, BTreeMap<String, Vec<LinkOffset>>>,
}

/// `<Name>.dbg.json`, written next to every Hardhat artifact.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatDebugFile {
    /// Relative to the debug file's directory.
    build_info: PathBuf,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct HardhatBuildInfo {
    solc_long_version: String,
    input: serde_json::Value,
}

impl ContractArtifact {
    pub fn new(
        name: impl Into<String>,
        bytecode: impl AsRef<str>,
        link_references: Vec<LinkReference>,
    ) -> Self {
        let bytecode = bytecode.as_ref();
        Self {
            name: name.into(),
            source_name: None,
            bytecode: bytecode.strip_prefix("0x").unwrap_or(bytecode).to_string(),
            link_references,
            compiler_input: None,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let raw: HardhatArtifact = serde_json::from_str(json)?;
        let link_references = raw
            .link_references
            .into_iter()
            .flat_map(|(source, libraries)| {
                libraries
                    .into_iter()
                    .map(move |(library, offsets)| LinkReference {
                        source: source.clone(),
                        library,
                        offsets,
                    })
            })
            .collect();

        let mut artifact = Self::new(raw.contract_name, raw.bytecode, link_references);
        artifact.source_name = raw.source_name;
        Ok(artifact)
    }

    pub fn load(path: &Path) -> Result<Self, ArtifactError> {
        let json = read_file(path)?;
        let artifact = Self::from_json(&json).map_err(|source| ArtifactError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        if artifact.bytecode.is_empty() {
            return Err(ArtifactError::EmptyBytecode(artifact.name));
        }
        Ok(artifact)
    }

    /// `source.sol:Name` when the source file is known, the bare name
    /// otherwise.
    pub fn fully_qualified_name(&self) -> String {
        match &self.source_name {
            Some(source) => format!("{source}:{}", self.name),
            None => self.name.clone(),
        }
    }

    /// Names of the libraries this contract links against.
    pub fn dependencies(&self) -> BTreeSet<String> {
        self.link_references
            .iter()
            .map(|reference| reference.library.clone())
            .collect()
    }
}

/// Placeholder text emitted by solc >= 0.5 for a library, `__$<34 hex>$__`.
pub fn library_placeholder(fully_qualified_name: &str) -> String {
    let hash = hex::encode(keccak(fully_qualified_name.as_bytes()));
    format!("__${}$__", &hash[..34])
}

/// Placeholder text emitted by older solc versions, `__<name>` padded with
/// underscores to 40 characters.
pub fn legacy_library_placeholder(fully_qualified_name: &str) -> String {
    let truncated: String = fully_qualified_name.chars().take(36).collect();
    format!("__{truncated:_<38}")
}

/// Looks for `<name>.json` below `dir`, skipping Hardhat's `.dbg.json` files.
pub fn find_artifact(dir: &Path, name: &str) -> Result<PathBuf, ArtifactError> {
    let file_name = format!("{name}.json");
    search(dir, &file_name)
        .map_err(|source| ArtifactError::Io {
            path: dir.to_path_buf(),
            source,
        })?
        .ok_or_else(|| ArtifactError::NotFound {
            name: name.to_string(),
            dir: dir.to_path_buf(),
        })
}

fn search(dir: &Path, file_name: &str) -> std::io::Result<Option<PathBuf>> {
    let mut subdirs = Vec::new();
    let mut entries = fs::read_dir(dir)?.collect::<Result<Vec<_>, _>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let path = entry.path();
        if path.is_dir() {
            subdirs.push(path);
        } else if entry.file_name().to_str() == Some(file_name) {
            trace!(path = %path.display(), "Found artifact");
            return Ok(Some(path));
        }
    }

    for subdir in subdirs {
        if let Some(found) = search(&subdir, file_name)? {
            return Ok(Some(found));
        }
    }
    Ok(None)
}

/// Loads artifacts from one Hardhat artifacts directory together with their
/// compiler input. Each build-info file is read once per loader.
#[derive(Debug)]
pub struct ArtifactLoader {
    dir: PathBuf,
    build_infos: HashMap<PathBuf, Arc<CompilerInput>>,
}

impl ArtifactLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            build_infos: HashMap::new(),
        }
    }

    pub fn load(&mut self, name: &str) -> Result<ContractArtifact, ArtifactError> {
        let path = find_artifact(&self.dir, name)?;
        let mut artifact = ContractArtifact::load(&path)?;
        artifact.compiler_input = self.compiler_input(&path)?;
        Ok(artifact)
    }

    /// Follows the debug file next to `artifact_path` to its build-info.
    /// `None` when the artifact has no debug file.
    fn compiler_input(
        &mut self,
        artifact_path: &Path,
    ) -> Result<Option<Arc<CompilerInput>>, ArtifactError> {
        let debug_path = artifact_path.with_extension("dbg.json");
        if !debug_path.is_file() {
            debug!(artifact = %artifact_path.display(), "No debug file, compiler input unknown");
            return Ok(None);
        }
        let debug_file: HardhatDebugFile = read_json(&debug_path)?;
        let relative = debug_path
            .parent()
            .map(|dir| dir.join(&debug_file.build_info))
            .unwrap_or(debug_file.build_info);
        let build_info_path = fs::canonicalize(&relative).map_err(|source| ArtifactError::Io {
            path: relative,
            source,
        })?;

        if let Some(cached) = self.build_infos.get(&build_info_path) {
            return Ok(Some(Arc::clone(cached)));
        }
        let build_info: HardhatBuildInfo = read_json(&build_info_path)?;
        trace!(path = %build_info_path.display(), solc = %build_info.solc_long_version, "Loaded build info");
        let input = Arc::new(CompilerInput {
            solc_version: build_info.solc_long_version,
            standard_json: build_info.input.to_string(),
        });
        self.build_infos.insert(build_info_path, Arc::clone(&input));
        Ok(Some(input))
    }
}

fn read_file(path: &Path) -> Result<String, ArtifactError> {
    fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    serde_json::from_str(&read_file(path)?).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
