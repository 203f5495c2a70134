use std::collections::BTreeMap;

use bytes::Bytes;
use ethereum_types::Address;
use tracing::trace;

use crate::artifact::{ContractArtifact, legacy_library_placeholder, library_placeholder};

const ADDRESS_LENGTH: usize = 20;
const PLACEHOLDER_HEX_LENGTH: usize = 2 * ADDRESS_LENGTH;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("{contract} links against {library}, which has no known address")]
    MissingLinkAddress { contract: String, library: String },
    #[error("Invalid bytecode for {contract}: {reason}")]
    InvalidBytecode { contract: String, reason: String },
}

/// Writes the address of every referenced library into `artifact`'s creation
/// bytecode and decodes the result.
///
/// The output depends only on the artifact and the addresses of the libraries
/// it references. Patching already linked bytecode with the same addresses
/// yields the same bytes.
pub fn link_bytecode(
    artifact: &ContractArtifact,
    addresses: &BTreeMap<String, Address>,
) -> Result<Bytes, LinkError> {
    if !artifact.bytecode.is_ascii() {
        return Err(invalid(artifact, "non-ASCII characters".to_string()));
    }
    let mut code = artifact.bytecode.to_ascii_lowercase();

    for reference in &artifact.link_references {
        let address = addresses
            .get(&reference.library)
            .ok_or_else(|| LinkError::MissingLinkAddress {
                contract: artifact.name.clone(),
                library: reference.library.clone(),
            })?;
        let address_hex = hex::encode(address.as_bytes());

        for offset in &reference.offsets {
            if offset.length != ADDRESS_LENGTH {
                return Err(invalid(
                    artifact,
                    format!(
                        "link reference to {} has length {}",
                        reference.library, offset.length
                    ),
                ));
            }
            let start = offset.start * 2;
            let end = start + PLACEHOLDER_HEX_LENGTH;
            if end > code.len() {
                return Err(invalid(
                    artifact,
                    format!(
                        "link reference to {} at byte {} is out of range",
                        reference.library, offset.start
                    ),
                ));
            }
            code.replace_range(start..end, &address_hex);
        }
        trace!(
            contract = %artifact.name,
            library = %reference.library,
            address = ?address,
            "Linked library"
        );
    }

    if let Some(position) = code.find(['_', '$']) {
        return Err(LinkError::MissingLinkAddress {
            contract: artifact.name.clone(),
            library: placeholder_owner(artifact, position),
        });
    }

    hex::decode(&code)
        .map(Bytes::from)
        .map_err(|err| invalid(artifact, err.to_string()))
}

/// True once no placeholder text remains in `bytecode`.
pub fn is_fully_linked(bytecode: &str) -> bool {
    !bytecode.contains(['_', '$'])
}

fn invalid(artifact: &ContractArtifact, reason: String) -> LinkError {
    LinkError::InvalidBytecode {
        contract: artifact.name.clone(),
        reason,
    }
}

/// Best effort mapping from leftover placeholder text back to a library name.
fn placeholder_owner(artifact: &ContractArtifact, position: usize) -> String {
    let code = &artifact.bytecode;
    let start = position.min(code.len().saturating_sub(PLACEHOLDER_HEX_LENGTH));
    let window = code.get(start..start + PLACEHOLDER_HEX_LENGTH).unwrap_or("");

    for reference in &artifact.link_references {
        let fqn = reference.fully_qualified_name();
        if window == library_placeholder(&fqn)
            || window == legacy_library_placeholder(&fqn)
            || window == legacy_library_placeholder(&reference.library)
        {
            return reference.library.clone();
        }
    }
    window.trim_matches(['_', '$']).to_string()
}
