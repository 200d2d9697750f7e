//! Decrypter and encrypted key resolution.
//!
//! Encrypted SAML elements carry the content encryption key either inline in
//! the `EncryptedData`'s `KeyInfo`, as a sibling `EncryptedKey`, or behind a
//! `RetrievalMethod` reference. The resolvers are tried in that order.

use std::sync::Arc;

use base64::Engine;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::credential::Credential;
use crate::error::{SpError, SpResult};
use crate::types::ENCRYPTED_KEY_RETRIEVAL_TYPE;

/// An `xenc:EncryptedKey`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedKey {
    /// `Id` attribute.
    pub id: Option<String>,
    /// `Recipient` attribute.
    pub recipient: Option<String>,
    /// Key transport algorithm.
    pub algorithm: Option<String>,
    /// Base64 `CipherValue`.
    pub cipher_value: String,
}

impl EncryptedKey {
    /// Decodes the wrapped key.
    pub fn cipher_bytes(&self) -> SpResult<Vec<u8>> {
        let compact: String = self.cipher_value.split_whitespace().collect();
        base64::engine::general_purpose::STANDARD
            .decode(compact)
            .map_err(|e| SpError::Decryption(format!("invalid CipherValue: {e}")))
    }
}

/// A `ds:RetrievalMethod` inside the `EncryptedData`'s `KeyInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetrievalMethod {
    /// `URI` attribute.
    pub uri: String,
    /// `Type` attribute.
    pub kind: Option<String>,
}

/// Parsed encrypted element such as `saml:EncryptedAssertion`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncryptedElement {
    /// Content encryption algorithm of the `EncryptedData`.
    pub data_algorithm: Option<String>,
    /// Base64 `CipherValue` of the `EncryptedData`.
    pub data_cipher_value: String,
    /// `EncryptedKey` elements inside the `EncryptedData`'s `KeyInfo`.
    pub inline_keys: Vec<EncryptedKey>,
    /// `RetrievalMethod` references inside the `EncryptedData`'s `KeyInfo`.
    pub retrieval_methods: Vec<RetrievalMethod>,
    /// `EncryptedKey` elements next to the `EncryptedData`.
    pub sibling_keys: Vec<EncryptedKey>,
}

impl EncryptedElement {
    /// Parses an encrypted element.
    pub fn parse(xml: &str) -> SpResult<Self> {
        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut element = Self::default();
        let mut stack: Vec<String> = Vec::new();
        let mut current_key: Option<(EncryptedKey, bool)> = None;
        let mut seen_data = false;

        loop {
            match reader.read_event().map_err(|e| SpError::XmlParse(e.to_string()))? {
                Event::Start(e) => {
                    let name = local_name(&e);
                    open(&mut element, &mut current_key, &stack, &name, &e)?;
                    seen_data |= name == "EncryptedData";
                    stack.push(name);
                }
                Event::Empty(e) => {
                    let name = local_name(&e);
                    open(&mut element, &mut current_key, &stack, &name, &e)?;
                    close(&mut element, &mut current_key, &name);
                }
                Event::Text(text) => {
                    if stack.last().map(String::as_str) == Some("CipherValue") {
                        let value = text
                            .unescape()
                            .map_err(|e| SpError::XmlParse(e.to_string()))?
                            .to_string();
                        match current_key.as_mut() {
                            Some((key, _)) => key.cipher_value = value,
                            None => element.data_cipher_value = value,
                        }
                    }
                }
                Event::End(_) => {
                    if let Some(name) = stack.pop() {
                        close(&mut element, &mut current_key, &name);
                    }
                }
                Event::Eof => break,
                _ => {}
            }
        }

        if !seen_data {
            return Err(SpError::XmlParse("no EncryptedData element found".to_string()));
        }
        Ok(element)
    }
}

fn local_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attribute(e: &BytesStart<'_>, name: &str) -> SpResult<Option<String>> {
    for attr in e.attributes().flatten() {
        if attr.key.local_name().as_ref() == name.as_bytes() {
            let value = attr
                .unescape_value()
                .map_err(|e| SpError::XmlParse(e.to_string()))?;
            return Ok(Some(value.into_owned()));
        }
    }
    Ok(None)
}

fn open(
    element: &mut EncryptedElement,
    current_key: &mut Option<(EncryptedKey, bool)>,
    stack: &[String],
    name: &str,
    e: &BytesStart<'_>,
) -> SpResult<()> {
    let in_data = stack.iter().any(|n| n == "EncryptedData");
    match name {
        "EncryptedKey" => {
            let key = EncryptedKey {
                id: attribute(e, "Id")?,
                recipient: attribute(e, "Recipient")?,
                ..EncryptedKey::default()
            };
            *current_key = Some((key, in_data));
        }
        "EncryptionMethod" => {
            let algorithm = attribute(e, "Algorithm")?;
            match current_key.as_mut() {
                Some((key, _)) => key.algorithm = algorithm,
                None if in_data => element.data_algorithm = algorithm,
                None => {}
            }
        }
        "RetrievalMethod" if in_data && current_key.is_none() => {
            if let Some(uri) = attribute(e, "URI")? {
                element.retrieval_methods.push(RetrievalMethod {
                    uri,
                    kind: attribute(e, "Type")?,
                });
            }
        }
        _ => {}
    }
    Ok(())
}

fn close(element: &mut EncryptedElement, current_key: &mut Option<(EncryptedKey, bool)>, name: &str) {
    if name == "EncryptedKey" {
        if let Some((key, inline)) = current_key.take() {
            if inline {
                element.inline_keys.push(key);
            } else {
                element.sibling_keys.push(key);
            }
        }
    }
}

/// A named strategy locating candidate encrypted keys.
#[derive(Clone, Copy)]
pub struct EncryptedKeyResolver {
    /// Resolver name, for logging.
    pub name: &'static str,
    resolve: fn(&EncryptedElement) -> Vec<EncryptedKey>,
}

impl std::fmt::Debug for EncryptedKeyResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptedKeyResolver").field("name", &self.name).finish()
    }
}

impl EncryptedKeyResolver {
    /// Keys inside the `EncryptedData`'s `KeyInfo`.
    pub const INLINE: Self = Self {
        name: "inline",
        resolve: resolve_inline,
    };

    /// Keys next to the `EncryptedData` in the encrypted element.
    pub const ENCRYPTED_ELEMENT_TYPE: Self = Self {
        name: "encrypted-element-type",
        resolve: resolve_encrypted_element_type,
    };

    /// Keys referenced through a same-document `RetrievalMethod`.
    pub const SIMPLE_RETRIEVAL_METHOD: Self = Self {
        name: "simple-retrieval-method",
        resolve: resolve_retrieval_methods,
    };

    /// The resolver chain, in evaluation order.
    #[must_use]
    pub fn chain() -> Vec<Self> {
        vec![Self::INLINE, Self::ENCRYPTED_ELEMENT_TYPE, Self::SIMPLE_RETRIEVAL_METHOD]
    }

    /// Returns the candidate keys found by this resolver.
    #[must_use]
    pub fn resolve(&self, element: &EncryptedElement) -> Vec<EncryptedKey> {
        (self.resolve)(element)
    }
}

fn resolve_inline(element: &EncryptedElement) -> Vec<EncryptedKey> {
    element.inline_keys.clone()
}

fn resolve_encrypted_element_type(element: &EncryptedElement) -> Vec<EncryptedKey> {
    element.sibling_keys.clone()
}

fn resolve_retrieval_methods(element: &EncryptedElement) -> Vec<EncryptedKey> {
    element
        .retrieval_methods
        .iter()
        .filter(|method| method.kind.as_deref() == Some(ENCRYPTED_KEY_RETRIEVAL_TYPE))
        .filter_map(|method| method.uri.strip_prefix('#'))
        .filter_map(|id| {
            element
                .sibling_keys
                .iter()
                .chain(&element.inline_keys)
                .find(|key| key.id.as_deref() == Some(id))
                .cloned()
        })
        .collect()
}

/// Decrypter bound to one local credential.
#[derive(Debug, Clone)]
pub struct Decrypter {
    credential: Arc<Credential>,
    recipients: Vec<String>,
    resolvers: Vec<EncryptedKeyResolver>,
}

impl Decrypter {
    /// Creates a decrypter for `credential`, accepting keys addressed to `recipients`.
    #[must_use]
    pub fn new(credential: Arc<Credential>, recipients: Vec<String>) -> Self {
        Self {
            credential,
            recipients,
            resolvers: EncryptedKeyResolver::chain(),
        }
    }

    /// Returns the decryption credential.
    #[must_use]
    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    /// Returns the resolver chain.
    #[must_use]
    pub fn resolvers(&self) -> &[EncryptedKeyResolver] {
        &self.resolvers
    }

    /// Finds the encrypted key for this decrypter.
    ///
    /// The first resolver yielding a key without recipient, or addressed to
    /// one of the recipients, wins.
    ///
    /// # Errors
    ///
    /// Returns [`SpError::Decryption`] if no resolver finds a usable key.
    pub fn resolve_encrypted_key(&self, element: &EncryptedElement) -> SpResult<EncryptedKey> {
        for resolver in &self.resolvers {
            let found = resolver.resolve(element).into_iter().find(|key| {
                key.recipient
                    .as_deref()
                    .map_or(true, |recipient| self.recipients.iter().any(|r| r == recipient))
            });
            if let Some(key) = found {
                tracing::debug!(resolver = resolver.name, key_id = ?key.id, "Encrypted key resolved");
                return Ok(key);
            }
        }
        Err(SpError::Decryption(format!(
            "no encrypted key found for credential {}",
            self.credential.name
        )))
    }

    /// Parses `xml` and finds its encrypted key.
    pub fn resolve_encrypted_key_from_xml(&self, xml: &str) -> SpResult<EncryptedKey> {
        self.resolve_encrypted_key(&EncryptedElement::parse(xml)?)
    }
}
