//! TLS hostname verification policies.

use crate::credential::CertificateNames;

/// How a server certificate is matched against the host being contacted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostnameVerification {
    /// Wildcards may cover one or more leading labels.
    #[default]
    Default,
    /// As `Default`, and loopback hosts are always accepted.
    DefaultAndLocalhost,
    /// Wildcards cover exactly one label.
    Strict,
    /// Every host is accepted.
    AllowAll,
}

impl HostnameVerification {
    /// Resolves a policy by its configured name, ignoring case.
    ///
    /// Unknown names fall back to [`HostnameVerification::Default`].
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "default" => Self::Default,
            "defaultandlocalhost" => Self::DefaultAndLocalhost,
            "strict" => Self::Strict,
            "allowall" => Self::AllowAll,
            _ => {
                tracing::warn!(
                    policy = name,
                    "Unknown hostname verification policy, using default"
                );
                Self::Default
            }
        }
    }

    /// Returns the configuration name of this policy.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::DefaultAndLocalhost => "defaultAndLocalhost",
            Self::Strict => "strict",
            Self::AllowAll => "allowAll",
        }
    }

    /// Returns true if a certificate issued to `names` may serve `host`.
    ///
    /// DNS subject alternative names are used when present, the subject
    /// common names otherwise.
    #[must_use]
    pub fn verify(&self, host: &str, names: &CertificateNames) -> bool {
        match self {
            Self::AllowAll => return true,
            Self::DefaultAndLocalhost if is_localhost(host) => return true,
            _ => {}
        }

        let candidates = if names.dns_names.is_empty() {
            &names.common_names
        } else {
            &names.dns_names
        };
        let strict = matches!(self, Self::Strict);
        candidates
            .iter()
            .any(|pattern| matches_pattern(pattern, host, strict))
    }
}

fn is_localhost(host: &str) -> bool {
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.eq_ignore_ascii_case("localhost") || host == "127.0.0.1" || host == "::1"
}

fn matches_pattern(pattern: &str, host: &str, strict: bool) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let host = host.to_ascii_lowercase();

    let Some(suffix) = pattern.strip_prefix("*.") else {
        return pattern == host;
    };
    // A bare "*.tld" wildcard is never honored.
    if !suffix.contains('.') {
        return false;
    }
    let Some(prefix) = host.strip_suffix(suffix).and_then(|p| p.strip_suffix('.')) else {
        return false;
    };
    !prefix.is_empty() && (!strict || !prefix.contains('.'))
}
