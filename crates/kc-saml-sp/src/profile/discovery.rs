//! IDP discovery redirects.

use url::Url;

use crate::context::RequestContext;
use crate::entity::IDP_PARAMETER;

/// Request parameter marking a return from the discovery service.
pub const DISCOVERY_RETURN_PARAMETER: &str = "disco";

/// Path of the local discovery service below the context path.
pub const DEFAULT_DISCOVERY_PATH: &str = "/saml/discovery";

/// Returns true if the request comes back from the discovery service.
#[must_use]
pub fn is_discovery_return(context: &RequestContext) -> bool {
    context
        .request()
        .parameter(DISCOVERY_RETURN_PARAMETER)
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Builds the URL sending the user to the discovery service.
///
/// Uses the configured `idpDiscoveryUrl`, else the local service under the
/// request's context path. The URL carries the local entity id and the name
/// of the parameter the service must return the chosen IDP in.
#[must_use]
pub fn discovery_url(context: &RequestContext) -> String {
    let base = context
        .local_extended()
        .idp_discovery_url
        .clone()
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| format!("{}{DEFAULT_DISCOVERY_PATH}", context.request().context_path()));
    let entity_id = context.local_entity_id();

    match Url::parse(&base) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("entityID", entity_id)
                .append_pair("returnIDParam", IDP_PARAMETER);
            url.to_string()
        }
        // Relative local path.
        Err(_) => {
            let separator = if base.contains('?') { '&' } else { '?' };
            format!(
                "{base}{separator}entityID={}&returnIDParam={IDP_PARAMETER}",
                urlencoding::encode(entity_id)
            )
        }
    }
}
