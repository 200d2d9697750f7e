//! Service provider router configuration.

use axum::{routing::get, Router};

use super::login::login;
use super::state::SpState;

/// Path of the login endpoint.
pub const LOGIN_PATH: &str = "/saml/login";

/// Creates the service provider router.
///
/// # Endpoints
///
/// | Method | Path                                   | Handler | Description                          |
/// |--------|----------------------------------------|---------|--------------------------------------|
/// | GET    | `/saml/login`                          | `login` | Login for the hosted SP              |
/// | GET    | `/saml/login/alias/{alias}[/idp\|/sp]` | `login` | Login for the entity mapped to alias |
///
/// Both accept the optional `idp`, `disco` and `RelayState` parameters.
pub fn sp_router() -> Router<SpState> {
    Router::new()
        .route(LOGIN_PATH, get(login))
        .route("/saml/login/alias/{*rest}", get(login))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use super::*;
    use crate::entry_point::SsoEntryPoint;
    use crate::event::InMemoryEventLogger;
    use crate::metadata::ExtendedMetadata;
    use crate::storage::SharedMessageStorageFactory;
    use crate::testing::*;
    use crate::transport::RequestAttributes;

    fn app(federation: &Federation) -> Router {
        let entry_point = SsoEntryPoint::with_standard_initiators(
            federation.metadata.clone(),
            federation.keys.clone(),
            Arc::new(SharedMessageStorageFactory::new()),
            Arc::new(InMemoryEventLogger::new()),
        );
        sp_router().with_state(SpState::new(Arc::new(entry_point)).with_context_path("/sp"))
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn login_redirects_to_idp() {
        let response = app(&federation()).oneshot(get("/saml/login")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{IDP_ENTITY}/sso/redirect?SAMLRequest=")));
    }

    #[tokio::test]
    async fn alias_login_with_selected_idp() {
        let response = app(&federation())
            .oneshot(get("/saml/login/alias/sp1/sp?idp=https%3A%2F%2Fother.example"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{OTHER_IDP_ENTITY}/sso/redirect?")));
    }

    #[tokio::test]
    async fn unknown_alias_renders_error_page() {
        let response = app(&federation())
            .oneshot(get("/saml/login/alias/missing"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).contains("missing"));
    }

    #[tokio::test]
    async fn discovery_uses_context_path() {
        let federation = federation_with(
            ExtendedMetadata {
                idp_discovery_enabled: true,
                ..sp_extended()
            },
            sp_descriptor(),
        );
        let response = app(&federation).oneshot(get("/saml/login")).await.unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with("/sp/saml/discovery?entityID="));
    }

    #[tokio::test]
    async fn pre_bound_peer_from_extension() {
        let mut request = get("/saml/login?idp=https%3A%2F%2Fother.example");
        request.extensions_mut().insert(RequestAttributes {
            local_entity_id: None,
            peer_entity_id: Some(IDP_ENTITY.to_string()),
        });
        let response = app(&federation()).oneshot(request).await.unwrap();

        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert!(location.starts_with(&format!("{IDP_ENTITY}/sso/redirect?")));
    }

    #[tokio::test]
    async fn ecp_client_receives_paos_envelope() {
        let federation = federation_with(
            ExtendedMetadata {
                ecp_enabled: true,
                ..sp_extended()
            },
            sp_descriptor(),
        );
        let request = Request::builder()
            .uri("/saml/login")
            .header(header::ACCEPT, "text/html; application/vnd.paos+xml")
            .header("PAOS", r#"ver="urn:liberty:paos:2003-08";"urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp""#)
            .body(Body::empty())
            .unwrap();
        let response = app(&federation).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
            "application/vnd.paos+xml"
        );
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert!(String::from_utf8_lossy(&body).starts_with("<S:Envelope"));
    }
}
