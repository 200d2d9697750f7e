//! SAML authentication initiation tests.
//!
//! Drive `/saml/login` over HTTP and check where the browser is sent.

use crate::common::{federation, query_param, TestEnv, SP_ENTITY_ID};

/// A login without parameters goes to the default IDP.
#[tokio::test]
async fn test_login_redirects_to_default_idp() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let location = env.login_redirect(&[]).await?;

    assert_eq!(location.host_str(), Some("idp.example"));
    assert_eq!(location.path(), "/sso");
    assert!(
        query_param(&location, "SAMLRequest").is_some(),
        "Redirect should carry SAMLRequest"
    );
    Ok(())
}

/// A user-selected IDP replaces the default one.
#[tokio::test]
async fn test_login_with_selected_idp() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let location = env.login_redirect(&[("idp", "https://other.example")]).await?;

    assert_eq!(location.host_str(), Some("other.example"));
    assert_eq!(location.path(), "/sso");
    Ok(())
}

/// Relay state from the request is returned alongside the request.
#[tokio::test]
async fn test_login_preserves_relay_state() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let location = env.login_redirect(&[("RelayState", "/app/home")]).await?;

    assert_eq!(query_param(&location, "RelayState").as_deref(), Some("/app/home"));
    Ok(())
}

/// An IDP missing from metadata is rejected.
#[tokio::test]
async fn test_login_with_unknown_idp() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.login_url())
        .query(&[("idp", "https://unknown.example")])
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 400, "Expected 400 for unknown IDP");
    Ok(())
}

/// With discovery enabled the user is sent to the discovery service.
#[tokio::test]
async fn test_login_redirects_to_discovery() -> anyhow::Result<()> {
    let env = TestEnv::with_federation(federation(true)).await?;

    let location = env.login_redirect(&[]).await?;

    assert_eq!(location.path(), "/saml/discovery");
    assert_eq!(query_param(&location, "entityID").as_deref(), Some(SP_ENTITY_ID));
    assert_eq!(query_param(&location, "returnIDParam").as_deref(), Some("idp"));
    Ok(())
}

/// Returning from discovery without a choice does not loop back to it.
#[tokio::test]
async fn test_discovery_return_goes_to_default_idp() -> anyhow::Result<()> {
    let env = TestEnv::with_federation(federation(true)).await?;

    let location = env.login_redirect(&[("disco", "true")]).await?;

    assert_eq!(location.host_str(), Some("idp.example"));
    Ok(())
}

/// An ECP client receives a PAOS request instead of a redirect.
#[tokio::test]
async fn test_ecp_client_receives_paos_request() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(env.login_url())
        .header("Accept", "text/html; application/vnd.paos+xml")
        .header(
            "PAOS",
            r#"ver="urn:liberty:paos:2003-08";"urn:oasis:names:tc:SAML:2.0:profiles:SSO:ecp""#,
        )
        .send()
        .await?;

    assert!(response.status().is_success(), "Expected success, got {}", response.status());
    let content_type = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    assert_eq!(content_type, "application/vnd.paos+xml");

    let body = response.text().await?;
    assert!(body.contains("AuthnRequest"), "Envelope should contain AuthnRequest");
    assert!(
        body.contains("https://sp.example.org/saml/SSO/ECP"),
        "Envelope should name the PAOS consumer service"
    );
    Ok(())
}

/// An alias with no mapping is a 404.
#[tokio::test]
async fn test_unknown_alias_not_found() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(format!("{}/saml/login/alias/nobody", env.base_url))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 404, "Expected 404 for unknown alias");
    Ok(())
}

/// A mapped alias resolves the hosted SP.
#[tokio::test]
async fn test_known_alias_redirects() -> anyhow::Result<()> {
    let env = TestEnv::new().await?;

    let response = env
        .client
        .get(format!("{}/saml/login/alias/sp1", env.base_url))
        .send()
        .await?;

    assert_eq!(response.status().as_u16(), 302);
    Ok(())
}
