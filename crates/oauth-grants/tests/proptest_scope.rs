//! Property-based tests for scope reconciliation and token issuance.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use oauth_grants::config::Config;
use oauth_grants::error::GrantError;
use oauth_grants::models::{Client, Registry, Scope};
use oauth_grants::server::oauth::authorize::reconcile_scope;
use oauth_grants::server::oauth::{
    AuthorizationServer, ClientCredentials, MemoryTokenStore, TokenRequest, TokenStore,
};

/// A registered scope of one to six distinct tokens.
fn arb_registered() -> impl Strategy<Value = Vec<String>> {
    proptest::collection::hash_set("[a-z]{1,8}(\\.[a-z]{1,5})?", 1..6)
        .prop_map(|set| set.into_iter().collect())
}

/// Registered scope plus a subset of it.
fn arb_registered_and_subset() -> impl Strategy<Value = (Vec<String>, Vec<String>)> {
    arb_registered().prop_flat_map(|registered| {
        let len = registered.len();
        (Just(registered.clone()), proptest::sample::subsequence(registered, 0..=len))
    })
}

proptest! {
    /// Any subset of the registered scope is granted verbatim.
    #[test]
    fn subset_is_granted((registered, subset) in arb_registered_and_subset()) {
        let client = Client::new("c", "s", &registered.join(" "));
        let granted = reconcile_scope(Some(&subset.join(" ")), &client).unwrap();

        prop_assert_eq!(granted.iter().collect::<Vec<_>>(), subset.iter().map(String::as_str).collect::<Vec<_>>());
        prop_assert!(granted.is_subset(&client.scope));
    }

    /// One unregistered token anywhere in the request is enough to fail.
    #[test]
    fn unregistered_token_is_rejected(
        (registered, subset) in arb_registered_and_subset(),
        extra in "[A-Z]{1,8}",
        position in any::<prop::sample::Index>(),
    ) {
        let client = Client::new("c", "s", &registered.join(" "));
        let mut requested = subset;
        let at = position.index(requested.len() + 1);
        requested.insert(at, extra);

        let result = reconcile_scope(Some(&requested.join(" ")), &client);
        prop_assert!(matches!(result, Err(GrantError::InvalidScope)));
    }

    /// Whitespace layout does not change the parsed scope.
    #[test]
    fn whitespace_is_insignificant(tokens in proptest::collection::vec("[a-z]{1,6}", 0..6), sep in "[ \t]{1,3}") {
        let single = Scope::parse(&tokens.join(" "));
        let padded = Scope::parse(&format!("{sep}{}{sep}", tokens.join(sep.as_str())));
        prop_assert_eq!(single, padded);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Issued tokens always carry a scope within the client's registration.
    #[test]
    fn stored_scope_within_registration((registered, subset) in arb_registered_and_subset()) {
        let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
        runtime.block_on(async {
            let registry = Registry::new(vec![Client::new("app", "secret", &registered.join(" "))], vec![]).unwrap();
            let config = Config::new(registry, Duration::from_secs(60));
            let store = MemoryTokenStore::new();
            let server = AuthorizationServer::new(&config, Arc::new(store.clone()));
            let auth = ClientCredentials::new("app", "secret").to_basic_header();

            let scope = subset.join(" ");
            let response = server
                .issue_token(Some(&auth), &TokenRequest::client_credentials(Some(&scope)))
                .await
                .unwrap();
            let record = store.get(&response.access_token).await.unwrap().unwrap();

            let registered_scope = Scope::parse(&registered.join(" "));
            assert!(record.scope.is_subset(&registered_scope));
            assert_eq!(record.scope.to_wire(), scope);
        });
    }
}
