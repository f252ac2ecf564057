//! Provider speaking a conventional JSON REST API with bearer authentication.

use async_trait::async_trait;
use log::debug;
use serde::Serialize;

use super::{Chargeable, Currency, Fundable, PaymentType, Transaction};
use crate::error::{ClassifiedError, ErrorCode};
use crate::http::{CallContext, DEFAULT_RETRIES, HttpClient, HttpRequest};

/// Configuration of a [`RestProvider`].
#[derive(Debug, Clone)]
pub struct RestProviderConfig {
    pub name: String,
    pub base_url: String,
    pub secret_key: String,
    /// Retries applied to idempotent calls (status checks, lookups).
    pub retries: usize,
}

impl RestProviderConfig {
    /// Creates a configuration with the default retry budget.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            secret_key: secret_key.into(),
            retries: DEFAULT_RETRIES,
        }
    }

    /// Sets the retry budget for idempotent calls.
    pub fn retries(mut self, retries: usize) -> Self {
        self.retries = retries;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChargeRequest {
    amount: i64,
    currency: Currency,
    source: serde_json::Value,
    payment_type: PaymentType,
}

#[derive(Debug, Serialize)]
struct FundingRequest {
    amount: i64,
    currency: Currency,
    destination: serde_json::Value,
    payment_type: PaymentType,
}

/// Charges and funds through a provider exposing `/charges` and `/fundings`.
///
/// Calls that create or move money are attempted once; lookups are retried
/// on transient failures.
pub struct RestProvider {
    http_client: HttpClient,
    config: RestProviderConfig,
}

impl RestProvider {
    /// Creates a provider. A trailing `/` on the base URL is dropped.
    pub fn new(http_client: HttpClient, mut config: RestProviderConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            http_client,
            config,
        }
    }

    /// Configuration the provider was created with.
    pub fn config(&self) -> &RestProviderConfig {
        &self.config
    }

    fn request(&self, method: &str, path: &str) -> HttpRequest {
        HttpRequest::new(format!("{}{}", self.config.base_url, path), method)
            .with_bearer_auth(&self.config.secret_key)
    }

    fn invalid(&self, message: String) -> ClassifiedError {
        self.http_client
            .catalog()
            .error(ErrorCode::RequestNotValid, message)
            .with_param("provider", self.config.name.as_str())
    }

    fn check_amount(&self, amount: i64) -> Result<(), ClassifiedError> {
        if amount <= 0 {
            return Err(self.invalid(format!("amount must be positive, got {}", amount)));
        }
        Ok(())
    }

    /// References are interpolated into the path, so only `[A-Za-z0-9_-]` is accepted.
    fn check_reference(&self, reference: &str) -> Result<(), ClassifiedError> {
        let valid = !reference.is_empty()
            && reference
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
        if !valid {
            return Err(self.invalid(format!("invalid transaction reference: {:?}", reference)));
        }
        Ok(())
    }

    /// Sends a request expected to return a transaction.
    async fn transaction(
        &self,
        ctx: &CallContext,
        request: HttpRequest,
        idempotent: bool,
    ) -> Result<Transaction, ClassifiedError> {
        let mut tx: Transaction = if idempotent {
            self.http_client
                .execute_json_with_retries(ctx, &request, self.config.retries)
                .await?
        } else {
            self.http_client.execute_json(ctx, &request).await?
        };
        tx.provider = self.config.name.clone();
        debug!("{}: transaction {} is {}", tx.provider, tx.reference, tx.status);
        Ok(tx)
    }
}

#[async_trait]
impl Chargeable for RestProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[tracing::instrument(skip(self, ctx, source))]
    async fn initiate_charge(
        &self,
        ctx: &CallContext,
        source: &serde_json::Value,
        amount: i64,
        currency: Currency,
    ) -> Result<Transaction, ClassifiedError> {
        self.check_amount(amount)?;
        let request = self.request("POST", "/charges").with_body(ChargeRequest {
            amount,
            currency,
            source: source.clone(),
            payment_type: PaymentType::CustomerPayment,
        });
        self.transaction(ctx, request, false).await
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn get_charge_authorization(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<serde_json::Value, ClassifiedError> {
        self.check_reference(reference)?;
        let request = self.request("GET", &format!("/charges/{}/authorization", reference));
        self.http_client
            .execute_json_with_retries(ctx, &request, self.config.retries)
            .await
    }

    #[tracing::instrument(skip(self, ctx, authorization_data))]
    async fn authorize_charge(
        &self,
        ctx: &CallContext,
        reference: &str,
        authorization_data: &serde_json::Value,
    ) -> Result<Transaction, ClassifiedError> {
        self.check_reference(reference)?;
        let request = self
            .request("POST", &format!("/charges/{}/authorize", reference))
            .with_body(authorization_data.clone());
        self.transaction(ctx, request, false).await
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn check_charge_status(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<Transaction, ClassifiedError> {
        self.check_reference(reference)?;
        let request = self.request("GET", &format!("/charges/{}", reference));
        self.transaction(ctx, request, true).await
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn complete_charge(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<Transaction, ClassifiedError> {
        self.check_reference(reference)?;
        let request = self.request("POST", &format!("/charges/{}/complete", reference));
        self.transaction(ctx, request, false).await
    }
}

#[async_trait]
impl Fundable for RestProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    #[tracing::instrument(skip(self, ctx, destination))]
    async fn initiate_funding(
        &self,
        ctx: &CallContext,
        destination: &serde_json::Value,
        amount: i64,
        currency: Currency,
    ) -> Result<Transaction, ClassifiedError> {
        self.check_amount(amount)?;
        let request = self.request("POST", "/fundings").with_body(FundingRequest {
            amount,
            currency,
            destination: destination.clone(),
            payment_type: PaymentType::CustomerPayment,
        });
        self.transaction(ctx, request, false).await
    }

    #[tracing::instrument(skip(self, ctx))]
    async fn complete_funding(
        &self,
        ctx: &CallContext,
        reference: &str,
    ) -> Result<Transaction, ClassifiedError> {
        self.check_reference(reference)?;
        let request = self.request("POST", &format!("/fundings/{}/complete", reference));
        self.transaction(ctx, request, false).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use reqwest::Client;
    use serde_json::json;

    fn provider(url: &str) -> RestProvider {
        RestProvider::new(
            HttpClient::new(Client::new()),
            RestProviderConfig::new("acme", format!("{}/", url), "sk_test_123").retries(1),
        )
    }

    const PENDING: &str =
        r#"{"reference":"ch_1","status":"pending","amount":100,"currency":"USD"}"#;

    #[tokio::test]
    async fn test_initiate_charge() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("POST", "/charges")
            .match_header("authorization", "Bearer sk_test_123")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "amount": 100,
                "currency": "USD",
                "source": {"card": "tok_visa"},
                "payment_type": "customer_payment"
            })))
            .with_status(200)
            .with_body(PENDING)
            .create_async()
            .await;

        let tx = provider(&url)
            .initiate_charge(
                &CallContext::background(),
                &json!({"card": "tok_visa"}),
                100,
                Currency::UsDollar,
            )
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tx.reference, "ch_1");
        assert_eq!(tx.status, "pending");
        assert_eq!(tx.provider, "acme");
    }

    #[tokio::test]
    async fn test_initiate_charge_is_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("POST", "/charges")
            .with_status(502)
            .expect(1)
            .create_async()
            .await;

        let err = provider(&url)
            .initiate_charge(&CallContext::background(), &json!({}), 100, Currency::UsDollar)
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code(), ErrorCode::ApiRequestStatusError);
    }

    #[tokio::test]
    async fn test_rejects_non_positive_amount() {
        let err = provider("http://127.0.0.1:1")
            .initiate_funding(&CallContext::background(), &json!({}), 0, Currency::Euro)
            .await
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::RequestNotValid);
        assert_eq!(err.param("provider"), Some("acme"));
    }

    #[tokio::test]
    async fn test_rejects_bad_reference() {
        let err = provider("http://127.0.0.1:1")
            .complete_charge(&CallContext::background(), "../admin")
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::RequestNotValid);
        assert_eq!(err.info(), "The request is not valid");
        assert_eq!(err.param("provider"), Some("acme"));
    }

    #[tokio::test]
    async fn test_rejects_references_that_escape_the_path() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        // Nothing may reach the server, whatever path the reference resolves to.
        let any_get = server
            .mock("GET", Matcher::Any)
            .expect(0)
            .create_async()
            .await;
        let any_post = server
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let provider = provider(&url);
        let ctx = CallContext::background();

        for reference in ["", ".", "..", "a?b", "ch_1?admin=1", "a#b", "a%2Fb", "a b"] {
            let err = provider.complete_charge(&ctx, reference).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::RequestNotValid, "{:?}", reference);

            let err = provider.check_charge_status(&ctx, reference).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::RequestNotValid, "{:?}", reference);

            let err = provider.complete_funding(&ctx, reference).await.unwrap_err();
            assert_eq!(err.code(), ErrorCode::RequestNotValid, "{:?}", reference);
        }

        any_get.assert_async().await;
        any_post.assert_async().await;
    }

    #[tokio::test]
    async fn test_accepts_dashed_references() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/charges/ch-2024_AB9")
            .with_status(200)
            .with_body(r#"{"reference":"ch-2024_AB9","status":"pending","amount":1,"currency":"EUR"}"#)
            .create_async()
            .await;

        let tx = provider(&url)
            .check_charge_status(&CallContext::background(), "ch-2024_AB9")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tx.reference, "ch-2024_AB9");
    }

    #[tokio::test]
    async fn test_check_charge_status_retries() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let mock = server
            .mock("GET", "/charges/ch_1")
            .with_status(503)
            .expect(2)
            .create_async()
            .await;

        let err = provider(&url)
            .check_charge_status(&CallContext::background(), "ch_1")
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert_eq!(err.code(), ErrorCode::ApiRequestStatusError);
    }

    #[tokio::test]
    async fn test_authorization_flow() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let lookup = server
            .mock("GET", "/charges/ch_1/authorization")
            .with_status(200)
            .with_body(r#"{"mode":"otp"}"#)
            .create_async()
            .await;
        let authorize = server
            .mock("POST", "/charges/ch_1/authorize")
            .match_body(Matcher::Json(json!({"otp": "123456"})))
            .with_status(200)
            .with_body(r#"{"reference":"ch_1","status":"authorized","amount":100,"currency":"NGN"}"#)
            .create_async()
            .await;
        let complete = server
            .mock("POST", "/charges/ch_1/complete")
            .with_status(200)
            .with_body(r#"{"reference":"ch_1","status":"succeeded","amount":100,"currency":"NGN"}"#)
            .create_async()
            .await;

        let provider = provider(&url);
        let ctx = CallContext::background();

        let requirements = provider.get_charge_authorization(&ctx, "ch_1").await.unwrap();
        assert_eq!(requirements["mode"], "otp");

        let tx = provider
            .authorize_charge(&ctx, "ch_1", &json!({"otp": "123456"}))
            .await
            .unwrap();
        assert_eq!(tx.status, "authorized");

        let tx = provider.complete_charge(&ctx, "ch_1").await.unwrap();
        assert_eq!(tx.status, "succeeded");
        assert_eq!(tx.currency, Currency::NigeriaNaira);

        lookup.assert_async().await;
        authorize.assert_async().await;
        complete.assert_async().await;
    }

    #[tokio::test]
    async fn test_funding_flow() {
        let mut server = mockito::Server::new_async().await;
        let url = server.url();

        let initiate = server
            .mock("POST", "/fundings")
            .match_body(Matcher::PartialJson(json!({"amount": 5000, "currency": "KES"})))
            .with_status(200)
            .with_body(r#"{"reference":"fd_9","status":"pending","amount":5000,"currency":"KES"}"#)
            .create_async()
            .await;
        let complete = server
            .mock("POST", "/fundings/fd_9/complete")
            .with_status(200)
            .with_body(r#"{"reference":"fd_9","status":"paid","amount":5000,"currency":"KES"}"#)
            .create_async()
            .await;

        let provider = provider(&url);
        let ctx = CallContext::background();

        let tx = provider
            .initiate_funding(&ctx, &json!({"account": "0123"}), 5000, Currency::KenyaShilling)
            .await
            .unwrap();
        assert_eq!(tx.reference, "fd_9");

        let tx = provider.complete_funding(&ctx, &tx.reference).await.unwrap();
        assert_eq!(tx.status, "paid");
        assert_eq!(Fundable::name(&provider), "acme");

        initiate.assert_async().await;
        complete.assert_async().await;
    }
}
