use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;

use account_service::domain::crud::service::CrudService;
use account_service::domain::errors::EmailDeliveryError;
use account_service::domain::user::models::EmailAddress;
use account_service::domain::user::models::PasswordSelection;
use account_service::domain::user::models::PendingReset;
use account_service::domain::user::models::Role;
use account_service::domain::user::models::User;
use account_service::domain::user::models::UserName;
use account_service::domain::user::ports::EmailSender;
use account_service::domain::user::ports::OutgoingEmail;
use account_service::domain::user::ports::UserRepository;
use account_service::domain::user::resource::UserResourceStore;
use account_service::domain::user::service::AccountService;
use account_service::domain::user::service::ResetSettings;
use account_service::inbound::http::cookie::SessionCookie;
use account_service::inbound::http::router::create_router;
use account_service::outbound::repositories::InMemoryUserRepository;
use async_trait::async_trait;
use auth::Authenticator;
use auth::PasswordHasher;
use chrono::Duration;
use chrono::Utc;
use serde_json::json;

pub const JWT_SECRET: &[u8] = b"test-secret-key-for-jwt-signing-at-least-32-bytes";
pub const PASSWORD: &str = "pass_word!";

/// Mailer that keeps every message in memory and can be switched to fail.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
    failing: AtomicBool,
}

impl RecordingMailer {
    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }

    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().expect("mailer lock poisoned").clone()
    }
}

#[async_trait]
impl EmailSender for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), EmailDeliveryError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailDeliveryError::Unavailable("smtp down".to_string()));
        }
        self.sent.lock().expect("mailer lock poisoned").push(email);
        Ok(())
    }
}

/// Test application that spawns a real server
pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub api_client: reqwest::Client,
    pub repository: Arc<InMemoryUserRepository>,
    pub mailer: Arc<RecordingMailer>,
    pub authenticator: Arc<Authenticator>,
}

impl TestApp {
    /// Spawn the application in a background task and return TestApp
    pub async fn spawn() -> Self {
        // Use random port (0 = OS assigns)
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind random port");
        let port = listener.local_addr().unwrap().port();
        let address = format!("http://127.0.0.1:{}", port);

        let repository = Arc::new(InMemoryUserRepository::new());
        let mailer = Arc::new(RecordingMailer::default());

        // Cheap Argon2 parameters keep the suite fast
        let authenticator = Arc::new(Authenticator::with_hasher(
            JWT_SECRET,
            Duration::days(90),
            PasswordHasher::with_params(8, 1, 1).expect("Invalid hasher params"),
        ));

        let account_service = Arc::new(AccountService::new(
            Arc::clone(&repository),
            Arc::clone(&mailer),
            Arc::clone(&authenticator),
            ResetSettings {
                token_ttl: Duration::minutes(10),
                url_base: format!("{}/api/v1/users", address),
                conceal_unknown_accounts: false,
            },
        ));
        let users = Arc::new(CrudService::<User, _>::new(Arc::new(
            UserResourceStore::new(Arc::clone(&repository)),
        )));

        let router = create_router(
            account_service,
            users,
            SessionCookie {
                max_age_days: 90,
                secure: false,
            },
        );

        // Spawn server in background
        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server error");
        });

        Self {
            address,
            port,
            api_client: reqwest::Client::new(),
            repository,
            mailer,
            authenticator,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1/users{}", self.address, path)
    }

    /// Client that stores cookies between requests, like a browser
    pub fn browser(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to create reqwest client")
    }

    /// Helper to make GET request
    pub fn get(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.get(self.url(path))
    }

    /// Helper to make POST request
    pub fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.post(self.url(path))
    }

    /// Helper to make PATCH request
    pub fn patch(&self, path: &str) -> reqwest::RequestBuilder {
        self.api_client.patch(self.url(path))
    }

    /// Helper to make GET request with Bearer token
    pub fn get_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.get(path).bearer_auth(token)
    }

    /// Helper to make POST request with Bearer token
    pub fn post_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.post(path).bearer_auth(token)
    }

    /// Helper to make PATCH request with Bearer token
    pub fn patch_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.patch(path).bearer_auth(token)
    }

    /// Helper to make DELETE request with Bearer token
    pub fn delete_authenticated(&self, path: &str, token: &str) -> reqwest::RequestBuilder {
        self.api_client.delete(self.url(path)).bearer_auth(token)
    }

    /// Sign up through the API and return the response body
    pub async fn signup(&self, name: &str, email: &str) -> serde_json::Value {
        let response = self
            .post("/signup")
            .json(&json!({
                "name": name,
                "email": email,
                "password": PASSWORD,
                "passwordConfirm": PASSWORD
            }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);

        response.json().await.expect("Failed to parse response")
    }

    /// Sign up and return the issued token
    pub async fn signup_token(&self, name: &str, email: &str) -> String {
        let body = self.signup(name, email).await;
        body["token"].as_str().expect("token missing").to_string()
    }

    /// Insert an account with the given role directly and log in as it
    pub async fn seed_user(&self, name: &str, email: &str, role: Role) -> String {
        let hash = self
            .authenticator
            .hash_password(PASSWORD)
            .expect("Failed to hash password");
        let mut user = User::register(
            UserName::new(name.to_string()).unwrap(),
            EmailAddress::new(email.to_string()).unwrap(),
            hash,
        );
        user.role = role;
        self.repository
            .create(user)
            .await
            .expect("Failed to seed user");

        self.login(email, PASSWORD).await
    }

    /// Log in and return the issued token
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .post("/login")
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let body: serde_json::Value = response.json().await.expect("Failed to parse response");
        body["token"].as_str().expect("token missing").to_string()
    }

    /// Plaintext secret from the most recent reset email
    pub fn last_reset_secret(&self) -> String {
        let email = self.mailer.sent().pop().expect("No email was sent");
        let (_, rest) = email
            .body
            .split_once("/resetPassword/")
            .expect("Reset link missing");
        rest.chars()
            .take_while(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
            .collect()
    }

    /// Move the pending reset of an account into the past
    pub async fn expire_pending_reset(&self, email: &str) {
        let user = self
            .repository
            .find_by_email(email, PasswordSelection::Omit)
            .await
            .unwrap()
            .expect("Account not found");
        let reset = user.pending_reset.expect("No pending reset");
        let expired = PendingReset {
            token_digest: reset.token_digest,
            expires_at: Utc::now() - Duration::seconds(1),
        };

        let stored = self
            .repository
            .store_pending_reset(&user.id, &expired)
            .await
            .expect("Failed to store pending reset");
        assert!(stored);
    }
}
