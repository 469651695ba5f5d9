// tests/common/mod.rs

#![allow(dead_code)]

use quiz_gate::{config::Config, routes, state::AppState};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::io::{Cursor, Write};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};

static DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub const ADMIN_USERNAME: &str = "quizmaster";
pub const ADMIN_PASSWORD: &str = "correct-horse";

/// One question, answer B.
pub const SINGLE_QUESTION: &str =
    "Question 1: 2+2=?\nA. 3\nB. 4\nC. 5\nD. 6\nQuestion 1 Answer: B\n";

/// Three questions with answers A, B, C. Question 4 lacks an answer and is skipped.
pub const THREE_QUESTIONS: &str = "\
Sample quiz

Question 1: Capital of France?
A. Paris
B. London
C. Berlin
D. Madrid
Question 1 Answer: A

Question 2: Largest planet?
A. Saturn
B. Jupiter
C. Neptune
D. Uranus
Question 2 Answer: B

Question 3: Boiling point of water at sea level?
A. 90 C
B. 95 C
C. 100 C
D. 105 C
Question 3 Answer: C

Question 4: Unanswered?
A. a
B. b
C. c
D. d
";

pub struct TestApp {
    pub address: String,
    pub pool: SqlitePool,
    pub client: reqwest::Client,
}

pub fn test_config(ip_lock_enabled: bool) -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        quiz_ticket_ttl: 600,
        rust_log: "error".to_string(),
        log_dir: "logs".to_string(),
        admin_username: ADMIN_USERNAME.to_string(),
        admin_password: ADMIN_PASSWORD.to_string(),
        ip_lock_enabled,
        max_upload_bytes: 1024 * 1024,
        port: 0,
    }
}

/// Spawns the app on a random port over a fresh in-memory database.
pub async fn spawn_app(ip_lock_enabled: bool) -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    serve(pool, ip_lock_enabled).await
}

/// Spawns the app over a fresh SQLite file with several pooled connections,
/// so requests really run side by side.
pub async fn spawn_app_on_file(ip_lock_enabled: bool) -> TestApp {
    let path = std::env::temp_dir().join(format!(
        "quiz_gate_test_{}_{}.db",
        std::process::id(),
        DB_COUNTER.fetch_add(1, Ordering::SeqCst)
    ));
    let _ = std::fs::remove_file(&path);

    let options = SqliteConnectOptions::new()
        .filename(&path)
        .create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await
        .expect("Failed to open SQLite file");

    serve(pool, ip_lock_enabled).await
}

async fn serve(pool: SqlitePool, ip_lock_enabled: bool) -> TestApp {
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let state = AppState::new(pool.clone(), test_config(ip_lock_enabled))
        .expect("Failed to build state");
    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp {
        address,
        pool,
        client: reqwest::Client::new(),
    }
}

/// Minimal .docx container holding one paragraph per entry.
pub fn build_docx(paragraphs: &[&str]) -> Vec<u8> {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<w:p><w:r><w:t xml:space=\"preserve\">{}</w:t></w:r></w:p>", p))
        .collect();
    let xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body>{}</w:body></w:document>",
        body
    );

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file(
            "word/document.xml",
            zip::write::SimpleFileOptions::default(),
        )
        .unwrap();
    writer.write_all(xml.as_bytes()).unwrap();
    writer.finish().unwrap().into_inner()
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/api/admin/login"))
            .json(&serde_json::json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn admin_token(&self) -> String {
        let body: serde_json::Value = self
            .login(ADMIN_USERNAME, ADMIN_PASSWORD)
            .await
            .json()
            .await
            .expect("Failed to parse login json");
        body["token"].as_str().expect("Token not found").to_string()
    }

    pub async fn upload(&self, token: &str, file_name: &str, bytes: Vec<u8>) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        self.client
            .post(self.url("/api/admin/upload"))
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Uploads `text` as a .txt file and asserts it was accepted.
    pub async fn seed_questions(&self, text: &str) -> serde_json::Value {
        let token = self.admin_token().await;
        let response = self
            .upload(&token, "quiz.txt", text.as_bytes().to_vec())
            .await;
        assert_eq!(response.status().as_u16(), 201);
        response.json().await.unwrap()
    }

    pub async fn start_quiz(&self, ip: &str) -> reqwest::Response {
        self.client
            .get(self.url("/api/quiz"))
            .header("X-Forwarded-For", ip)
            .send()
            .await
            .expect("Failed to execute request")
    }

    /// Starts a quiz from `ip` and returns the ticket.
    pub async fn quiz_token(&self, ip: &str) -> String {
        let response = self.start_quiz(ip).await;
        assert_eq!(response.status().as_u16(), 200);
        let paper: serde_json::Value = response.json().await.unwrap();
        paper["quiz_token"].as_str().unwrap().to_string()
    }

    pub async fn submit(
        &self,
        ip: &str,
        token: &str,
        answers: serde_json::Value,
    ) -> reqwest::Response {
        self.client
            .post(self.url("/api/quiz/submit"))
            .header("X-Forwarded-For", ip)
            .json(&serde_json::json!({ "quiz_token": token, "answers": answers }))
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn submission_count(&self) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM submissions")
            .fetch_one(&self.pool)
            .await
            .unwrap();
        count
    }
}
