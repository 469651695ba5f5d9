// tests/api_tests.rs

mod common;

use common::{SINGLE_QUESTION, THREE_QUESTIONS, spawn_app, spawn_app_on_file};
use serde_json::json;

#[tokio::test]
async fn health_check_404() {
    // Arrange
    let app = spawn_app(true).await;

    // Act
    let response = app
        .client
        .get(app.url("/random_path_that_does_not_exist"))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn quiz_without_questions_is_not_found() {
    let app = spawn_app(true).await;

    let response = app.start_quiz("10.0.0.1").await;
    assert_eq!(response.status().as_u16(), 404);

    let status: serde_json::Value = app
        .client
        .get(app.url("/api/quiz/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["question_count"], 0);
    assert_eq!(status["has_completed"], false);
}

#[tokio::test]
async fn single_question_quiz_scores_one() {
    // Arrange
    let app = spawn_app(true).await;
    app.seed_questions(SINGLE_QUESTION).await;

    // Act: start
    let response = app.start_quiz("10.0.0.1").await;
    assert_eq!(response.status().as_u16(), 200);
    let paper: serde_json::Value = response.json().await.unwrap();

    let questions = paper["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0]["body"], "2+2=?");
    assert_eq!(questions[0]["position"], 1);
    assert_eq!(questions[0]["options"][1]["label"], "B");
    assert_eq!(questions[0]["options"][1]["text"], "4");
    assert!(questions[0].get("correct_answer").is_none());

    // Act: submit
    let token = paper["quiz_token"].as_str().unwrap();
    let response = app.submit("10.0.0.1", token, json!({ "1": "B" })).await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let result: serde_json::Value = response.json().await.unwrap();
    assert_eq!(result["score"], 1);
    assert_eq!(result["total"], 1);
    assert_eq!(result["score_color"], "green");
    assert_eq!(result["responses"][0]["is_correct"], true);
    assert_eq!(result["responses"][0]["selected_option"], "B");
    assert_eq!(result["responses"][0]["correct_option"], "B");
    assert_eq!(app.submission_count().await, 1);
}

#[tokio::test]
async fn partial_answers_are_scored_per_matching_letter() {
    let app = spawn_app(true).await;
    let upload = app.seed_questions(THREE_QUESTIONS).await;
    assert_eq!(upload["imported"], 3);
    assert_eq!(upload["warning_count"], 1);

    let token = app.quiz_token("10.0.0.2").await;
    // Q1 right (lower case), Q2 wrong, Q3 skipped, unknown position ignored.
    let result: serde_json::Value = app
        .submit("10.0.0.2", &token, json!({ "1": "a", "2": "C", "9": "A" }))
        .await
        .json()
        .await
        .unwrap();

    assert_eq!(result["score"], 1);
    assert_eq!(result["total"], 3);
    assert_eq!(result["score_color"], "orange");
    let responses = result["responses"].as_array().unwrap();
    assert_eq!(responses.len(), 3);
    assert_eq!(responses[1]["is_correct"], false);
    assert_eq!(responses[2]["selected_option"], serde_json::Value::Null);

    let (stored,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM responses WHERE selected_option IS NULL")
            .fetch_one(&app.pool)
            .await
            .unwrap();
    assert_eq!(stored, 1);
}

#[tokio::test]
async fn second_attempt_from_same_ip_is_redirected() {
    // Arrange
    let app = spawn_app(true).await;
    app.seed_questions(SINGLE_QUESTION).await;
    let token = app.quiz_token("203.0.113.9").await;
    let first = app.submit("203.0.113.9", &token, json!({ "1": "A" })).await;
    assert_eq!(first.status().as_u16(), 200);

    // Act: start again
    let restart = app.start_quiz("203.0.113.9").await;

    // Assert: redirect followed to the "already completed" view
    assert_eq!(restart.status().as_u16(), 200);
    assert!(restart.url().path().ends_with("/api/quiz/completed"));
    let view: serde_json::Value = restart.json().await.unwrap();
    assert_eq!(view["status"], "already_completed");
    assert_eq!(view["submission"]["score"], 0);

    // Act: replay the old ticket
    let replay = app.submit("203.0.113.9", &token, json!({ "1": "B" })).await;
    assert!(replay.url().path().ends_with("/api/quiz/completed"));
    let view: serde_json::Value = replay.json().await.unwrap();
    assert_eq!(view["status"], "already_completed");

    // Assert: no second row
    assert_eq!(app.submission_count().await, 1);

    let status: serde_json::Value = app
        .client
        .get(app.url("/api/quiz/status"))
        .header("X-Forwarded-For", "203.0.113.9")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["has_completed"], true);
    assert_eq!(status["question_count"], 1);

    // Another address can still take the quiz.
    assert_eq!(app.start_quiz("203.0.113.10").await.status().as_u16(), 200);
}

#[tokio::test]
async fn gating_disabled_allows_repeat_attempts() {
    let app = spawn_app(false).await;
    app.seed_questions(SINGLE_QUESTION).await;

    for _ in 0..2 {
        let token = app.quiz_token("10.1.1.1").await;
        let response = app.submit("10.1.1.1", &token, json!({ "1": "B" })).await;
        assert_eq!(response.status().as_u16(), 200);
    }

    assert_eq!(app.submission_count().await, 2);
    let (locks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM ip_locks")
        .fetch_one(&app.pool)
        .await
        .unwrap();
    assert_eq!(locks, 0);
}

#[tokio::test]
async fn forged_ticket_is_rejected() {
    let app = spawn_app(true).await;
    app.seed_questions(SINGLE_QUESTION).await;

    let response = app
        .submit("10.0.0.3", "not-a-real-token", json!({ "1": "B" }))
        .await;
    assert_eq!(response.status().as_u16(), 401);
    assert_eq!(app.submission_count().await, 0);
}

#[tokio::test]
async fn result_is_only_visible_to_submitting_ip() {
    let app = spawn_app(true).await;
    app.seed_questions(SINGLE_QUESTION).await;
    let token = app.quiz_token("10.0.0.4").await;
    let result: serde_json::Value = app
        .submit("10.0.0.4", &token, json!({ "1": "B" }))
        .await
        .json()
        .await
        .unwrap();
    let id = result["submission_id"].as_i64().unwrap();

    let own: serde_json::Value = app
        .client
        .get(app.url(&format!("/api/quiz/results/{}", id)))
        .header("X-Forwarded-For", "10.0.0.4")
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["score"], 1);
    assert_eq!(own["responses"][0]["options"][1]["is_selected"], true);
    assert_eq!(own["responses"][0]["options"][1]["is_correct"], true);

    let other = app
        .client
        .get(app.url(&format!("/api/quiz/results/{}", id)))
        .header("X-Forwarded-For", "10.0.0.5")
        .send()
        .await
        .unwrap();
    assert_eq!(other.status().as_u16(), 404);
}

#[tokio::test]
async fn ticket_keeps_scoring_against_its_snapshot() {
    let app = spawn_app(true).await;
    app.seed_questions(SINGLE_QUESTION).await;
    let old_token = app.quiz_token("10.0.0.6").await;

    // A new upload supersedes the set.
    app.seed_questions(THREE_QUESTIONS).await;
    let listed: Vec<serde_json::Value> = app
        .client
        .get(app.url("/api/questions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listed.len(), 3);

    let result: serde_json::Value = app
        .submit("10.0.0.6", &old_token, json!({ "1": "B" }))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(result["score"], 1);
    assert_eq!(result["total"], 1);
}

#[tokio::test]
async fn quick_stats_report_attempts() {
    let app = spawn_app(false).await;
    app.seed_questions(SINGLE_QUESTION).await;

    let empty: serde_json::Value = app
        .client
        .get(app.url("/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(empty["total_attempts"], 0);
    assert_eq!(empty["average_time"], 0);

    let token = app.quiz_token("10.0.0.7").await;
    app.submit("10.0.0.7", &token, json!({})).await;

    let stats: serde_json::Value = app
        .client
        .get(app.url("/api/stats"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_attempts"], 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_duplicate_submissions_are_redirected() {
    // Arrange
    let app = spawn_app_on_file(true).await;
    app.seed_questions(SINGLE_QUESTION).await;

    let no_redirect = reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap();

    let ips: Vec<String> = (1..=5).map(|i| format!("192.0.2.{}", i)).collect();
    let mut tickets = Vec::new();
    for ip in &ips {
        tickets.push((ip.clone(), app.quiz_token(ip).await));
    }

    // Act: four simultaneous submits per address, same ticket
    let mut handles = Vec::new();
    for (ip, ticket) in &tickets {
        for _ in 0..4 {
            let client = no_redirect.clone();
            let url = app.url("/api/quiz/submit");
            let ip = ip.clone();
            let body = json!({ "quiz_token": ticket, "answers": { "1": "B" } });
            handles.push(tokio::spawn(async move {
                client
                    .post(url)
                    .header("X-Forwarded-For", ip)
                    .json(&body)
                    .send()
                    .await
                    .unwrap()
                    .status()
                    .as_u16()
            }));
        }
    }

    let mut statuses = Vec::new();
    for handle in handles {
        statuses.push(handle.await.unwrap());
    }

    // Assert: one winner per address, every loser redirected
    assert!(
        statuses.iter().all(|s| *s == 200 || *s == 303),
        "unexpected statuses: {:?}",
        statuses
    );
    assert_eq!(statuses.iter().filter(|s| **s == 200).count(), ips.len());
    assert_eq!(app.submission_count().await, ips.len() as i64);
}
