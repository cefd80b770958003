// tests/api_tests.rs

mod common;

use common::{FakeExamService, sample_exam, spawn_app, token_for};
use serde_json::{Value, json};

async fn start_session(client: &reqwest::Client, address: &str, token: &str) -> Value {
    let response = client
        .post(format!("{}/api/exams/exam-1/sessions", address))
        .bearer_auth(token)
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 201);
    response.json().await.expect("Failed to parse session json")
}

async fn answer(
    client: &reqwest::Client,
    address: &str,
    token: &str,
    session_id: &str,
    question_id: &str,
    answer: Value,
) -> u16 {
    client
        .put(format!(
            "{}/api/sessions/{}/answers/{}",
            address, session_id, question_id
        ))
        .bearer_auth(token)
        .json(&json!({ "answer": answer }))
        .send()
        .await
        .expect("Failed to execute request")
        .status()
        .as_u16()
}

#[tokio::test]
async fn health_check_works() {
    let address = spawn_app(FakeExamService::new(sample_exam())).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/health", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn learner_routes_require_a_token() {
    let address = spawn_app(FakeExamService::new(sample_exam())).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/exams/exam-1/sessions", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);

    let response = client
        .post(format!("{}/api/exams/exam-1/sessions", address))
        .bearer_auth("not-a-jwt")
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn started_session_hides_answer_keys() {
    let address = spawn_app(FakeExamService::new(sample_exam())).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;

    assert_eq!(session["status"], "in_progress");
    assert_eq!(session["submission_id"], "sub-1");
    let questions = session["questions"].as_array().unwrap();
    assert_eq!(questions.len(), 3);
    assert!(questions.iter().all(|q| q.get("correct_answer").is_none()));

    // Unknown exam
    let response = client
        .post(format!("{}/api/exams/nope/sessions", address))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn submit_without_results_grades_locally() {
    let service = FakeExamService::new(sample_exam());
    let address = spawn_app(service.clone()).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap();

    assert_eq!(answer(&client, &address, &token, session_id, "1", json!(["0"])).await, 204);
    assert_eq!(answer(&client, &address, &token, session_id, "2", json!(" PARIS")).await, 204);
    assert_eq!(answer(&client, &address, &token, session_id, "3", json!("0")).await, 204);

    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let results: Value = response.json().await.unwrap();

    assert_eq!(results["mode"], "fallback");
    assert_eq!(results["questions"][0]["is_correct"], true);
    assert_eq!(results["questions"][1]["is_correct"], true);
    assert_eq!(results["questions"][2]["is_correct"], false);
    assert_eq!(results["submission"]["score"], 5.0);
    assert_eq!(results["submission"]["total_points"], 10.0);
    assert_eq!(results["submission"]["percentage"], 50);

    // Every queued answer reached the exam service before the submit
    assert_eq!(service.saved.lock().unwrap().len(), 3);
    assert_eq!(*service.submitted.lock().unwrap(), vec!["sub-1".to_string()]);

    // Sealed: no more answers, no second submit
    assert_eq!(answer(&client, &address, &token, session_id, "3", json!("1")).await, 409);
    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);
}

#[tokio::test]
async fn results_are_reconciled_against_the_payload() {
    let service = FakeExamService::new(sample_exam());
    let address = spawn_app(service.clone()).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap();

    // Results are only available once submitted
    let response = client
        .get(format!("{}/api/sessions/{}/results", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 409);

    client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    service.set_results(json!({
        "exam": { "title": "World Capitals", "exam_id": "exam-1" },
        "submission": {
            "submission_id": "sub-1", "status": "graded", "submitted_at": "2024-05-01T10:00:00Z",
            "score": 5, "total_points": 10, "percentage": 50, "has_requested_recheck": false
        },
        "questions": [
            { "question_id": 1, "type": "multiple_choice", "options": ["Paris", "Berlin", "Lima"],
              "correct_answer": "{Paris,Berlin}", "student_answer": ["0", "1"], "is_correct": false,
              "points": 2, "points_earned": 0 },
            { "question_id": 2, "type": "identification", "correct_answer": "Paris",
              "student_answer": "Lyon", "is_correct": false, "points": 3, "points_earned": 0 },
            { "question_id": 3, "type": "multiple_choice", "options": ["Quito", "Lima"],
              "student_answer": "1", "is_correct": true, "points": 5, "points_earned": 5 }
        ]
    }));

    let response = client
        .get(format!("{}/api/sessions/{}/results", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let results: Value = response.json().await.unwrap();

    assert_eq!(results["mode"], "authoritative");
    assert_eq!(results["submission"]["status"], "graded");
    assert_eq!(results["questions"][0]["is_correct"], true);
    assert_eq!(results["questions"][0]["points_earned"], 2.0);
    assert_eq!(results["questions"][1]["is_correct"], false);
    assert_eq!(results["questions"][2]["is_correct"], true);
    assert_eq!(results["submission"]["score"], 7.0);
    assert_eq!(results["submission"]["percentage"], 70);
}

#[tokio::test]
async fn failed_submit_keeps_the_session_open() {
    let service = FakeExamService::new(sample_exam());
    let address = spawn_app(service.clone()).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap();

    *service.submit_fails.lock().unwrap() = true;
    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);

    assert_eq!(answer(&client, &address, &token, session_id, "2", json!("Paris")).await, 204);
    let view: Value = client
        .get(format!("{}/api/sessions/{}", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["status"], "in_progress");

    // A later submit goes through
    *service.submit_fails.lock().unwrap() = false;
    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn answers_are_validated_and_scoped() {
    let address = spawn_app(FakeExamService::new(sample_exam())).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap();

    assert_eq!(answer(&client, &address, &token, session_id, "99", json!("0")).await, 404);
    assert_eq!(answer(&client, &address, &token, session_id, "1", json!({"x": 1})).await, 400);

    let intruder = token_for("learner-2");
    assert_eq!(answer(&client, &address, &intruder, session_id, "1", json!("0")).await, 403);

    let response = client
        .get(format!("{}/api/sessions/{}", address, session_id))
        .bearer_auth(&intruder)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client
        .get(format!("{}/api/sessions/{}", address, uuid::Uuid::new_v4()))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn odd_payload_fields_do_not_discard_server_verdicts() {
    let service = FakeExamService::new(sample_exam());
    let address = spawn_app(service.clone()).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap();

    // Locally wrong: the key says Lima
    assert_eq!(answer(&client, &address, &token, session_id, "3", json!("0")).await, 204);

    service.set_results(json!({
        "exam": { "title": null, "exam_id": "exam-1" },
        "submission": {
            "submission_id": "sub-1", "status": null, "score": "5.00", "total_points": "10",
            "percentage": null, "has_requested_recheck": null
        },
        "questions": [
            { "question_id": 3, "question_text": null, "type": "multiple_choice",
              "options": ["Quito", "Lima"], "student_answer": "0", "is_correct": true,
              "points": "5", "points_earned": "5.00" }
        ]
    }));

    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let results: Value = response.json().await.unwrap();

    assert_eq!(results["mode"], "authoritative");
    assert_eq!(results["exam"]["title"], "World Capitals");
    assert_eq!(results["questions"][0]["is_correct"], true);
    assert_eq!(results["questions"][0]["points_earned"], 5.0);
    assert_eq!(results["submission"]["score"], 5.0);
    assert_eq!(results["submission"]["total_points"], 10.0);
    assert_eq!(results["submission"]["percentage"], 50);
    assert_eq!(results["submission"]["has_requested_recheck"], false);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_saves_reach_the_exam_service_in_recorded_order() {
    let service = FakeExamService::new(sample_exam());
    let address = spawn_app(service.clone()).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let mut saves = Vec::new();
    for i in 0..20 {
        let (client, address, token, session_id) =
            (client.clone(), address.clone(), token.clone(), session_id.clone());
        saves.push(tokio::spawn(async move {
            answer(&client, &address, &token, &session_id, "2", json!(format!("draft {}", i))).await
        }));
    }
    for save in saves {
        assert_eq!(save.await.unwrap(), 204);
    }

    let view: Value = client
        .get(format!("{}/api/sessions/{}", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let recorded = view["answers"]["2"].clone();

    // Submitting flushes every queued write first
    let response = client
        .post(format!("{}/api/sessions/{}/submit", address, session_id))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);

    let saved = service.saved.lock().unwrap().clone();
    let upstream: Vec<&Value> = saved.iter().filter(|(q, _)| q == "2").map(|(_, a)| a).collect();
    assert_eq!(upstream.len(), 20);
    assert_eq!(upstream.last().copied(), Some(&recorded));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submits_reach_the_exam_service_once() {
    let service = FakeExamService::new(sample_exam());
    let address = spawn_app(service.clone()).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap().to_string();

    let submit = |client: reqwest::Client| {
        let url = format!("{}/api/sessions/{}/submit", address, session_id);
        let token = token.clone();
        tokio::spawn(async move {
            client
                .post(url)
                .bearer_auth(token)
                .send()
                .await
                .unwrap()
                .status()
                .as_u16()
        })
    };
    let first = submit(client.clone());
    let second = submit(client.clone());

    let mut statuses = vec![first.await.unwrap(), second.await.unwrap()];
    statuses.sort();
    assert_eq!(statuses, vec![200, 409]);
    assert_eq!(service.submitted.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn ended_sessions_are_forgotten() {
    let address = spawn_app(FakeExamService::new(sample_exam())).await;
    let client = reqwest::Client::new();
    let token = token_for("learner-1");

    let session = start_session(&client, &address, &token).await;
    let session_id = session["session_id"].as_str().unwrap();
    let url = format!("{}/api/sessions/{}", address, session_id);

    let response = client
        .delete(&url)
        .bearer_auth(token_for("learner-2"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 403);

    let response = client.delete(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 204);

    let response = client.get(&url).bearer_auth(&token).send().await.unwrap();
    assert_eq!(response.status().as_u16(), 404);
}
