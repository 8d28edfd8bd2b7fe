// tests/api_tests.rs

use exam_grading::{
    config::Config,
    routes,
    state::AppState,
    store::Store,
    utils::jwt::{TEACHER_ROLE, sign_jwt},
};
use serde_json::{Value, json};

const SECRET: &str = "test_secret_for_integration_tests";

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app() -> String {
    let config = Config::for_testing(SECRET);
    let state = AppState {
        store: Store::in_memory(),
        config,
    };

    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn teacher_token() -> String {
    sign_jwt("teacher-1", TEACHER_ROLE, SECRET, 600).unwrap()
}

/// Creates an assignment and returns (assignment id, magic token).
async fn create_assignment(client: &reqwest::Client, address: &str, exam: &str, student: &str) -> (String, String) {
    let resp: Value = client
        .post(format!("{}/api/assignments", address))
        .bearer_auth(teacher_token())
        .json(&json!({ "examId": exam, "studentId": student }))
        .send()
        .await
        .expect("Create assignment failed")
        .json()
        .await
        .unwrap();

    (
        resp["assignment"]["id"].as_str().unwrap().to_string(),
        resp["token"].as_str().unwrap().to_string(),
    )
}

/// Takes an exam through start, answers and submit.
async fn take_exam(client: &reqwest::Client, address: &str, token: &str, questions: &[&str]) {
    let resp = client
        .post(format!("{}/api/take/{}/start", address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    for q in questions {
        let resp = client
            .put(format!("{}/api/take/{}/answers/{}", address, token, q))
            .json(&json!({ "answer": { "kind": "option", "value": "A" } }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let resp = client
        .post(format!("{}/api/take/{}/submit", address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn health_check_works() {
    let address = spawn_app().await;

    let response = reqwest::get(format!("{}/health", address)).await.unwrap();

    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn unknown_path_is_404() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    // Act
    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    // Assert
    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn teacher_routes_require_teacher_role() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let no_token = client
        .get(format!("{}/api/exams/e1/report", address))
        .send()
        .await
        .unwrap();
    assert_eq!(no_token.status().as_u16(), 401);

    let bad_token = client
        .get(format!("{}/api/exams/e1/report", address))
        .bearer_auth("garbage")
        .send()
        .await
        .unwrap();
    assert_eq!(bad_token.status().as_u16(), 401);

    let student = sign_jwt("s-1", "student", SECRET, 600).unwrap();
    let wrong_role = client
        .get(format!("{}/api/exams/e1/report", address))
        .bearer_auth(student)
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_role.status().as_u16(), 403);
}

#[tokio::test]
async fn preview_matches_rounding_methods() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let mut finals = Vec::new();
    for method in ["floor", "round", "ceil"] {
        let resp: Value = client
            .post(format!("{}/api/grades/preview", address))
            .bearer_auth(teacher_token())
            .json(&json!({ "scores": [2, 3], "roundingMethod": method }))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(resp["averageScore"], 2.5);
        finals.push(resp["finalGrade"].as_i64().unwrap());
    }

    assert_eq!(finals, vec![2, 3, 3]);
}

#[tokio::test]
async fn preview_rejects_bad_input() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for body in [
        json!({ "scores": [], "roundingMethod": "round" }),
        json!({ "scores": [1, 5], "roundingMethod": "round" }),
        json!({ "scores": [3], "roundingMethod": "truncate" }),
    ] {
        let resp = client
            .post(format!("{}/api/grades/preview", address))
            .bearer_auth(teacher_token())
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 400, "body: {}", body);
        let err: Value = resp.json().await.unwrap();
        assert!(err["error"].is_string());
    }
}

#[tokio::test]
async fn grade_from_scores_flow() {
    // Arrange
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;

    // Grading before the student submits is refused
    let early = client
        .post(format!("{}/api/grades", address))
        .bearer_auth(teacher_token())
        .json(&json!({
            "assignmentId": assignment_id,
            "scores": [5, 5, 4],
            "roundingMethod": "round"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status().as_u16(), 409);

    take_exam(&client, &address, &token, &["q1", "q2", "q3"]).await;

    // Act
    let created = client
        .post(format!("{}/api/grades", address))
        .bearer_auth(teacher_token())
        .json(&json!({
            "assignmentId": assignment_id,
            "scores": [5, 5, 4],
            "roundingMethod": "round"
        }))
        .send()
        .await
        .unwrap();

    // Assert
    assert_eq!(created.status().as_u16(), 201);
    let grade: Value = created.json().await.unwrap();
    assert_eq!(grade["assignmentId"], assignment_id.as_str());
    assert_eq!(grade["finalGrade"], 5);
    assert_eq!(grade["roundingMethod"], "round");
    assert_eq!(grade["gradedBy"], "teacher-1");
    assert!((grade["averageScore"].as_f64().unwrap() - 14.0 / 3.0).abs() < 1e-9);

    let assignment: Value = client
        .get(format!("{}/api/assignments/{}", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(assignment["status"], "graded");

    // Re-grade: same id, new values
    let regraded = client
        .post(format!("{}/api/grades", address))
        .bearer_auth(teacher_token())
        .json(&json!({
            "assignmentId": assignment_id,
            "scores": [2, 3],
            "roundingMethod": "floor",
            "gradedBy": "teacher-2"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(regraded.status().as_u16(), 200);
    let regraded: Value = regraded.json().await.unwrap();
    assert_eq!(regraded["id"], grade["id"]);
    assert_eq!(regraded["averageScore"], 2.5);
    assert_eq!(regraded["finalGrade"], 2);
    assert_eq!(regraded["gradedBy"], "teacher-2");

    let stored: Value = client
        .get(format!("{}/api/grades/{}", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stored, regraded);
}

#[tokio::test]
async fn grade_with_no_scores_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;
    take_exam(&client, &address, &token, &[]).await;

    let resp = client
        .post(format!("{}/api/assignments/{}/finalize", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "roundingMethod": "ceil" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    let missing = client
        .get(format!("{}/api/grades/{}", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status().as_u16(), 404);
}

#[tokio::test]
async fn score_answers_then_finalize() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;

    // Scoring before submit is refused
    let early = client
        .put(format!("{}/api/assignments/{}/answers/q1/score", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "score": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(early.status().as_u16(), 409);

    take_exam(&client, &address, &token, &["q1", "q2", "q3"]).await;

    for (question, score, feedback) in [
        ("q1", json!(2), json!("<b>Wrong</b><script>x()</script>")),
        ("q2", json!(3), json!(null)),
        ("q3", json!(null), json!(null)),
    ] {
        let resp = client
            .put(format!("{}/api/assignments/{}/answers/{}/score", address, assignment_id, question))
            .bearer_auth(teacher_token())
            .json(&json!({ "score": score, "feedback": feedback }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let out_of_scale = client
        .put(format!("{}/api/assignments/{}/answers/q3/score", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "score": 6 }))
        .send()
        .await
        .unwrap();
    assert_eq!(out_of_scale.status().as_u16(), 400);

    let answers: Vec<Value> = client
        .get(format!("{}/api/assignments/{}/answers", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(answers.len(), 3);
    assert_eq!(answers[0]["feedback"], "<b>Wrong</b>");
    assert_eq!(answers[0]["answer"]["kind"], "option");
    assert!(answers[2]["score"].is_null());

    // q3 is ungraded and left out: average of [2, 3]
    let grade: Value = client
        .post(format!("{}/api/assignments/{}/finalize", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "roundingMethod": "ceil" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(grade["averageScore"], 2.5);
    assert_eq!(grade["finalGrade"], 3);
    assert_eq!(grade["roundingMethod"], "ceil");

    // The student now sees scores and the grade
    let view: Value = client
        .get(format!("{}/api/take/{}", address, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["assignment"]["status"], "graded");
    assert_eq!(view["grade"]["finalGrade"], 3);
    assert_eq!(view["answers"][0]["score"], 2);
}

#[tokio::test]
async fn student_flow_is_forward_only() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (_, token) = create_assignment(&client, &address, "exam-1", "student-1").await;

    // Cannot answer or submit before starting
    let answer = client
        .put(format!("{}/api/take/{}/answers/q1", address, token))
        .json(&json!({ "answer": { "kind": "numeric", "value": 42.0 } }))
        .send()
        .await
        .unwrap();
    assert_eq!(answer.status().as_u16(), 409);

    let submit = client
        .post(format!("{}/api/take/{}/submit", address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(submit.status().as_u16(), 409);

    take_exam(&client, &address, &token, &["q1"]).await;

    // After submit: no restart, no answer changes, submit again is a no-op
    let restart = client
        .post(format!("{}/api/take/{}/start", address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(restart.status().as_u16(), 409);

    let late_answer = client
        .put(format!("{}/api/take/{}/answers/q1", address, token))
        .json(&json!({ "answer": { "kind": "text", "value": "changed" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(late_answer.status().as_u16(), 409);

    let resubmit: Value = client
        .post(format!("{}/api/take/{}/submit", address, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(resubmit["status"], "submitted");

    // Scores stay hidden from the student until graded
    let view: Value = client
        .get(format!("{}/api/take/{}", address, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(view["grade"].is_null());
    assert_eq!(view["answers"][0]["answer"]["value"], "A");
}

#[tokio::test]
async fn student_sees_scores_only_once_graded() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;
    take_exam(&client, &address, &token, &["q1"]).await;

    let resp = client
        .put(format!("{}/api/assignments/{}/answers/q1/score", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "score": 4, "feedback": "Good reasoning" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Submitted but not graded: the score and feedback exist but are hidden
    let view: Value = client
        .get(format!("{}/api/take/{}", address, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["assignment"]["status"], "submitted");
    assert_eq!(view["answers"][0]["questionId"], "q1");
    assert!(view["answers"][0]["score"].is_null());
    assert!(view["answers"][0]["feedback"].is_null());
    assert!(view["grade"].is_null());

    let resp = client
        .post(format!("{}/api/assignments/{}/finalize", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let view: Value = client
        .get(format!("{}/api/take/{}", address, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["assignment"]["status"], "graded");
    assert_eq!(view["answers"][0]["score"], 4);
    assert_eq!(view["answers"][0]["feedback"], "Good reasoning");
    assert_eq!(view["grade"]["finalGrade"], 4);
}

#[tokio::test]
async fn answers_are_frozen_once_graded() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;
    take_exam(&client, &address, &token, &["q1"]).await;

    let resp = client
        .put(format!("{}/api/assignments/{}/answers/q1/score", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "score": 5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let grade: Value = client
        .post(format!("{}/api/assignments/{}/finalize", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(grade["finalGrade"], 5);

    let rescore = client
        .put(format!("{}/api/assignments/{}/answers/q1/score", address, assignment_id))
        .bearer_auth(teacher_token())
        .json(&json!({ "score": 2 }))
        .send()
        .await
        .unwrap();
    assert_eq!(rescore.status().as_u16(), 409);

    // Answer scores still agree with the stored grade
    let view: Value = client
        .get(format!("{}/api/take/{}", address, token))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(view["answers"][0]["score"], 5);
    assert_eq!(view["grade"]["finalGrade"], 5);
    assert_eq!(view["grade"]["averageScore"], 5.0);
}

#[tokio::test]
async fn finalize_accepts_empty_json_body() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;
    take_exam(&client, &address, &token, &["q1", "q2"]).await;

    for (question, score) in [("q1", 3), ("q2", 4)] {
        let resp = client
            .put(format!("{}/api/assignments/{}/answers/{}/score", address, assignment_id, question))
            .bearer_auth(teacher_token())
            .json(&json!({ "score": score }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 200);
    }

    let malformed = client
        .post(format!("{}/api/assignments/{}/finalize", address, assignment_id))
        .bearer_auth(teacher_token())
        .header("content-type", "application/json")
        .body("{")
        .send()
        .await
        .unwrap();
    assert_eq!(malformed.status().as_u16(), 400);

    let resp = client
        .post(format!("{}/api/assignments/{}/finalize", address, assignment_id))
        .bearer_auth(teacher_token())
        .header("content-type", "application/json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    // Defaults: round, graded by the token's subject
    let grade: Value = resp.json().await.unwrap();
    assert_eq!(grade["averageScore"], 3.5);
    assert_eq!(grade["finalGrade"], 4);
    assert_eq!(grade["roundingMethod"], "round");
    assert_eq!(grade["gradedBy"], "teacher-1");
}

#[tokio::test]
async fn invalid_magic_link_is_rejected() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    let resp = client
        .get(format!("{}/api/take/not-a-token", address))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);

    // A teacher token is not a magic link
    let resp = client
        .get(format!("{}/api/take/{}", address, teacher_token()))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn monitoring_events_are_recorded_while_in_progress() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;

    client
        .post(format!("{}/api/take/{}/start", address, token))
        .send()
        .await
        .unwrap();

    for (kind, at) in [("paste", "2026-01-01T10:05:00Z"), ("tab_switch", "2026-01-01T10:01:00Z")] {
        let resp = client
            .post(format!("{}/api/take/{}/events", address, token))
            .json(&json!({ "kind": kind, "occurredAt": at }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
    }

    let unknown = client
        .post(format!("{}/api/take/{}/events", address, token))
        .json(&json!({ "kind": "telepathy" }))
        .send()
        .await
        .unwrap();
    assert_eq!(unknown.status().as_u16(), 400);

    let events: Vec<Value> = client
        .get(format!("{}/api/assignments/{}/events", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["kind"], "tab_switch");
    assert_eq!(events[1]["kind"], "paste");

    client
        .post(format!("{}/api/take/{}/submit", address, token))
        .send()
        .await
        .unwrap();

    let late = client
        .post(format!("{}/api/take/{}/events", address, token))
        .json(&json!({ "kind": "idle" }))
        .send()
        .await
        .unwrap();
    assert_eq!(late.status().as_u16(), 409);
}

#[tokio::test]
async fn exam_report_aggregates_graded_assignments() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();

    for (student, scores) in [("alice", json!([5, 5, 4])), ("bob", json!([3, 3]))] {
        let (id, token) = create_assignment(&client, &address, "exam-r", student).await;
        take_exam(&client, &address, &token, &["q1"]).await;
        let resp = client
            .post(format!("{}/api/grades", address))
            .bearer_auth(teacher_token())
            .json(&json!({ "assignmentId": id, "scores": scores, "roundingMethod": "round" }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status().as_u16(), 201);
    }
    create_assignment(&client, &address, "exam-r", "carol").await;
    create_assignment(&client, &address, "other-exam", "dave").await;

    let report: Value = client
        .get(format!("{}/api/exams/exam-r/report", address))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(report["examId"], "exam-r");
    assert_eq!(report["totalAssignments"], 3);
    assert_eq!(report["statusCounts"]["graded"], 2);
    assert_eq!(report["statusCounts"]["pending"], 1);
    assert_eq!(report["meanFinalGrade"], 4.0);
    assert_eq!(report["distribution"]["5"], 1);
    assert_eq!(report["distribution"]["3"], 1);
    assert_eq!(report["rows"][0]["studentId"], "alice");
    assert_eq!(report["rows"][2]["studentId"], "carol");
    assert!(report["rows"][2]["finalGrade"].is_null());
}

#[tokio::test]
async fn deleting_assignment_removes_grade_and_link() {
    let address = spawn_app().await;
    let client = reqwest::Client::new();
    let (assignment_id, token) = create_assignment(&client, &address, "exam-1", "student-1").await;
    take_exam(&client, &address, &token, &["q1"]).await;

    client
        .post(format!("{}/api/grades", address))
        .bearer_auth(teacher_token())
        .json(&json!({ "assignmentId": assignment_id, "scores": [4], "roundingMethod": "round" }))
        .send()
        .await
        .unwrap();

    let deleted = client
        .delete(format!("{}/api/assignments/{}", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap();
    assert_eq!(deleted.status().as_u16(), 204);

    let grade = client
        .get(format!("{}/api/grades/{}", address, assignment_id))
        .bearer_auth(teacher_token())
        .send()
        .await
        .unwrap();
    assert_eq!(grade.status().as_u16(), 404);

    let link = client
        .get(format!("{}/api/take/{}", address, token))
        .send()
        .await
        .unwrap();
    assert_eq!(link.status().as_u16(), 404);
}
